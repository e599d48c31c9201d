//! Event dispatch: the seam between the transport and the room actors.
//!
//! One dispatcher serves the whole process. It owns the room registry
//! behind an async mutex, but the lock only guards the code → handle
//! map; every room mutation happens inside that room's own actor, so
//! the lock is held for lookups and inserts only, never across a room
//! round trip (except `createRoom`, which must insert atomically).

use std::sync::Arc;

use scrawl_protocol::{
    Ack, ClientEvent, ConnId, Disconnected, RoomCode, RoomOptions,
};
use scrawl_room::{Archive, Broadcast, RoomError, RoomHandle, RoomRegistry};
use tokio::sync::Mutex;

/// Routes decoded client events to room actors and shapes the replies.
///
/// Cheap to clone; all clones share the registry and collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Mutex<RoomRegistry>>,
    broadcast: Arc<dyn Broadcast>,
}

impl Dispatcher {
    /// Creates the dispatcher and spawns the reaper task that removes
    /// retired rooms from the registry and closes their groups.
    pub fn new(
        broadcast: Arc<dyn Broadcast>,
        archive: Arc<dyn Archive>,
    ) -> Self {
        let (registry, mut retired_rx) =
            RoomRegistry::new(broadcast.clone(), archive);
        let registry = Arc::new(Mutex::new(registry));

        let reaper_registry = Arc::clone(&registry);
        let reaper_broadcast = broadcast.clone();
        tokio::spawn(async move {
            while let Some(retired) = retired_rx.recv().await {
                let removed = reaper_registry.lock().await.retire(&retired);
                if removed {
                    reaper_broadcast.close(&retired.code);
                    tracing::info!(room = %retired.code, "room reaped, group closed");
                } else {
                    tracing::debug!(
                        room = %retired.code,
                        instance = retired.instance,
                        "stale retirement notice ignored"
                    );
                }
            }
        });

        Self {
            registry,
            broadcast,
        }
    }

    /// Handles one client event and returns the caller's ack. Every
    /// error becomes an error ack; this method never fails outright.
    pub async fn dispatch(&self, conn_id: &ConnId, event: ClientEvent) -> Ack {
        match event {
            ClientEvent::CreateRoom { code, room } => {
                self.create_room(conn_id, code, room).await
            }
            ClientEvent::JoinRoom { code, mut player } => {
                let Some(handle) = self.lookup(&code).await else {
                    return not_found(&code);
                };
                // Membership first, so the joiner receives the updateRoom
                // broadcast their own join triggers.
                self.broadcast.join(&code, conn_id);
                player.conn_id = Some(conn_id.clone());
                match handle.join(player).await {
                    Ok(snap) => Ack::room(snap),
                    Err(e) => {
                        tracing::debug!(
                            room = %code,
                            %conn_id,
                            error = %e,
                            "join rejected"
                        );
                        self.broadcast.leave(&code, conn_id);
                        failure(e)
                    }
                }
            }
            ClientEvent::LeaveRoom { code, player } => {
                let Some(handle) = self.lookup(&code).await else {
                    return not_found(&code);
                };
                match handle.leave(player).await {
                    Ok(snap) => {
                        self.broadcast.leave(&code, conn_id);
                        match snap {
                            Some(snap) => Ack::room(snap),
                            // The roster emptied; the room is gone.
                            None => Ack::ok(),
                        }
                    }
                    Err(e) => failure(e),
                }
            }
            ClientEvent::GetRoom { code } => {
                let Some(handle) = self.lookup(&code).await else {
                    return not_found(&code);
                };
                match handle.snapshot().await {
                    Ok(snap) => Ack::room(snap),
                    Err(e) => failure(e),
                }
            }
            ClientEvent::GetRooms => Ack::rooms(self.public_rooms().await),
            ClientEvent::ToggleReady { code, player_id } => {
                self.room_call(&code, |h| async move {
                    h.toggle_ready(player_id).await
                })
                .await
            }
            ClientEvent::StartGame { code } => {
                self.room_call(&code, |h| async move { h.start_game().await })
                    .await
            }
            ClientEvent::UpdateRoomCanvas {
                code,
                player_id,
                canvas,
            } => {
                self.room_call(&code, |h| async move {
                    h.update_canvas(player_id, canvas).await
                })
                .await
            }
            ClientEvent::AdvanceStage {
                code,
                guess,
                canvas,
            } => {
                self.room_call(&code, |h| async move {
                    h.advance_stage(guess, canvas).await
                })
                .await
            }
            ClientEvent::SendMessage {
                code,
                player,
                message,
                buzz,
            } => {
                self.room_call(&code, |h| async move {
                    h.send_message(player, message, buzz).await
                })
                .await
            }
        }
    }

    /// Handles a transport-level disconnect notification.
    pub async fn connection_lost(&self, disconnected: Disconnected) {
        let Disconnected { code, conn_id } = disconnected;
        tracing::debug!(room = %code, %conn_id, "connection lost");
        self.broadcast.leave(&code, &conn_id);
        if let Some(handle) = self.lookup(&code).await {
            handle.connection_lost(conn_id).await;
        }
    }

    async fn create_room(
        &self,
        conn_id: &ConnId,
        code: RoomCode,
        options: RoomOptions,
    ) -> Ack {
        tracing::info!(room = %code, %conn_id, "creating room");
        let handle = self.registry.lock().await.create(
            code.clone(),
            options,
            conn_id.clone(),
        );
        self.broadcast.join(&code, conn_id);
        match handle.snapshot().await {
            Ok(snap) => Ack::room(snap),
            Err(e) => failure(e),
        }
    }

    /// Snapshots of all live, non-private rooms. Handles are cloned out
    /// of the registry first so no room round trip runs under the lock.
    async fn public_rooms(&self) -> Vec<scrawl_protocol::RoomSnapshot> {
        let handles: Vec<RoomHandle> =
            self.registry.lock().await.handles();
        let mut rooms = Vec::with_capacity(handles.len());
        for handle in handles {
            // Rooms torn down mid-listing just drop out.
            if let Ok(snap) = handle.snapshot().await {
                if !snap.is_private {
                    rooms.push(snap);
                }
            }
        }
        rooms
    }

    async fn lookup(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.registry.lock().await.get(code)
    }

    async fn room_call<F, Fut>(&self, code: &RoomCode, call: F) -> Ack
    where
        F: FnOnce(RoomHandle) -> Fut,
        Fut: Future<Output = Result<scrawl_protocol::RoomSnapshot, RoomError>>,
    {
        let Some(handle) = self.lookup(code).await else {
            return not_found(code);
        };
        match call(handle).await {
            Ok(snap) => Ack::room(snap),
            Err(e) => failure(e),
        }
    }
}

fn failure(e: RoomError) -> Ack {
    Ack::failure(e.wire_code(), e.to_string())
}

fn not_found(code: &RoomCode) -> Ack {
    failure(RoomError::RoomNotFound(code.clone()))
}
