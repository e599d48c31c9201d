//! Room actor: an isolated Tokio task that owns one room.
//!
//! The actor is the single logical writer for its room. Client commands,
//! timer ticks, and the teardown deadline all feed the same `select!`
//! loop, so one event is fully processed — validated, mutated,
//! broadcast — before the next one touches the room, and no suspension
//! can occur mid-mutation.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use scrawl_protocol::{
    BroadcastEvent, ChatEntry, ConnId, Player, PlayerId, RoomCode,
    RoomOptions, RoomSnapshot,
};
use scrawl_timer::{StageTimer, TimerTick};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant as TokioInstant;

use crate::registry::Retired;
use crate::{Advanced, Archive, Broadcast, Game, RoomError, Roster};

/// How long a finished room keeps servicing events before it is removed
/// from the registry and its group closed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(60);

/// The room aggregate: roster, settings, chat, canvas, optional game.
///
/// Owned exclusively by its actor; everything outside sees snapshots.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    name: String,
    is_private: bool,
    owner_id: PlayerId,
    roster: Roster,
    has_started: bool,
    is_finished: bool,
    draw_seconds: u32,
    guess_seconds: u32,
    canvas: Option<String>,
    chat_history: Vec<ChatEntry>,
    game: Option<Game>,
}

/// What a transport disconnect did to an open room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Nothing to do: unknown connection, or the game has started and
    /// the roster is deliberately left untouched.
    Ignored,
    /// The player was removed from the roster.
    Removed { empty: bool },
}

impl Room {
    /// Creates a room from `createRoom` options. The creating player
    /// becomes owner and first roster member, stamped with the creating
    /// connection.
    pub fn new(code: RoomCode, options: RoomOptions, conn: ConnId) -> Self {
        let mut owner = options.owner;
        owner.conn_id = Some(conn);
        let owner_id = owner.id.clone();

        // A room always has space for its creator.
        let mut roster = Roster::new(options.max_players.max(1));
        let _ = roster.add(owner);

        Self {
            code,
            name: options.name,
            is_private: options.is_private,
            owner_id,
            roster,
            has_started: false,
            is_finished: false,
            draw_seconds: options.draw_seconds,
            guess_seconds: options.guess_seconds,
            canvas: None,
            chat_history: Vec::new(),
            game: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn owner_id(&self) -> &PlayerId {
        &self.owner_id
    }

    /// Adds a player to an open room. Started rooms reject joins.
    pub fn join(&mut self, player: Player) -> Result<(), RoomError> {
        if self.has_started {
            return Err(RoomError::RoomStarted);
        }
        self.roster.add(player)
    }

    /// Removes a player. Returns whether the roster is now empty.
    ///
    /// Allowed even mid-game — stages hold owned player copies, so the
    /// chain survives. Ownership moves to the smallest remaining id when
    /// the owner leaves.
    pub fn leave(&mut self, id: &PlayerId) -> Result<bool, RoomError> {
        let (removed, empty) = self.roster.remove(id);
        if removed.is_none() {
            return Err(RoomError::PlayerNotFound(id.clone()));
        }
        if !empty && *id == self.owner_id {
            self.reassign_owner();
        }
        Ok(empty)
    }

    pub fn toggle_ready(&mut self, id: &PlayerId) -> Result<bool, RoomError> {
        self.roster.toggle_ready(id)
    }

    /// Marks the room started and builds the stage chain. Returns the
    /// first stage's TTL for the caller to arm the timer with.
    ///
    /// Calling this on an already-started room rebuilds the chain from
    /// the current roster (deliberate, matching the original service).
    pub fn start_game(&mut self) -> u32 {
        self.has_started = true;
        let owner = self
            .roster
            .get(&self.owner_id)
            .cloned()
            .expect("owner is a roster member");
        let others: Vec<Player> = self
            .roster
            .members()
            .filter(|p| p.id != self.owner_id)
            .cloned()
            .collect();
        let game =
            Game::new(owner, others, self.draw_seconds, self.guess_seconds);
        let ttl = game.active().ttl;
        self.game = Some(game);
        ttl
    }

    /// Full-replace of the shared canvas.
    pub fn update_canvas(&mut self, canvas: String) {
        self.canvas = Some(canvas);
    }

    /// Merges the payload into the active stage and advances. Marks the
    /// room finished when the active stage was terminal.
    pub fn advance_stage(
        &mut self,
        guess: Option<String>,
        canvas: Option<String>,
    ) -> Result<Advanced, RoomError> {
        let game = self.game.as_mut().ok_or(RoomError::GameNotStarted)?;
        let outcome = game.advance(guess, canvas);
        if outcome == Advanced::Finished {
            self.is_finished = true;
        }
        Ok(outcome)
    }

    /// Appends a chat entry. `delivered` is set unconditionally — the
    /// broadcast transport is fire-and-forget.
    pub fn append_chat(
        &mut self,
        player_id: PlayerId,
        message: Option<String>,
        buzz: bool,
    ) {
        self.chat_history.push(ChatEntry {
            player_id,
            message,
            timestamp_ms: now_ms(),
            delivered: true,
            buzz,
        });
    }

    /// Writes a timer tick's remaining seconds into the active stage.
    pub fn tick_active_stage(&mut self, remaining: u32) {
        if let Some(game) = &mut self.game {
            game.set_active_ttl(remaining);
        }
    }

    /// Handles a transport disconnect.
    ///
    /// Open room: the player is removed and ownership reassigned if
    /// needed. Started room: the roster is deliberately left unchanged —
    /// removing a mid-game player would orphan stage-chain assignments.
    pub fn disconnect(&mut self, conn: &ConnId) -> DisconnectOutcome {
        if self.has_started {
            return DisconnectOutcome::Ignored;
        }
        let Some(player) = self.roster.find_by_conn(conn) else {
            return DisconnectOutcome::Ignored;
        };
        let id = player.id.clone();
        let (_, empty) = self.roster.remove(&id);
        if !empty && id == self.owner_id {
            self.reassign_owner();
        }
        DisconnectOutcome::Removed { empty }
    }

    fn reassign_owner(&mut self) {
        if let Some(next) = self.roster.next_owner() {
            self.owner_id = next.id.clone();
        }
    }

    /// The full serialized room. The stage timer is server machinery
    /// and never appears here.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            name: self.name.clone(),
            is_private: self.is_private,
            max_players: self.roster.capacity(),
            has_started: self.has_started,
            is_finished: self.is_finished,
            owner: self
                .roster
                .get(&self.owner_id)
                .cloned()
                .expect("owner is a roster member"),
            draw_seconds: self.draw_seconds,
            guess_seconds: self.guess_seconds,
            canvas: self.canvas.clone(),
            players: self.roster.to_map(),
            chat_history: self.chat_history.clone(),
            game: self.game.as_ref().map(Game::snapshot),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Commands sent to a room actor through its channel. Variants carrying
/// a `oneshot::Sender` are request/reply; the rest are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        player: Player,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        /// `Ok(None)` when the roster emptied and the room is gone.
        reply: oneshot::Sender<Result<Option<RoomSnapshot>, RoomError>>,
    },
    ToggleReady {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    StartGame {
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    UpdateCanvas {
        player_id: PlayerId,
        canvas: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    AdvanceStage {
        guess: Option<String>,
        canvas: Option<String>,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    SendMessage {
        player_id: PlayerId,
        message: Option<String>,
        buzz: bool,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    ConnectionLost {
        conn_id: ConnId,
    },
}

/// Handle to a running room actor. Cheap to clone — an `mpsc::Sender`
/// wrapper. The [`RoomRegistry`](crate::RoomRegistry) holds one per room.
///
/// A send or reply failure means the actor is gone (room torn down),
/// which callers see as [`RoomError::RoomNotFound`].
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Distinguishes successive rooms under a reused code.
    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::RoomNotFound(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::RoomNotFound(self.code.clone()))
    }

    pub async fn join(
        &self,
        player: Player,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Join { player, reply })
            .await?
    }

    pub async fn leave(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<RoomSnapshot>, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    pub async fn toggle_ready(
        &self,
        player_id: PlayerId,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::ToggleReady { player_id, reply })
            .await?
    }

    pub async fn start_game(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::StartGame { reply }).await?
    }

    pub async fn update_canvas(
        &self,
        player_id: PlayerId,
        canvas: String,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::UpdateCanvas {
            player_id,
            canvas,
            reply,
        })
        .await?
    }

    pub async fn advance_stage(
        &self,
        guess: Option<String>,
        canvas: Option<String>,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::AdvanceStage {
            guess,
            canvas,
            reply,
        })
        .await?
    }

    pub async fn send_message(
        &self,
        player_id: PlayerId,
        message: Option<String>,
        buzz: bool,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::SendMessage {
            player_id,
            message,
            buzz,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Notifies the room that a transport connection dropped.
    /// Fire-and-forget; a torn-down room simply ignores it.
    pub async fn connection_lost(&self, conn_id: ConnId) {
        let _ = self
            .sender
            .send(RoomCommand::ConnectionLost { conn_id })
            .await;
    }
}

/// Whether the actor loop keeps running after a command.
enum Flow {
    Continue,
    Retire,
}

/// The room actor. Runs inside a Tokio task; owns the room, its stage
/// timer, and the teardown deadline.
struct RoomActor {
    room: Room,
    timer: StageTimer,
    teardown_at: Option<TokioInstant>,
    receiver: mpsc::Receiver<RoomCommand>,
    broadcast: Arc<dyn Broadcast>,
    archive: Arc<dyn Archive>,
    retired_tx: mpsc::UnboundedSender<Retired>,
    instance: u64,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        loop {
            tokio::select! {
                maybe_cmd = self.receiver.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if let Flow::Retire = self.handle_command(cmd) {
                                self.retire();
                                break;
                            }
                        }
                        // Every handle dropped: the registry replaced
                        // this room under the same code. Exit without
                        // retiring so the successor is never evicted.
                        None => break,
                    }
                }
                tick = self.timer.wait_for_tick() => {
                    self.handle_tick(tick);
                }
                _ = teardown_due(self.teardown_at) => {
                    tracing::info!(
                        room = %self.room.code(),
                        "grace period elapsed, tearing down"
                    );
                    self.retire();
                    break;
                }
            }
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join { player, reply } => {
                let player_id = player.id.clone();
                let result = match self.room.join(player) {
                    Ok(()) => {
                        tracing::info!(
                            room = %self.room.code(),
                            %player_id,
                            players = self.room.roster().len(),
                            "player joined"
                        );
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom {
                            room: snap.clone(),
                        });
                        Ok(snap)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
                Flow::Continue
            }

            RoomCommand::Leave { player_id, reply } => {
                match self.room.leave(&player_id) {
                    Ok(true) => {
                        tracing::info!(
                            room = %self.room.code(),
                            %player_id,
                            "last player left, destroying room"
                        );
                        let _ = reply.send(Ok(None));
                        Flow::Retire
                    }
                    Ok(false) => {
                        tracing::info!(
                            room = %self.room.code(),
                            %player_id,
                            players = self.room.roster().len(),
                            "player left"
                        );
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom {
                            room: snap.clone(),
                        });
                        let _ = reply.send(Ok(Some(snap)));
                        Flow::Continue
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        Flow::Continue
                    }
                }
            }

            RoomCommand::ToggleReady { player_id, reply } => {
                let result = match self.room.toggle_ready(&player_id) {
                    Ok(ready) => {
                        tracing::debug!(
                            room = %self.room.code(),
                            %player_id,
                            ready,
                            "ready toggled"
                        );
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom {
                            room: snap.clone(),
                        });
                        Ok(snap)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
                Flow::Continue
            }

            RoomCommand::StartGame { reply } => {
                let ttl = self.room.start_game();
                // Cancel-before-arm is implicit: arming overwrites any
                // countdown still running.
                self.timer.arm(ttl);
                tracing::info!(
                    room = %self.room.code(),
                    players = self.room.roster().len(),
                    first_ttl = ttl,
                    "game started"
                );
                let snap = self.room.snapshot();
                self.emit(BroadcastEvent::UpdateRoom { room: snap.clone() });
                let _ = reply.send(Ok(snap));
                Flow::Continue
            }

            RoomCommand::UpdateCanvas {
                player_id,
                canvas,
                reply,
            } => {
                self.room.update_canvas(canvas);
                let snap = self.room.snapshot();
                self.emit(BroadcastEvent::UpdateRoomCanvas {
                    player_id,
                    room: snap.clone(),
                });
                let _ = reply.send(Ok(snap));
                Flow::Continue
            }

            RoomCommand::AdvanceStage {
                guess,
                canvas,
                reply,
            } => {
                // A finished room is frozen for its grace period: the
                // snapshot was already archived and the teardown
                // deadline must not move.
                if self.room.is_finished() {
                    let _ = reply.send(Ok(self.room.snapshot()));
                    return Flow::Continue;
                }
                match self.room.advance_stage(guess, canvas) {
                    Ok(Advanced::Next { ttl }) => {
                        self.timer.arm(ttl);
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom {
                            room: snap.clone(),
                        });
                        let _ = reply.send(Ok(snap));
                    }
                    Ok(Advanced::Finished) => {
                        self.timer.cancel();
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom {
                            room: snap.clone(),
                        });
                        // Archival happens only after the final state
                        // has been committed and broadcast.
                        self.archive.store(snap.clone());
                        self.teardown_at =
                            Some(TokioInstant::now() + GRACE_PERIOD);
                        tracing::info!(
                            room = %self.room.code(),
                            grace_secs = GRACE_PERIOD.as_secs(),
                            "game finished, teardown scheduled"
                        );
                        let _ = reply.send(Ok(snap));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
                Flow::Continue
            }

            RoomCommand::SendMessage {
                player_id,
                message,
                buzz,
                reply,
            } => {
                self.room.append_chat(player_id, message, buzz);
                let snap = self.room.snapshot();
                self.emit(BroadcastEvent::UpdateChatHistory {
                    room: snap.clone(),
                });
                let _ = reply.send(Ok(snap));
                Flow::Continue
            }

            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
                Flow::Continue
            }

            RoomCommand::ConnectionLost { conn_id } => {
                match self.room.disconnect(&conn_id) {
                    DisconnectOutcome::Ignored => {
                        tracing::debug!(
                            room = %self.room.code(),
                            %conn_id,
                            "disconnect ignored"
                        );
                        Flow::Continue
                    }
                    DisconnectOutcome::Removed { empty: true } => {
                        tracing::info!(
                            room = %self.room.code(),
                            %conn_id,
                            "room empty after disconnect, destroying"
                        );
                        Flow::Retire
                    }
                    DisconnectOutcome::Removed { empty: false } => {
                        tracing::info!(
                            room = %self.room.code(),
                            %conn_id,
                            players = self.room.roster().len(),
                            "player removed after disconnect"
                        );
                        let snap = self.room.snapshot();
                        self.emit(BroadcastEvent::UpdateRoom { room: snap });
                        Flow::Continue
                    }
                }
            }
        }
    }

    fn handle_tick(&mut self, tick: TimerTick) {
        self.room.tick_active_stage(tick.remaining);
        let snap = self.room.snapshot();
        self.emit(BroadcastEvent::UpdateRoom { room: snap });
        if tick.expired {
            // Informational only: expiry never forces an advance.
            tracing::debug!(
                room = %self.room.code(),
                "stage countdown expired"
            );
        }
    }

    fn emit(&self, event: BroadcastEvent) {
        self.broadcast.emit(self.room.code(), event);
    }

    fn retire(&self) {
        let _ = self.retired_tx.send(Retired {
            code: self.room.code().clone(),
            instance: self.instance,
        });
    }
}

/// Pends forever until a teardown deadline is set, then sleeps to it.
async fn teardown_due(at: Option<TokioInstant>) {
    match at {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    code: RoomCode,
    options: RoomOptions,
    conn: ConnId,
    instance: u64,
    broadcast: Arc<dyn Broadcast>,
    archive: Arc<dyn Archive>,
    retired_tx: mpsc::UnboundedSender<Retired>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room: Room::new(code.clone(), options, conn),
        timer: StageTimer::idle(),
        teardown_at: None,
        receiver: rx,
        broadcast,
        archive,
        retired_tx,
        instance,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        instance,
        sender: tx,
    }
}
