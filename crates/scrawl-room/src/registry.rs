//! The room registry: maps live room codes to actor handles.
//!
//! Actors retire themselves by sending a [`Retired`] notice on an
//! unbounded channel; whoever drives the registry (the dispatcher's
//! reaper task) feeds those notices back into [`RoomRegistry::retire`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use scrawl_protocol::{ConnId, RoomCode, RoomOptions};
use tokio::sync::mpsc;

use crate::room::{RoomHandle, spawn_room};
use crate::{Archive, Broadcast};

/// Command-channel depth per room actor.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Monotonic id stamped onto every spawned room, so a retirement notice
/// from a replaced room can be told apart from its successor's.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// A room actor announcing it has shut down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retired {
    pub code: RoomCode,
    pub instance: u64,
}

/// All live rooms, keyed by code.
///
/// Not itself synchronized; the embedding layer wraps it in whatever
/// lock fits its concurrency model. Room state never lives here, only
/// handles.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    broadcast: Arc<dyn Broadcast>,
    archive: Arc<dyn Archive>,
    retired_tx: mpsc::UnboundedSender<Retired>,
}

impl RoomRegistry {
    /// Creates an empty registry and the retirement channel its rooms
    /// will report shutdown on. The caller must drain the receiver and
    /// route each notice to [`RoomRegistry::retire`].
    pub fn new(
        broadcast: Arc<dyn Broadcast>,
        archive: Arc<dyn Archive>,
    ) -> (Self, mpsc::UnboundedReceiver<Retired>) {
        let (retired_tx, retired_rx) = mpsc::unbounded_channel();
        let registry = Self {
            rooms: HashMap::new(),
            broadcast,
            archive,
            retired_tx,
        };
        (registry, retired_rx)
    }

    /// Spawns a room actor and registers its handle.
    ///
    /// A create under an existing code replaces the old handle; the old
    /// actor exits on its own once every handle is dropped, without
    /// disturbing the replacement.
    pub fn create(
        &mut self,
        code: RoomCode,
        options: RoomOptions,
        conn: ConnId,
    ) -> RoomHandle {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let handle = spawn_room(
            code.clone(),
            options,
            conn,
            instance,
            self.broadcast.clone(),
            self.archive.clone(),
            self.retired_tx.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        if self.rooms.insert(code.clone(), handle.clone()).is_some() {
            tracing::warn!(room = %code, "room code reused, previous room replaced");
        }
        tracing::info!(room = %code, "room registered");
        handle
    }

    pub fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Handles of every live room, for roster-style listings.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Applies a retirement notice. Removes the entry only when the
    /// instance matches: a notice from a replaced room must not evict
    /// its successor under the same code. Returns whether an entry was
    /// removed.
    pub fn retire(&mut self, retired: &Retired) -> bool {
        match self.rooms.get(&retired.code) {
            Some(handle) if handle.instance() == retired.instance => {
                self.rooms.remove(&retired.code);
                tracing::info!(room = %retired.code, "room removed from registry");
                true
            }
            _ => false,
        }
    }
}
