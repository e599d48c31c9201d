//! External collaborator seams.
//!
//! The core never talks to sockets or storage directly. The transport
//! that delivers events and performs group broadcast, and the store
//! that archives finished rooms, plug in behind these traits.

use scrawl_protocol::{BroadcastEvent, ConnId, RoomCode, RoomSnapshot};

/// Group-broadcast transport, keyed by room code.
///
/// All methods are fire-and-forget and infallible from the core's view:
/// delivery failures are invisible to it, there are no retries, and no
/// method may block. Delivery is unordered across distinct recipients
/// but FIFO to a single recipient.
pub trait Broadcast: Send + Sync + 'static {
    /// Adds a connection to a room's group.
    fn join(&self, code: &RoomCode, conn: &ConnId);

    /// Removes a connection from a room's group.
    fn leave(&self, code: &RoomCode, conn: &ConnId);

    /// Emits an event to every member of a room's group.
    fn emit(&self, code: &RoomCode, event: BroadcastEvent);

    /// Closes a room's group entirely (room torn down).
    fn close(&self, code: &RoomCode);
}

/// Archival store for finished rooms.
///
/// Called exactly once per room, after the final snapshot has been
/// committed and broadcast. Implementations that persist asynchronously
/// should spawn; the room actor does not wait.
pub trait Archive: Send + Sync + 'static {
    fn store(&self, room: RoomSnapshot);
}
