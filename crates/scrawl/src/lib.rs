//! # Scrawl
//!
//! Session coordinator for a real-time drawing-and-guessing party game.
//!
//! Clients send named events (`createRoom`, `joinRoom`, `startGame`, …)
//! over whatever transport the embedding server speaks; the
//! [`Dispatcher`] routes each event to the right room actor, answers the
//! caller with an [`Ack`], and pushes group updates through the
//! [`Broadcast`] seam. Room state itself lives in `scrawl-room`; wire
//! types in `scrawl-protocol`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scrawl::{Dispatcher, init_tracing};
//!
//! // init_tracing();
//! // let dispatcher = Dispatcher::new(my_broadcast, my_archive);
//! // let ack = dispatcher.dispatch(&conn_id, event).await;
//! ```

mod dispatcher;

pub use dispatcher::Dispatcher;
pub use scrawl_protocol::{
    Ack, BroadcastEvent, ClientEvent, ConnId, Disconnected, ErrorCode,
    Player, PlayerId, RoomCode, RoomOptions, RoomSnapshot,
};
pub use scrawl_room::{Archive, Broadcast, GRACE_PERIOD, RoomError};

/// Installs the global tracing subscriber, honoring `RUST_LOG` and
/// defaulting to `info`. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
