//! Wire types for Scrawl.
//!
//! This crate defines the "language" spoken across the transport
//! boundary:
//!
//! - **Identifiers** ([`PlayerId`], [`RoomCode`], [`ConnId`], [`StageId`])
//! - **Events** ([`ClientEvent`], [`BroadcastEvent`]) — the closed set of
//!   named messages entering and leaving the core.
//! - **Envelope** ([`Ack`], [`ErrorCode`]) — what every handler returns
//!   to the triggering caller.
//! - **Snapshots** ([`RoomSnapshot`], [`GameSnapshot`], [`StageSnapshot`])
//!   — the full serialized room state broadcast to a room's group.
//!
//! The protocol layer is pure data + serde. It knows nothing about
//! sockets, rooms, or timers — the transport validates and decodes
//! payloads into these types before they reach the core.

mod event;
mod ids;
mod snapshot;

pub use event::{
    Ack, BroadcastEvent, ClientEvent, Disconnected, ErrorCode, RoomOptions,
};
pub use ids::{ConnId, PlayerId, RoomCode, StageId};
pub use snapshot::{
    ChatEntry, GameSnapshot, Player, RoomSnapshot, StageKind, StageSnapshot,
};
