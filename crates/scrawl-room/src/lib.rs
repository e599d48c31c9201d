//! Room lifecycle management for Scrawl.
//!
//! Each room runs as an isolated Tokio task (actor model) owning the
//! whole aggregate: roster, settings, chat history, canvas, the optional
//! game stage chain, and the one live stage timer. Commands arrive on an
//! mpsc channel and are processed one at a time, so every mutation of a
//! room — client events and timer ticks alike — is serialized without
//! shared locks.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — process-wide room-code → room mapping
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Room`] — the aggregate state itself
//! - [`Game`] — the singly linked chain of draw/guess stages
//! - [`Roster`] — membership, capacity, readiness
//! - [`Broadcast`] / [`Archive`] — external collaborator seams

mod collab;
mod error;
mod game;
mod registry;
mod room;
mod roster;
pub mod words;

pub use collab::{Archive, Broadcast};
pub use error::RoomError;
pub use game::{Advanced, Game, Stage};
pub use registry::{Retired, RoomRegistry};
pub use room::{DisconnectOutcome, GRACE_PERIOD, Room, RoomHandle};
pub use roster::Roster;
