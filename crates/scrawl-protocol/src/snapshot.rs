//! Serialized room state.
//!
//! A snapshot is the full room as broadcast to the room's group after
//! every successful mutation: the roster as an id-keyed map, the game as
//! a stage-id-keyed map plus the active stage id. The per-room stage
//! timer is deliberately absent — it is server-side machinery, not
//! state the clients render.
//!
//! All wire names are camelCase to match the client SDK.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ConnId, PlayerId, StageId};

/// A player as stored in a room's roster and serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Stable identity id from the identity provider.
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Transient transport connection id. Stamped by the dispatcher when
    /// the player creates or joins a room; `None` until then.
    #[serde(default)]
    pub conn_id: Option<ConnId>,
    /// Lobby ready flag, flipped by `toggleReady`.
    #[serde(default)]
    pub ready: bool,
}

/// One entry of a room's append-only chat history.
///
/// Either a text message or a content-less "buzz" ping. `delivered` is
/// set true unconditionally at append time — the broadcast transport is
/// fire-and-forget, so there is nothing to wait for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub player_id: PlayerId,
    /// `None` for a buzz ping; serialized as an explicit `null`.
    pub message: Option<String>,
    /// Unix timestamp in milliseconds, taken at append time.
    pub timestamp_ms: u64,
    pub delivered: bool,
    pub buzz: bool,
}

/// What a stage asks of its player: draw a prompt or guess a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Draw,
    Guess,
}

/// One turn of the game chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub kind: StageKind,
    /// The assigned player. An owned copy, not a roster reference, so a
    /// mid-game roster change cannot invalidate it.
    pub player: Player,
    /// Remaining seconds before this stage's countdown reaches zero.
    pub ttl: u32,
    /// Draw stages: the subject to draw. Guess stages: filled at advance
    /// time by carrying the previous stage's word forward.
    pub word: Option<String>,
    /// This stage's canvas, handed forward on advance.
    pub canvas: Option<String>,
    /// Forward reference to the next stage; `None` only on the terminal
    /// stage of the chain.
    pub next_stage: Option<StageId>,
}

/// The turn chain of a started room: a stage-id-keyed map plus the id of
/// the single active stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub stages: HashMap<StageId, StageSnapshot>,
    pub active_stage: StageId,
}

/// The full serialized room, broadcast to every member of the room's
/// group after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: crate::RoomCode,
    pub name: String,
    pub is_private: bool,
    pub max_players: usize,
    pub has_started: bool,
    pub is_finished: bool,
    /// The current owner — always a roster member while the room is open.
    pub owner: Player,
    /// Configured Draw-stage duration in seconds.
    pub draw_seconds: u32,
    /// Configured Guess-stage duration in seconds.
    pub guess_seconds: u32,
    /// Latest shared canvas (full-replace semantics).
    pub canvas: Option<String>,
    /// Roster keyed by player id; iteration order is irrelevant.
    pub players: HashMap<PlayerId, Player>,
    /// Append-only, insertion-ordered chat history.
    pub chat_history: Vec<ChatEntry>,
    /// Present only once the game has started.
    pub game: Option<GameSnapshot>,
}
