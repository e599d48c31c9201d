//! The inbound event set and the response envelope.
//!
//! Every client message is one variant of [`ClientEvent`] — a closed,
//! typed set validated at the transport boundary before it reaches the
//! core. Every handler answers with an [`Ack`]; successful mutations
//! additionally emit a [`BroadcastEvent`] to the room's whole group.

use serde::{Deserialize, Serialize};

use crate::{ConnId, Player, PlayerId, RoomCode, RoomSnapshot};

/// Settings supplied with `createRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    pub name: String,
    pub is_private: bool,
    pub max_players: usize,
    /// The creating player; becomes the room owner and first drawer.
    pub owner: Player,
    /// Draw-stage duration in seconds.
    pub draw_seconds: u32,
    /// Guess-stage duration in seconds.
    pub guess_seconds: u32,
}

/// A named event from a client, already validated and decoded by the
/// transport. The `event` tag carries the event name on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    CreateRoom { code: RoomCode, room: RoomOptions },

    #[serde(rename_all = "camelCase")]
    JoinRoom { code: RoomCode, player: Player },

    #[serde(rename_all = "camelCase")]
    LeaveRoom { code: RoomCode, player: PlayerId },

    #[serde(rename_all = "camelCase")]
    GetRoom { code: RoomCode },

    GetRooms,

    #[serde(rename_all = "camelCase")]
    ToggleReady { code: RoomCode, player_id: PlayerId },

    #[serde(rename_all = "camelCase")]
    StartGame { code: RoomCode },

    #[serde(rename_all = "camelCase")]
    UpdateRoomCanvas {
        code: RoomCode,
        player_id: PlayerId,
        canvas: String,
    },

    /// Close out the active stage and move to the next one. `guess` and
    /// `canvas` are merged into the current stage before advancing and
    /// carried into the new active stage.
    #[serde(rename_all = "camelCase")]
    AdvanceStage {
        code: RoomCode,
        #[serde(default)]
        guess: Option<String>,
        #[serde(default)]
        canvas: Option<String>,
    },

    /// A chat message or, with `buzz`, a content-less ping.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        code: RoomCode,
        player: PlayerId,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        buzz: bool,
    },
}

/// The closed set of recoverable error codes reported to callers.
///
/// Wire values are snake_case (`"room_not_found"` etc.) to match the
/// client SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    PlayerAlreadyInRoom,
    PlayerNotFound,
    MaxPlayersReached,
}

/// The response envelope returned to the triggering caller by every
/// handler. Never broadcast — group updates travel as [`BroadcastEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomSnapshot>,
    /// Set only by `getRooms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<RoomSnapshot>>,
}

impl Ack {
    /// A bare success ack, used when the room no longer exists to
    /// snapshot (e.g. the last player just left).
    pub fn ok() -> Self {
        Self {
            error: false,
            error_code: None,
            message: None,
            room: None,
            rooms: None,
        }
    }

    /// A success ack carrying the updated room snapshot.
    pub fn room(room: RoomSnapshot) -> Self {
        Self {
            error: false,
            error_code: None,
            message: None,
            room: Some(room),
            rooms: None,
        }
    }

    /// A success ack carrying a room listing.
    pub fn rooms(rooms: Vec<RoomSnapshot>) -> Self {
        Self {
            error: false,
            error_code: None,
            message: None,
            room: None,
            rooms: Some(rooms),
        }
    }

    /// An error ack. `code` is `None` for conditions outside the closed
    /// wire error set (the message still explains what happened).
    pub fn failure(code: Option<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            error_code: code,
            message: Some(message.into()),
            room: None,
            rooms: None,
        }
    }
}

/// A group broadcast emitted to every member of a room after a
/// successful mutation. Delivery is fire-and-forget: unordered across
/// distinct recipients, FIFO to a single recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Roster, settings, or game state changed.
    #[serde(rename_all = "camelCase")]
    UpdateRoom { room: RoomSnapshot },

    /// The shared canvas was replaced. Carries the drawing player so
    /// clients can skip re-rendering their own strokes.
    #[serde(rename_all = "camelCase")]
    UpdateRoomCanvas {
        player_id: PlayerId,
        room: RoomSnapshot,
    },

    /// A chat entry was appended; carries the full history.
    #[serde(rename_all = "camelCase")]
    UpdateChatHistory { room: RoomSnapshot },
}

impl BroadcastEvent {
    /// The room snapshot carried by this event, whatever the variant.
    pub fn room(&self) -> &RoomSnapshot {
        match self {
            Self::UpdateRoom { room }
            | Self::UpdateRoomCanvas { room, .. }
            | Self::UpdateChatHistory { room } => room,
        }
    }
}

/// A connection-scoped notification from the transport: the given
/// connection dropped out of the given room's group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    pub code: RoomCode,
    pub conn_id: ConnId,
}
