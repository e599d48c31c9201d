//! Error types for the room layer.

use scrawl_protocol::{ErrorCode, PlayerId, RoomCode};

/// Errors that can occur during room operations.
///
/// All of these are recoverable and reported only to the triggering
/// caller — never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room under this code. Also returned when a room's command
    /// channel has closed: a torn-down room is indistinguishable from a
    /// room that never existed.
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),

    /// The joining player's id is already in the roster.
    #[error("player {0} is already in the room")]
    PlayerAlreadyInRoom(PlayerId),

    /// The player is not a roster member.
    #[error("player {0} not found in the room")]
    PlayerNotFound(PlayerId),

    /// The roster is at capacity.
    #[error("room is already full")]
    MaxPlayersReached,

    /// Joins are rejected once the game has started. Not part of the
    /// closed wire error-code set; acked with the code omitted.
    #[error("room has already started")]
    RoomStarted,

    /// `advanceStage` against a room whose game never started. Not part
    /// of the closed wire error-code set.
    #[error("game has not started")]
    GameNotStarted,
}

impl RoomError {
    /// The wire error code for this error, if it has one.
    pub fn wire_code(&self) -> Option<ErrorCode> {
        match self {
            Self::RoomNotFound(_) => Some(ErrorCode::RoomNotFound),
            Self::PlayerAlreadyInRoom(_) => {
                Some(ErrorCode::PlayerAlreadyInRoom)
            }
            Self::PlayerNotFound(_) => Some(ErrorCode::PlayerNotFound),
            Self::MaxPlayersReached => Some(ErrorCode::MaxPlayersReached),
            Self::RoomStarted | Self::GameNotStarted => None,
        }
    }
}
