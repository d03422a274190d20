//! Error types for Mole

use thiserror::Error;

use crate::{PlayerId, SessionId};

/// Core Mole errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoleError {
    // Session errors
    #[error("Game not found: {0}")]
    GameNotFound(SessionId),

    #[error("Cannot start a round without a location")]
    MissingLocation,

    #[error("Cannot start a round with no players")]
    EmptyRoster,

    #[error("A round is already in progress")]
    AlreadyInProgress,

    #[error("Display name must not be empty")]
    InvalidName,

    #[error("The host cannot kick themselves")]
    CannotKickSelf,

    // Authority errors
    #[error("Permission denied: player {player} is not the host of game {session}")]
    PermissionDenied { player: PlayerId, session: SessionId },

    // Store errors
    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    #[error("Overlapping paths in one update: {first} and {second}")]
    OverlappingPaths { first: String, second: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Corrupt data at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl MoleError {
    /// Wrap a serde decode failure for the value stored at `path`
    pub fn corrupt(path: impl Into<String>, err: serde_json::Error) -> Self {
        MoleError::Corrupt {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Whether the error came from the transport rather than the game rules
    pub fn is_transport(&self) -> bool {
        matches!(self, MoleError::StoreUnavailable(_))
    }
}

/// Result type for Mole operations
pub type MoleResult<T> = Result<T, MoleError>;
