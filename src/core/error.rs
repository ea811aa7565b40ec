//! Error types for the arena
//!
//! One enum per collaborator boundary. Most of these never reach the
//! orchestrator: rejected moves, missing assets and AI failures are recovered
//! where they happen and only logged.

use crate::board::{BoardPosition, Faction};
use std::path::PathBuf;
use thiserror::Error;

/// Rules oracle failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The move is not legal in the current position
    #[error("Illegal move {from} -> {to}")]
    IllegalMove { from: BoardPosition, to: BoardPosition },

    /// The source square holds no piece of the side to move
    #[error("No {faction} piece on {square}")]
    NotYourPiece {
        square: BoardPosition,
        faction: Faction,
    },

    /// A serialized position that failed to parse or is not playable
    #[error("Invalid position '{fen}': {reason}")]
    BadPosition { fen: String, reason: String },
}

/// Piece registry invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Square {0} is already occupied")]
    Occupied(BoardPosition),

    #[error("Square {0} is empty")]
    Empty(BoardPosition),
}

/// Model loading failures, always recovered with a primitive fallback
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Model not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read clip manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse clip manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// AI collaborator failures, always recovered by the random fallback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Failed to start engine '{path}': {reason}")]
    Spawn { path: String, reason: String },

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("Engine process exited")]
    ProcessGone,

    #[error("Engine did not answer '{0}' in time")]
    Timeout(&'static str),

    #[error("No legal move available")]
    NoLegalMove,

    #[error("Engine proposed illegal move {from} -> {to}")]
    IllegalMove { from: BoardPosition, to: BoardPosition },
}

/// Settings persistence failures
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_squares() {
        let from = BoardPosition::from_algebraic("e2").unwrap();
        let to = BoardPosition::from_algebraic("e5").unwrap();
        let err = OracleError::IllegalMove { from, to };
        assert_eq!(err.to_string(), "Illegal move e2 -> e5");
        assert_eq!(
            RegistryError::Occupied(to).to_string(),
            "Square e5 is already occupied"
        );
    }
}
