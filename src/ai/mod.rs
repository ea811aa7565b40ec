//! AI opponent boundary
//!
//! The orchestrator talks to whatever plays the AI side through
//! [`MoveSearch`]: it posts a request tagged with its current epoch and later
//! polls for a reply. Replies echo the epoch, so a reply that belongs to a
//! game that has since been reset can be recognised and dropped.
//!
//! # Implementations
//!
//! - [`UciEngine`]: an external engine process speaking UCI
//! - [`RandomMoveSearch`]: picks a legal move, preferring captures
//! - [`ResilientSearch`]: uses the engine while its moves are legal and
//!   falls back to the random search for good once it fails
//!
//! # Difficulty
//!
//! | Difficulty | Think time | UCI Skill Level |
//! |------------|------------|-----------------|
//! | Easy       | 0.5s       | 3               |
//! | Medium     | 1.5s       | 10              |
//! | Hard       | 3.0s       | 20              |

pub mod random;
pub mod resilient;
#[cfg(not(target_arch = "wasm32"))]
pub mod uci;

pub use random::RandomMoveSearch;
pub use resilient::ResilientSearch;
#[cfg(not(target_arch = "wasm32"))]
pub use uci::UciEngine;

use crate::board::{BoardPosition, PieceArchetype};
use crate::core::error::AiError;
use serde::{Deserialize, Serialize};

/// AI strength
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl AiDifficulty {
    pub fn think_time_secs(self) -> f32 {
        match self {
            AiDifficulty::Easy => 0.5,
            AiDifficulty::Medium => 1.5,
            AiDifficulty::Hard => 3.0,
        }
    }

    pub fn movetime_ms(self) -> u64 {
        (self.think_time_secs() * 1000.0) as u64
    }

    pub fn skill_level(self) -> u8 {
        match self {
            AiDifficulty::Easy => 3,
            AiDifficulty::Medium => 10,
            AiDifficulty::Hard => 20,
        }
    }
}

/// A best-move request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiRequest {
    /// Orchestrator epoch at the time of asking
    pub epoch: u64,
    /// Serialized position (FEN)
    pub board: String,
}

/// A move chosen by the AI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AiMove {
    pub from: BoardPosition,
    pub to: BoardPosition,
    pub promotion: Option<PieceArchetype>,
}

/// Answer to an [`AiRequest`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiReply {
    pub epoch: u64,
    pub result: Result<AiMove, AiError>,
}

/// AI collaborator consumed by the orchestrator
pub trait MoveSearch: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Starts a search. Any search still running is abandoned.
    fn request_best_move(&mut self, request: AiRequest);

    /// Returns the reply once the search has finished.
    fn poll_reply(&mut self) -> Option<AiReply>;

    /// Cancels the pending search without producing a reply.
    fn stop(&mut self);

    fn set_difficulty(&mut self, difficulty: AiDifficulty);
}

/// Parses a long-algebraic UCI move such as `e2e4` or `e7e8q`.
///
/// Castling is expected in king-landing form (`e1g1`), which is what UCI
/// engines send for standard chess.
pub fn parse_uci_move(text: &str) -> Option<AiMove> {
    let text = text.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return None;
    }
    let from = BoardPosition::from_algebraic(&text[0..2])?;
    let to = BoardPosition::from_algebraic(&text[2..4])?;
    let promotion = match text[4..].chars().next() {
        None => None,
        Some('q') => Some(PieceArchetype::Caster),
        Some('r') => Some(PieceArchetype::Bulwark),
        Some('b') => Some(PieceArchetype::Cleric),
        Some('n') => Some(PieceArchetype::Cavalry),
        Some(_) => return None,
    };
    Some(AiMove {
        from,
        to,
        promotion,
    })
}

/// Formats a move in UCI long-algebraic notation.
pub fn format_uci_move(m: &AiMove) -> String {
    let suffix = match m.promotion {
        Some(PieceArchetype::Caster) => "q",
        Some(PieceArchetype::Bulwark) => "r",
        Some(PieceArchetype::Cleric) => "b",
        Some(PieceArchetype::Cavalry) => "n",
        _ => "",
    };
    format!("{}{}{}", m.from, m.to, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uci_move() {
        let m = parse_uci_move("e2e4").unwrap();
        assert_eq!(m.from.to_string(), "e2");
        assert_eq!(m.to.to_string(), "e4");
        assert_eq!(m.promotion, None);

        let m = parse_uci_move("a7a8n").unwrap();
        assert_eq!(m.promotion, Some(PieceArchetype::Cavalry));
        assert_eq!(format_uci_move(&m), "a7a8n");

        assert!(parse_uci_move("(none)").is_none());
        assert!(parse_uci_move("e2e9").is_none());
        assert!(parse_uci_move("e7e8k").is_none());
        assert!(parse_uci_move("e2").is_none());
    }

    #[test]
    fn test_difficulty_table() {
        assert_eq!(AiDifficulty::Easy.movetime_ms(), 500);
        assert_eq!(AiDifficulty::Medium.movetime_ms(), 1500);
        assert_eq!(AiDifficulty::Hard.skill_level(), 20);
        assert_eq!(AiDifficulty::default(), AiDifficulty::Medium);
    }
}
