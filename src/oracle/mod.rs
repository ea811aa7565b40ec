//! Move-legality oracle boundary
//!
//! The orchestrator never decides legality itself. It asks a [`MoveOracle`]
//! for legal destinations, submits moves to it, and plays back whatever
//! [`MoveResult`] comes out, including the special-move metadata needed to
//! choreograph captures, castling and promotion.
//!
//! [`ChessOracle`] is the production implementation, backed by `shakmaty`.

pub mod chess;

pub use chess::ChessOracle;

use crate::board::{BoardPosition, Faction, PieceArchetype, Placement};
use crate::core::error::OracleResult;
use std::collections::BTreeSet;

/// Kind of special move carried by a [`MoveResult`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpecialMove {
    #[default]
    None,
    /// A capture whose captured piece is not on the destination square
    EnPassant,
    /// A secondary piece relocates alongside the mover
    Castle,
    /// The mover is replaced by another archetype on arrival
    Promotion,
}

/// A from/to pair for a piece that moves as a side effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub from: BoardPosition,
    pub to: BoardPosition,
}

/// Everything the oracle knows about an accepted move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub from: BoardPosition,
    pub to: BoardPosition,
    pub mover: Faction,
    pub moved_archetype: PieceArchetype,
    pub captured_archetype: Option<PieceArchetype>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    /// Neither side can possibly deliver mate
    pub is_insufficient_material: bool,
    pub special: SpecialMove,
    pub secondary_relocation: Option<Relocation>,
    /// Where the captured piece actually stood, when that is not `to`
    pub actual_captured_square: Option<BoardPosition>,
    /// Archetype the mover becomes on a promotion
    pub promotion: Option<PieceArchetype>,
}

impl MoveResult {
    /// A plain non-capturing move with no terminal flags, for building
    /// results by hand.
    pub fn quiet(
        from: BoardPosition,
        to: BoardPosition,
        mover: Faction,
        moved_archetype: PieceArchetype,
    ) -> Self {
        Self {
            from,
            to,
            mover,
            moved_archetype,
            captured_archetype: None,
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
            is_insufficient_material: false,
            special: SpecialMove::None,
            secondary_relocation: None,
            actual_captured_square: None,
            promotion: None,
        }
    }

    /// Square the captured piece stood on, if anything was captured
    pub fn captured_square(&self) -> Option<BoardPosition> {
        self.captured_archetype
            .map(|_| self.actual_captured_square.unwrap_or(self.to))
    }

    pub fn is_draw(&self) -> bool {
        self.is_stalemate || self.is_insufficient_material
    }

    pub fn is_game_over(&self) -> bool {
        self.is_checkmate || self.is_draw()
    }
}

/// Rules engine consumed by the orchestrator
pub trait MoveOracle: Send + Sync {
    /// Side to move
    fn current_faction(&self) -> Faction;

    /// Legal destinations for the piece on `from`. Empty when the square is
    /// empty or holds a piece of the side not to move.
    fn legal_destinations(&self, from: BoardPosition) -> BTreeSet<BoardPosition>;

    /// Validates and applies a move. A rejected move leaves the position
    /// untouched.
    fn submit_move(
        &mut self,
        from: BoardPosition,
        to: BoardPosition,
        promotion: Option<PieceArchetype>,
    ) -> OracleResult<MoveResult>;

    /// Current position in the notation the AI collaborator understands
    fn serialize_board(&self) -> String;

    /// Returns to the initial position.
    fn reset(&mut self);

    /// Every piece currently on the board
    fn layout(&self) -> Vec<Placement>;
}
