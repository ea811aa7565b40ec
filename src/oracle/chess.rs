//! Standard chess rules through `shakmaty`
//!
//! # Coordinate mapping
//!
//! `BoardPosition { file, rank }` maps to shakmaty's `Square::from_coords`
//! one-to-one; Light is White and moves first.
//!
//! | Archetype  | Role   |
//! |------------|--------|
//! | Sovereign  | King   |
//! | Caster     | Queen  |
//! | Cleric     | Bishop |
//! | Cavalry    | Knight |
//! | Bulwark    | Rook   |
//! | Skirmisher | Pawn   |
//!
//! Castling is addressed by the king's landing square (e1 → g1), never by
//! shakmaty's king-takes-rook encoding.

use super::{MoveOracle, MoveResult, Relocation, SpecialMove};
use crate::board::{BoardPosition, Faction, PieceArchetype, Placement};
use crate::core::error::{OracleError, OracleResult};
use bevy::prelude::*;
use shakmaty::fen::Fen;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Rank, Role, Square,
};
use std::collections::BTreeSet;

pub(crate) fn to_square(position: BoardPosition) -> Square {
    Square::from_coords(
        File::new(u32::from(position.file())),
        Rank::new(u32::from(position.rank())),
    )
}

pub(crate) fn to_position(square: Square) -> BoardPosition {
    let index = square as u8;
    BoardPosition::clamped(index % 8, index / 8)
}

pub(crate) fn faction_of(color: Color) -> Faction {
    match color {
        Color::White => Faction::Light,
        Color::Black => Faction::Dark,
    }
}

pub(crate) fn archetype_of(role: Role) -> PieceArchetype {
    match role {
        Role::King => PieceArchetype::Sovereign,
        Role::Queen => PieceArchetype::Caster,
        Role::Bishop => PieceArchetype::Cleric,
        Role::Knight => PieceArchetype::Cavalry,
        Role::Rook => PieceArchetype::Bulwark,
        Role::Pawn => PieceArchetype::Skirmisher,
    }
}

/// Role a promoting pawn becomes. Archetypes that cannot be promoted to fall
/// back to a queen.
pub(crate) fn promotion_role(choice: Option<PieceArchetype>) -> Role {
    match choice {
        Some(PieceArchetype::Bulwark) => Role::Rook,
        Some(PieceArchetype::Cleric) => Role::Bishop,
        Some(PieceArchetype::Cavalry) => Role::Knight,
        _ => Role::Queen,
    }
}

/// King landing square for a castle written as king + rook squares
fn castle_landing(king: Square, rook: Square) -> (Square, Square) {
    let king_file = king as u8 % 8;
    let rook_file = rook as u8 % 8;
    let rank = king as u8 / 8;
    let (king_to, rook_to) = if rook_file > king_file { (6, 5) } else { (2, 3) };
    (
        to_square(BoardPosition::clamped(king_to, rank)),
        to_square(BoardPosition::clamped(rook_to, rank)),
    )
}

/// Board-level from/to of a move, with castling addressed by king landing
pub(crate) fn move_endpoints(m: &Move) -> Option<(BoardPosition, BoardPosition)> {
    match *m {
        Move::Normal { from, to, .. } | Move::EnPassant { from, to } => {
            Some((to_position(from), to_position(to)))
        }
        Move::Castle { king, rook } => {
            let (king_to, _) = castle_landing(king, rook);
            Some((to_position(king), to_position(king_to)))
        }
        Move::Put { .. } => None,
    }
}

fn parse_position(fen: &str) -> OracleResult<Chess> {
    let bad = |reason: String| OracleError::BadPosition {
        fen: fen.to_string(),
        reason,
    };
    let parsed: Fen = fen.parse().map_err(|e| bad(format!("{e}")))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| bad(format!("{e}")))
}

/// Legal moves of a FEN position, for the AI fallback
pub(crate) fn legal_moves_of(fen: &str) -> OracleResult<(Chess, Vec<Move>)> {
    let position = parse_position(fen)?;
    let moves = position.legal_moves().into_iter().collect();
    Ok((position, moves))
}

/// [`MoveOracle`] over a standard chess position
#[derive(Debug, Clone, Default)]
pub struct ChessOracle {
    position: Chess,
    /// Where `reset` returns to
    initial: Chess,
}

impl ChessOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary position.
    pub fn from_fen(fen: &str) -> OracleResult<Self> {
        let position = parse_position(fen)?;
        Ok(Self {
            initial: position.clone(),
            position,
        })
    }

    fn find_move(
        &self,
        from: BoardPosition,
        to: BoardPosition,
        promotion: Option<PieceArchetype>,
    ) -> Option<Move> {
        let wanted_role = promotion_role(promotion);
        let mut candidates = self
            .position
            .legal_moves()
            .into_iter()
            .filter(|m| move_endpoints(m) == Some((from, to)));

        let first = candidates.next()?;
        if first.promotion().is_none() {
            return Some(first);
        }
        std::iter::once(first.clone())
            .chain(candidates)
            .find(|m| m.promotion() == Some(wanted_role))
            .or(Some(first))
    }

    fn pieces_of(&self, color: Color) -> Vec<(Square, Role)> {
        BoardPosition::all()
            .map(to_square)
            .filter_map(|sq| {
                self.position
                    .board()
                    .piece_at(sq)
                    .filter(|p| p.color == color)
                    .map(|p| (sq, p.role))
            })
            .collect()
    }
}

impl MoveOracle for ChessOracle {
    fn current_faction(&self) -> Faction {
        faction_of(self.position.turn())
    }

    fn legal_destinations(&self, from: BoardPosition) -> BTreeSet<BoardPosition> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(move_endpoints)
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| t)
            .collect()
    }

    fn submit_move(
        &mut self,
        from: BoardPosition,
        to: BoardPosition,
        promotion: Option<PieceArchetype>,
    ) -> OracleResult<MoveResult> {
        let turn = self.position.turn();
        let Some(m) = self.find_move(from, to, promotion) else {
            let owned = self
                .position
                .board()
                .piece_at(to_square(from))
                .is_some_and(|p| p.color == turn);
            return Err(if owned {
                OracleError::IllegalMove { from, to }
            } else {
                OracleError::NotYourPiece {
                    square: from,
                    faction: faction_of(turn),
                }
            });
        };

        let moved_role = m.role();
        let opponents_before = self.pieces_of(!turn);

        let (special, secondary_relocation) = match m {
            Move::Castle { king, rook } => {
                let (_, rook_to) = castle_landing(king, rook);
                (
                    SpecialMove::Castle,
                    Some(Relocation {
                        from: to_position(rook),
                        to: to_position(rook_to),
                    }),
                )
            }
            Move::EnPassant { .. } => (SpecialMove::EnPassant, None),
            Move::Normal {
                promotion: Some(_), ..
            } => (SpecialMove::Promotion, None),
            _ => (SpecialMove::None, None),
        };

        self.position.play_unchecked(&m);

        // The captured square comes from the board delta rather than from the
        // move geometry.
        let opponents_after = self.pieces_of(!turn);
        let captured = opponents_before
            .into_iter()
            .find(|(sq, role)| !opponents_after.contains(&(*sq, *role)));
        let actual_captured_square = captured
            .map(|(sq, _)| to_position(sq))
            .filter(|sq| *sq != to);

        let result = MoveResult {
            from,
            to,
            mover: faction_of(turn),
            moved_archetype: archetype_of(moved_role),
            captured_archetype: captured.map(|(_, role)| archetype_of(role)),
            is_check: self.position.is_check(),
            is_checkmate: self.position.is_checkmate(),
            is_stalemate: self.position.is_stalemate(),
            is_insufficient_material: self.position.is_insufficient_material(),
            special,
            secondary_relocation,
            actual_captured_square,
            promotion: m.promotion().map(archetype_of),
        };
        debug!("[ORACLE] {} {} -> {} accepted", result.mover, from, to);
        Ok(result)
    }

    fn serialize_board(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    fn reset(&mut self) {
        self.position = self.initial.clone();
    }

    fn layout(&self) -> Vec<Placement> {
        BoardPosition::all()
            .filter_map(|position| {
                let piece = self.position.board().piece_at(to_square(position))?;
                Some(Placement {
                    position,
                    archetype: archetype_of(piece.role),
                    faction: faction_of(piece.color),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::standard_layout;

    fn sq(name: &str) -> BoardPosition {
        BoardPosition::from_algebraic(name).unwrap()
    }

    fn play(oracle: &mut ChessOracle, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            oracle.submit_move(sq(from), sq(to), None).unwrap();
        }
    }

    #[test]
    fn test_square_mapping_round_trips() {
        for position in BoardPosition::all() {
            assert_eq!(to_position(to_square(position)), position);
        }
        assert_eq!(to_square(sq("e4")), Square::E4);
    }

    #[test]
    fn test_initial_layout_matches_standard() {
        let oracle = ChessOracle::new();
        let mut layout = oracle.layout();
        let mut expected = standard_layout();
        layout.sort_by_key(|p| p.position);
        expected.sort_by_key(|p| p.position);
        assert_eq!(layout, expected);
    }

    #[test]
    fn test_legal_destinations() {
        let oracle = ChessOracle::new();
        let targets = oracle.legal_destinations(sq("g1"));
        assert_eq!(targets, BTreeSet::from([sq("f3"), sq("h3")]));
        assert!(oracle.legal_destinations(sq("e7")).is_empty());
        assert!(oracle.legal_destinations(sq("e4")).is_empty());
    }

    #[test]
    fn test_illegal_move_is_rejected_without_change() {
        let mut oracle = ChessOracle::new();
        let before = oracle.serialize_board();
        let err = oracle.submit_move(sq("e2"), sq("e5"), None).unwrap_err();
        assert_eq!(err, OracleError::IllegalMove { from: sq("e2"), to: sq("e5") });
        let err = oracle.submit_move(sq("e7"), sq("e5"), None).unwrap_err();
        assert!(matches!(err, OracleError::NotYourPiece { .. }));
        assert_eq!(oracle.serialize_board(), before);
        assert_eq!(oracle.current_faction(), Faction::Light);
    }

    #[test]
    fn test_capture_reports_archetype() {
        let mut oracle = ChessOracle::new();
        play(&mut oracle, &[("e2", "e4"), ("d7", "d5")]);
        let result = oracle.submit_move(sq("e4"), sq("d5"), None).unwrap();
        assert_eq!(result.captured_archetype, Some(PieceArchetype::Skirmisher));
        assert_eq!(result.actual_captured_square, None);
        assert_eq!(result.captured_square(), Some(sq("d5")));
        assert_eq!(oracle.current_faction(), Faction::Dark);
    }

    #[test]
    fn test_castle_reports_rook_relocation() {
        let mut oracle = ChessOracle::new();
        play(
            &mut oracle,
            &[
                ("e2", "e4"),
                ("e7", "e5"),
                ("g1", "f3"),
                ("b8", "c6"),
                ("f1", "c4"),
                ("g8", "f6"),
            ],
        );
        assert!(oracle.legal_destinations(sq("e1")).contains(&sq("g1")));
        let result = oracle.submit_move(sq("e1"), sq("g1"), None).unwrap();
        assert_eq!(result.special, SpecialMove::Castle);
        assert_eq!(
            result.secondary_relocation,
            Some(Relocation { from: sq("h1"), to: sq("f1") })
        );
        assert_eq!(result.captured_archetype, None);
    }

    #[test]
    fn test_en_passant_reports_captured_square() {
        let mut oracle = ChessOracle::new();
        play(
            &mut oracle,
            &[("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")],
        );
        let result = oracle.submit_move(sq("e5"), sq("d6"), None).unwrap();
        assert_eq!(result.special, SpecialMove::EnPassant);
        assert_eq!(result.actual_captured_square, Some(sq("d5")));
        assert_eq!(result.captured_square(), Some(sq("d5")));
    }

    #[test]
    fn test_promotion_choice_and_default() {
        let fen = "8/P6k/8/8/8/8/8/K7 w - - 0 1";
        let mut oracle = ChessOracle::from_fen(fen).unwrap();
        let result = oracle
            .submit_move(sq("a7"), sq("a8"), Some(PieceArchetype::Cavalry))
            .unwrap();
        assert_eq!(result.special, SpecialMove::Promotion);
        assert_eq!(result.promotion, Some(PieceArchetype::Cavalry));

        let mut oracle = ChessOracle::from_fen(fen).unwrap();
        let result = oracle
            .submit_move(sq("a7"), sq("a8"), Some(PieceArchetype::Sovereign))
            .unwrap();
        assert_eq!(result.promotion, Some(PieceArchetype::Caster));
    }

    #[test]
    fn test_checkmate_flags() {
        let mut oracle = ChessOracle::new();
        play(
            &mut oracle,
            &[
                ("e2", "e4"),
                ("e7", "e5"),
                ("f1", "c4"),
                ("b8", "c6"),
                ("d1", "h5"),
                ("g8", "f6"),
            ],
        );
        let result = oracle.submit_move(sq("h5"), sq("f7"), None).unwrap();
        assert!(result.is_check);
        assert!(result.is_checkmate);
        assert!(result.is_game_over());
        assert_eq!(result.mover, Faction::Light);
    }

    #[test]
    fn test_insufficient_material_is_a_draw() {
        let mut oracle = ChessOracle::from_fen("8/8/8/8/8/8/1n6/K6k w - - 0 1").unwrap();
        let result = oracle.submit_move(sq("a1"), sq("b2"), None).unwrap();
        assert_eq!(result.captured_archetype, Some(PieceArchetype::Cavalry));
        assert!(result.is_insufficient_material);
        assert!(result.is_draw());
    }

    #[test]
    fn test_reset_and_fen() {
        let mut oracle = ChessOracle::new();
        play(&mut oracle, &[("e2", "e4")]);
        assert!(oracle.serialize_board().starts_with("rnbqkbnr/pppppppp/8/8/4P3"));
        oracle.reset();
        assert_eq!(
            oracle.serialize_board(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert!(ChessOracle::from_fen("not a fen").is_err());

        let fen = "8/P6k/8/8/8/8/8/K7 w - - 0 1";
        let mut custom = ChessOracle::from_fen(fen).unwrap();
        play(&mut custom, &[("a1", "b1")]);
        custom.reset();
        assert_eq!(custom.serialize_board(), fen);
    }
}
