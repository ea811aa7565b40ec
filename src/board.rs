//! Board coordinates, factions and piece archetypes
//!
//! These are the plain value types every other module speaks in. Nothing here
//! knows about rules or animation.
//!
//! # Coordinate System
//!
//! - `file` is the column (0 = a, 7 = h)
//! - `rank` is the row (0 = rank 1, 7 = rank 8)
//! - World space places square `(file, rank)` at `Vec3::new(file, 0.0, rank)`,
//!   so the board centre sits at `(3.5, 0.0, 3.5)`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

/// Squares along one edge of the board
pub const BOARD_SIZE: u8 = 8;

/// World-space centre of the board
pub const BOARD_CENTER: Vec3 = Vec3::new(3.5, 0.0, 3.5);

/// A square on the board, immutable and compared by value
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct BoardPosition {
    file: u8,
    rank: u8,
}

impl BoardPosition {
    /// Returns `None` when either coordinate is off the board.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < BOARD_SIZE && rank < BOARD_SIZE).then_some(Self { file, rank })
    }

    /// Builds a position, clamping out-of-range coordinates onto the board edge.
    pub const fn clamped(file: u8, rank: u8) -> Self {
        let file = if file >= BOARD_SIZE { BOARD_SIZE - 1 } else { file };
        let rank = if rank >= BOARD_SIZE { BOARD_SIZE - 1 } else { rank };
        Self { file, rank }
    }

    /// Parses algebraic notation such as `"e4"`.
    pub fn from_algebraic(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() || !file.is_ascii_lowercase() || !rank.is_ascii_digit() {
            return None;
        }
        let file = (file as u8).checked_sub(b'a')?;
        let rank = (rank as u8).checked_sub(b'1')?;
        Self::new(file, rank)
    }

    pub const fn file(self) -> u8 {
        self.file
    }

    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// World-space translation of the square centre at board height
    pub fn to_world(self) -> Vec3 {
        Vec3::new(self.file as f32, 0.0, self.rank as f32)
    }

    /// Straight-line distance in squares
    pub fn distance(self, other: BoardPosition) -> f32 {
        let df = self.file as f32 - other.file as f32;
        let dr = self.rank as f32 - other.rank as f32;
        (df * df + dr * dr).sqrt()
    }

    /// Every square, rank by rank from a1 to h8
    pub fn all() -> impl Iterator<Item = BoardPosition> {
        (0..BOARD_SIZE).flat_map(|rank| (0..BOARD_SIZE).map(move |file| Self { file, rank }))
    }
}

impl fmt::Display for BoardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

/// One of the two opposing sides
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Reflect, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Moves first, starts on ranks 1 and 2
    #[default]
    Light,
    /// Starts on ranks 7 and 8
    Dark,
}

impl Faction {
    pub fn opponent(self) -> Faction {
        match self {
            Faction::Light => Faction::Dark,
            Faction::Dark => Faction::Light,
        }
    }

    /// Resting yaw for pieces of this faction: Light faces +Z, Dark faces -Z.
    pub fn resting_rotation(self) -> Quat {
        match self {
            Faction::Light => Quat::IDENTITY,
            Faction::Dark => Quat::from_rotation_y(PI),
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Light => write!(f, "Light"),
            Faction::Dark => write!(f, "Dark"),
        }
    }
}

/// Combat and animation category of a piece, independent of faction
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PieceArchetype {
    /// The piece whose loss ends the game
    Sovereign,
    /// Long-range spellcaster, the strongest piece
    Caster,
    /// Diagonal-moving healer-mage
    Cleric,
    /// Jumping mounted unit
    Cavalry,
    /// Straight-line fortress
    Bulwark,
    /// Front-line footsoldier
    Skirmisher,
}

impl PieceArchetype {
    pub const ALL: [PieceArchetype; 6] = [
        PieceArchetype::Sovereign,
        PieceArchetype::Caster,
        PieceArchetype::Cleric,
        PieceArchetype::Cavalry,
        PieceArchetype::Bulwark,
        PieceArchetype::Skirmisher,
    ];

    /// Ranged/magic archetypes fight with projectiles; everyone else lunges.
    pub fn is_caster(self) -> bool {
        matches!(self, PieceArchetype::Caster | PieceArchetype::Cleric)
    }

    /// Lowercase name used for asset lookup and logging
    pub fn name(self) -> &'static str {
        match self {
            PieceArchetype::Sovereign => "sovereign",
            PieceArchetype::Caster => "caster",
            PieceArchetype::Cleric => "cleric",
            PieceArchetype::Cavalry => "cavalry",
            PieceArchetype::Bulwark => "bulwark",
            PieceArchetype::Skirmisher => "skirmisher",
        }
    }
}

impl fmt::Display for PieceArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A piece placement used to (re)build the visual board
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub position: BoardPosition,
    pub archetype: PieceArchetype,
    pub faction: Faction,
}

const BACK_ROW: [PieceArchetype; 8] = [
    PieceArchetype::Bulwark,
    PieceArchetype::Cavalry,
    PieceArchetype::Cleric,
    PieceArchetype::Caster,
    PieceArchetype::Sovereign,
    PieceArchetype::Cleric,
    PieceArchetype::Cavalry,
    PieceArchetype::Bulwark,
];

/// The standard 32-piece opening layout
pub fn standard_layout() -> Vec<Placement> {
    let mut placements = Vec::with_capacity(32);
    for (faction, back, front) in [(Faction::Light, 0, 1), (Faction::Dark, 7, 6)] {
        for file in 0..BOARD_SIZE {
            placements.push(Placement {
                position: BoardPosition::clamped(file, back),
                archetype: BACK_ROW[file as usize],
                faction,
            });
            placements.push(Placement {
                position: BoardPosition::clamped(file, front),
                archetype: PieceArchetype::Skirmisher,
                faction,
            });
        }
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds() {
        assert!(BoardPosition::new(7, 7).is_some());
        assert!(BoardPosition::new(8, 0).is_none());
        assert!(BoardPosition::new(0, 8).is_none());
        assert_eq!(BoardPosition::clamped(9, 12), BoardPosition::clamped(7, 7));
    }

    #[test]
    fn test_algebraic_round_trip() {
        let e4 = BoardPosition::from_algebraic("e4").unwrap();
        assert_eq!((e4.file(), e4.rank()), (4, 3));
        assert_eq!(e4.to_string(), "e4");
        assert!(BoardPosition::from_algebraic("i1").is_none());
        assert!(BoardPosition::from_algebraic("a9").is_none());
        assert!(BoardPosition::from_algebraic("a10").is_none());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = BoardPosition::clamped(0, 0);
        let b = BoardPosition::clamped(3, 4);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.distance(a), 5.0);
    }

    #[test]
    fn test_standard_layout_has_unique_squares() {
        let layout = standard_layout();
        assert_eq!(layout.len(), 32);
        let mut squares: Vec<_> = layout.iter().map(|p| p.position).collect();
        squares.sort();
        squares.dedup();
        assert_eq!(squares.len(), 32);

        let sovereigns = layout
            .iter()
            .filter(|p| p.archetype == PieceArchetype::Sovereign)
            .count();
        assert_eq!(sovereigns, 2);
    }

    #[test]
    fn test_caster_split() {
        let casters: Vec<_> = PieceArchetype::ALL
            .iter()
            .filter(|a| a.is_caster())
            .collect();
        assert_eq!(casters, [&PieceArchetype::Caster, &PieceArchetype::Cleric]);
    }
}
