//! Particle colours per archetype and faction

use crate::board::{Faction, PieceArchetype};
use bevy::color::Mix;
use bevy::prelude::*;

/// Colours a battle paints with
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BattlePalette {
    /// Converging ring before a cast
    pub charge: Color,
    /// Sparks behind the projectile
    pub trail: Color,
    /// Burst at the defender on hit
    pub impact: Color,
}

impl BattlePalette {
    pub fn for_attacker(archetype: PieceArchetype, faction: Faction) -> Self {
        let base = match archetype {
            PieceArchetype::Caster => Color::srgb(0.55, 0.3, 1.0),
            PieceArchetype::Cleric => Color::srgb(1.0, 0.92, 0.55),
            PieceArchetype::Sovereign => Color::srgb(1.0, 0.8, 0.2),
            PieceArchetype::Cavalry => Color::srgb(0.95, 0.55, 0.25),
            PieceArchetype::Bulwark => Color::srgb(0.7, 0.72, 0.78),
            PieceArchetype::Skirmisher => Color::srgb(0.9, 0.35, 0.3),
        };
        let tint = match faction {
            Faction::Light => Color::srgb(1.0, 1.0, 1.0),
            Faction::Dark => Color::srgb(0.45, 0.2, 0.35),
        };
        Self {
            charge: base,
            trail: base.mix(&tint, 0.35),
            impact: base.mix(&tint, 0.2),
        }
    }
}

/// Colour of the soul rising from a fallen piece
pub fn soul_color(faction: Faction) -> Color {
    match faction {
        Faction::Light => Color::srgb(0.75, 0.9, 1.0),
        Faction::Dark => Color::srgb(0.6, 0.15, 0.55),
    }
}

/// Neutral dust the fallen piece dissolves into
pub const DISSOLVE_COLOR: Color = Color::srgb(0.55, 0.55, 0.55);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factions_differ() {
        for archetype in PieceArchetype::ALL {
            let light = BattlePalette::for_attacker(archetype, Faction::Light);
            let dark = BattlePalette::for_attacker(archetype, Faction::Dark);
            assert_eq!(light.charge, dark.charge);
            assert_ne!(light.trail, dark.trail);
        }
        assert_ne!(soul_color(Faction::Light), soul_color(Faction::Dark));
    }
}
