//! Turn state owned by the orchestrator
//!
//! [`TurnState`] is the single record of whose turn it is, what is selected
//! and whether a move is still playing out. Only the orchestrator mutates it.

use crate::board::{BoardPosition, Faction};
use bevy::prelude::*;
use std::collections::BTreeSet;

/// Phase of the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum TurnPhase {
    /// Nothing selected; a click on an own piece selects it
    ///
    /// Valid transitions: → Selected, → MoveInFlight (AI move)
    #[default]
    Idle,

    /// A piece is selected and its legal destinations are known
    ///
    /// Valid transitions: → Selected (reselect), → MoveInFlight, → Idle
    Selected,

    /// An accepted move is playing out; all clicks are ignored
    ///
    /// Valid transitions: → Idle, → GameOver
    MoveInFlight,

    /// Terminal until an external reset
    GameOver,
}

impl TurnPhase {
    pub fn accepts_input(self) -> bool {
        matches!(self, TurnPhase::Idle | TurnPhase::Selected)
    }

    fn allows(self, next: TurnPhase) -> bool {
        matches!(
            (self, next),
            (TurnPhase::Idle, TurnPhase::Selected)
                | (TurnPhase::Idle, TurnPhase::MoveInFlight)
                | (TurnPhase::Selected, TurnPhase::Selected)
                | (TurnPhase::Selected, TurnPhase::MoveInFlight)
                | (TurnPhase::Selected, TurnPhase::Idle)
                | (TurnPhase::MoveInFlight, TurnPhase::Idle)
                | (TurnPhase::MoveInFlight, TurnPhase::GameOver)
        )
    }
}

/// Authoritative turn state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub active_faction: Faction,
    pub selected: Option<BoardPosition>,
    pub legal_targets: BTreeSet<BoardPosition>,
    pub is_move_in_flight: bool,
    pub is_ai_thinking: bool,
    pub(crate) phase: TurnPhase,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            active_faction: Faction::Light,
            selected: None,
            legal_targets: BTreeSet::new(),
            is_move_in_flight: false,
            is_ai_thinking: false,
            phase: TurnPhase::Idle,
        }
    }
}

impl TurnState {
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Moves to `next`, keeping the in-flight flag in step with the phase.
    ///
    /// An unexpected transition is logged and applied anyway so the game
    /// keeps running.
    pub(crate) fn transition_to(&mut self, next: TurnPhase) {
        if !self.phase.allows(next) {
            error!(
                "[TURN] Unexpected turn phase transition: {:?} -> {:?}",
                self.phase, next
            );
        }
        self.phase = next;
        self.is_move_in_flight = next == TurnPhase::MoveInFlight;
        if next != TurnPhase::Selected {
            self.selected = None;
            self.legal_targets.clear();
        }
    }

    pub(crate) fn select(&mut self, square: BoardPosition, targets: BTreeSet<BoardPosition>) {
        self.transition_to(TurnPhase::Selected);
        self.selected = Some(square);
        self.legal_targets = targets;
    }

    /// Back to a fresh Idle state for `faction`, from any phase.
    pub(crate) fn restart(&mut self, faction: Faction) {
        *self = TurnState {
            active_faction: faction,
            ..TurnState::default()
        };
    }
}
