//! Notifications the orchestrator emits, and listener dispatch
//!
//! Events are fire-and-forget. The orchestrator hands each one to every
//! registered listener and appends it to an outbox that the Bevy plugin
//! forwards as a message. A listener that errors or panics is logged and
//! skipped; it never stops the pipeline or the remaining listeners.

use crate::board::{BoardPosition, Faction, PieceArchetype};
use crate::oracle::MoveResult;
use bevy::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Faction),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

/// Everything UI/HUD collaborators can observe
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    TurnChanged(Faction),
    PieceSelected(BoardPosition),
    PieceDeselected,
    MoveCommitted(MoveResult),
    CaptureOccurred {
        archetype: PieceArchetype,
        by: Faction,
    },
    /// `faction` is the side now in check
    CheckDeclared(Faction),
    GameOver {
        outcome: Outcome,
        reason: GameOverReason,
    },
}

type Listener = Box<dyn FnMut(&GameEvent) -> anyhow::Result<()> + Send + Sync>;

/// Listener registry plus an outbox of emitted events
#[derive(Default)]
pub struct EventHub {
    listeners: Vec<(String, Listener)>,
    outbox: Vec<GameEvent>,
}

impl EventHub {
    /// Registers a named listener, called synchronously for every event.
    pub fn subscribe<F>(&mut self, name: impl Into<String>, listener: F)
    where
        F: FnMut(&GameEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.push((name.into(), Box::new(listener)));
    }

    pub fn emit(&mut self, event: GameEvent) {
        debug!("[TURN] Event {:?}", event);
        for (name, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("[TURN] Listener '{}' failed: {:#}", name, e),
                Err(_) => error!("[TURN] Listener '{}' panicked - continuing", name),
            }
        }
        self.outbox.push(event);
    }

    /// Takes every event emitted since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.outbox
    }
}
