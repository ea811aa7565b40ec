//! Turn orchestration
//!
//! [`TurnOrchestrator`] owns the turn state and is the only thing that
//! changes it. It turns clicks and AI replies into oracle submissions,
//! plays accepted moves through the pipeline in [`pipeline`], and emits
//! [`GameEvent`]s in a fixed order once each move has finished playing:
//!
//! ```text
//! CaptureOccurred* -> MoveCommitted -> (GameOver | CheckDeclared? -> TurnChanged)
//! ```
//!
//! A reset requested while a move is in flight waits until that move
//! concludes. Every reset bumps the epoch, and AI replies carrying an older
//! epoch are dropped.

pub mod events;
pub mod pipeline;
pub mod state;

pub use events::{EventHub, GameEvent, GameOverReason, Outcome};
pub use pipeline::MoveStep;
pub use state::{TurnPhase, TurnState};

use crate::ai::{AiDifficulty, AiRequest, MoveSearch, RandomMoveSearch};
use crate::battle::BattleSequencer;
use crate::board::{BoardPosition, Faction, PieceArchetype};
use crate::oracle::MoveOracle;
use crate::scene::Scene;
use bevy::prelude::*;
use pipeline::InFlight;

/// Rejected AI moves tolerated per turn before the seat switches to random
/// play
pub const MAX_AI_ATTEMPTS: u8 = 3;

struct AiSeat {
    faction: Faction,
    search: Box<dyn MoveSearch>,
    /// Set once the seated search has been replaced by random play
    on_fallback: bool,
}

/// Central coordinator for turns, moves and battles
#[derive(Resource)]
pub struct TurnOrchestrator {
    oracle: Box<dyn MoveOracle>,
    battle: BattleSequencer,
    state: TurnState,
    events: EventHub,
    in_flight: Option<InFlight>,
    ai: Option<AiSeat>,
    ai_attempts: u8,
    epoch: u64,
    reset_pending: bool,
    promotion_choice: PieceArchetype,
    moves_played: u64,
    seed: Option<u64>,
}

impl TurnOrchestrator {
    pub fn new(oracle: Box<dyn MoveOracle>, seed: Option<u64>) -> Self {
        let active = oracle.current_faction();
        Self {
            oracle,
            battle: BattleSequencer::new(seed),
            state: TurnState {
                active_faction: active,
                ..TurnState::default()
            },
            events: EventHub::default(),
            in_flight: None,
            ai: None,
            ai_attempts: 0,
            epoch: 0,
            reset_pending: false,
            promotion_choice: PieceArchetype::Caster,
            moves_played: 0,
            seed,
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.phase()
    }

    pub fn oracle(&self) -> &dyn MoveOracle {
        self.oracle.as_ref()
    }

    pub fn battle(&self) -> &BattleSequencer {
        &self.battle
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventHub {
        &mut self.events
    }

    /// Registers a listener for every [`GameEvent`].
    pub fn subscribe<F>(&mut self, name: impl Into<String>, listener: F)
    where
        F: FnMut(&GameEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe(name, listener);
    }

    /// Bumped on every reset
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn moves_played(&self) -> u64 {
        self.moves_played
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Pipeline step currently playing, if a move is in flight
    pub fn current_step(&self) -> Option<MoveStep> {
        self.in_flight.as_ref().and_then(InFlight::current_step)
    }

    pub fn promotion_choice(&self) -> PieceArchetype {
        self.promotion_choice
    }

    /// Archetype a human promotion turns into
    pub fn set_promotion_choice(&mut self, archetype: PieceArchetype) {
        self.promotion_choice = archetype;
    }

    /// Seats `search` as the player for `faction`. `None` for either makes
    /// both sides human. Takes effect on the next turn change or reset.
    pub fn set_ai(&mut self, faction: Option<Faction>, search: Option<Box<dyn MoveSearch>>) {
        if let Some(mut old) = self.ai.take() {
            old.search.stop();
            self.state.is_ai_thinking = false;
        }
        self.ai = match (faction, search) {
            (Some(faction), Some(search)) => {
                info!("[AI] {} plays {}", search.name(), faction);
                Some(AiSeat {
                    faction,
                    search,
                    on_fallback: false,
                })
            }
            _ => None,
        };
    }

    pub fn ai_faction(&self) -> Option<Faction> {
        self.ai.as_ref().map(|seat| seat.faction)
    }

    /// Name of the search currently playing the AI side
    pub fn ai_name(&self) -> Option<&'static str> {
        self.ai.as_ref().map(|seat| seat.search.name())
    }

    pub fn set_ai_difficulty(&mut self, difficulty: AiDifficulty) {
        if let Some(seat) = self.ai.as_mut() {
            seat.search.set_difficulty(difficulty);
        }
    }

    fn is_ai_turn(&self) -> bool {
        self.ai_faction() == Some(self.state.active_faction)
    }

    /// Handles a click on `square` from the human player.
    pub fn handle_click(&mut self, square: BoardPosition, scene: &mut Scene) {
        let phase = self.state.phase();
        if !phase.accepts_input() {
            debug!("[TURN] Click on {} ignored during {:?}", square, phase);
            return;
        }
        if self.is_ai_turn() {
            debug!("[TURN] Click on {} ignored: AI to move", square);
            return;
        }

        let owns_piece = scene
            .registry
            .get(square)
            .is_some_and(|p| p.faction == self.state.active_faction);

        match (phase, self.state.selected) {
            (TurnPhase::Selected, Some(from)) if self.state.legal_targets.contains(&square) => {
                let promotion = Some(self.promotion_choice);
                self.begin_move(from, square, promotion, scene);
            }
            (_, _) if owns_piece => self.select(square),
            (TurnPhase::Selected, _) => {
                self.state.transition_to(TurnPhase::Idle);
                self.events.emit(GameEvent::PieceDeselected);
            }
            _ => {}
        }
    }

    fn select(&mut self, square: BoardPosition) {
        let targets = self.oracle.legal_destinations(square);
        debug!("[TURN] Selected {} with {} targets", square, targets.len());
        self.state.select(square, targets);
        self.events.emit(GameEvent::PieceSelected(square));
    }

    /// Submits a move to the oracle and, when accepted, starts playing it.
    fn begin_move(
        &mut self,
        from: BoardPosition,
        to: BoardPosition,
        promotion: Option<PieceArchetype>,
        scene: &mut Scene,
    ) -> bool {
        match self.oracle.submit_move(from, to, promotion) {
            Ok(result) => {
                info!("[TURN] {} plays {} -> {}", result.mover, from, to);
                self.state.transition_to(TurnPhase::MoveInFlight);
                self.in_flight = Some(InFlight::new(result, scene.registry));
                self.advance_pipeline(0.0, scene);
                true
            }
            Err(e) => {
                warn!("[TURN] Move {} -> {} rejected: {}", from, to, e);
                if self.state.phase() == TurnPhase::Selected {
                    self.state.transition_to(TurnPhase::Idle);
                    self.events.emit(GameEvent::PieceDeselected);
                }
                false
            }
        }
    }

    /// Per-frame step: battle first, then AI replies, then the move pipeline.
    ///
    /// While the pipeline waits on a battle it only gets the time the battle
    /// left unused, so the step after the battle does not replay the frame.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        let unused = self.battle.update(dt, scene);
        self.poll_ai(scene);
        let budget = match self.current_step() {
            Some(MoveStep::Battle { .. }) => unused,
            _ => dt,
        };
        self.advance_pipeline(budget, scene);
    }

    fn poll_ai(&mut self, scene: &mut Scene) {
        if !self.state.is_ai_thinking {
            return;
        }
        let Some(reply) = self.ai.as_mut().and_then(|seat| seat.search.poll_reply()) else {
            return;
        };
        if reply.epoch != self.epoch {
            debug!(
                "[AI] Dropping reply from epoch {} (now {})",
                reply.epoch, self.epoch
            );
            return;
        }
        self.state.is_ai_thinking = false;

        match reply.result {
            Ok(choice) => {
                debug!("[AI] Chose {} -> {}", choice.from, choice.to);
                if self.begin_move(choice.from, choice.to, choice.promotion, scene) {
                    self.ai_attempts = 0;
                } else {
                    self.retry_ai();
                }
            }
            Err(e) => {
                warn!("[AI] Search failed: {}", e);
                self.retry_ai();
            }
        }
    }

    fn retry_ai(&mut self) {
        self.ai_attempts += 1;
        if self.ai_attempts < MAX_AI_ATTEMPTS {
            self.request_ai_move_if_due();
            return;
        }
        let seed = self.seed;
        let Some(seat) = self.ai.as_mut().filter(|seat| !seat.on_fallback) else {
            error!(
                "[AI] Random play failed too; {} is stuck until reset",
                self.state.active_faction
            );
            return;
        };
        warn!(
            "[AI] {} failed {} times; switching to random moves",
            seat.search.name(),
            self.ai_attempts
        );
        seat.search.stop();
        seat.search = Box::new(RandomMoveSearch::new(seed));
        seat.on_fallback = true;
        self.ai_attempts = 0;
        self.request_ai_move_if_due();
    }

    /// Asks the seated AI for a move when it is its turn and nothing is
    /// playing.
    pub(crate) fn request_ai_move_if_due(&mut self) {
        if self.state.phase() != TurnPhase::Idle || self.state.is_ai_thinking {
            return;
        }
        let active = self.state.active_faction;
        let Some(seat) = self.ai.as_mut().filter(|seat| seat.faction == active) else {
            self.ai_attempts = 0;
            return;
        };
        info!("[AI] {} thinking for {}", seat.search.name(), active);
        seat.search.request_best_move(AiRequest {
            epoch: self.epoch,
            board: self.oracle.serialize_board(),
        });
        self.state.is_ai_thinking = true;
    }

    /// Starts a new game. Deferred while a move is in flight.
    pub fn reset(&mut self, scene: &mut Scene) {
        if self.in_flight.is_some() {
            info!("[TURN] Reset requested mid-move; deferring until it concludes");
            self.reset_pending = true;
            return;
        }
        self.reset_now(scene);
    }

    pub(crate) fn reset_now(&mut self, scene: &mut Scene) {
        if let Some(seat) = self.ai.as_mut() {
            seat.search.stop();
        }
        self.epoch += 1;
        self.ai_attempts = 0;
        self.moves_played = 0;
        self.oracle.reset();
        scene.registry.populate(&self.oracle.layout(), scene.animator);

        let active = self.oracle.current_faction();
        self.state.restart(active);
        info!("[TURN] New game (epoch {}), {} to move", self.epoch, active);
        self.events.emit(GameEvent::TurnChanged(active));
        self.request_ai_move_if_due();
    }
}
