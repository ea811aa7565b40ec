//! Shared fixtures for the integration tests
#![allow(dead_code)]

use battlechess::ai::{AiDifficulty, AiMove, AiReply, AiRequest, MoveSearch};
use battlechess::animation::ManualClock;
use battlechess::board::{BoardPosition, Faction, PieceArchetype, Placement};
use battlechess::core::error::{AiError, OracleError, OracleResult};
use battlechess::core::init_headless_logging;
use battlechess::effects::ParticlePool;
use battlechess::oracle::{MoveOracle, MoveResult};
use battlechess::orchestrator::{GameEvent, TurnPhase};
use battlechess::Tabletop;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Fixed frame step used by every test
pub const FRAME: f32 = 1.0 / 60.0;

pub fn sq(name: &str) -> BoardPosition {
    BoardPosition::from_algebraic(name).unwrap()
}

pub fn place(name: &str, archetype: PieceArchetype, faction: Faction) -> Placement {
    Placement {
        position: sq(name),
        archetype,
        faction,
    }
}

/// Oracle that accepts exactly the moves it was scripted with
pub struct ScriptedOracle {
    layout: Vec<Placement>,
    first: Faction,
    active: Faction,
    moves: HashMap<(BoardPosition, BoardPosition), MoveResult>,
    pub submitted: Arc<Mutex<Vec<(BoardPosition, BoardPosition)>>>,
}

impl ScriptedOracle {
    pub fn new(layout: Vec<Placement>, first: Faction) -> Self {
        Self {
            layout,
            first,
            active: first,
            moves: HashMap::new(),
            submitted: Arc::default(),
        }
    }

    pub fn with_move(mut self, result: MoveResult) -> Self {
        self.moves.insert((result.from, result.to), result);
        self
    }
}

impl MoveOracle for ScriptedOracle {
    fn current_faction(&self) -> Faction {
        self.active
    }

    fn legal_destinations(&self, from: BoardPosition) -> BTreeSet<BoardPosition> {
        self.moves
            .values()
            .filter(|m| m.from == from && m.mover == self.active)
            .map(|m| m.to)
            .collect()
    }

    fn submit_move(
        &mut self,
        from: BoardPosition,
        to: BoardPosition,
        _promotion: Option<PieceArchetype>,
    ) -> OracleResult<MoveResult> {
        let result = self
            .moves
            .get(&(from, to))
            .filter(|m| m.mover == self.active)
            .cloned()
            .ok_or(OracleError::IllegalMove { from, to })?;
        self.submitted.lock().unwrap().push((from, to));
        self.active = self.active.opponent();
        Ok(result)
    }

    fn serialize_board(&self) -> String {
        format!("scripted {:?}", self.active)
    }

    fn reset(&mut self) {
        self.active = self.first;
    }

    fn layout(&self) -> Vec<Placement> {
        self.layout.clone()
    }
}

/// AI that answers from a queue of moves and counts its requests. Replies
/// are queued in request order.
#[derive(Clone, Default)]
pub struct QueuedSearch {
    pub moves: Arc<Mutex<VecDeque<AiMove>>>,
    pub requests: Arc<Mutex<Vec<AiRequest>>>,
    replies: Arc<Mutex<VecDeque<AiReply>>>,
    /// Keep the pending reply across `stop`, like an engine that answers late
    pub ignore_stop: bool,
}

impl QueuedSearch {
    pub fn new(moves: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let search = Self::default();
        search.moves.lock().unwrap().extend(moves.into_iter().map(|(from, to)| AiMove {
            from: sq(from),
            to: sq(to),
            promotion: None,
        }));
        search
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl MoveSearch for QueuedSearch {
    fn name(&self) -> &'static str {
        "queued"
    }

    fn request_best_move(&mut self, request: AiRequest) {
        let next = self.moves.lock().unwrap().pop_front();
        self.replies.lock().unwrap().push_back(AiReply {
            epoch: request.epoch,
            result: next.ok_or(AiError::NoLegalMove),
        });
        self.requests.lock().unwrap().push(request);
    }

    fn poll_reply(&mut self) -> Option<AiReply> {
        self.replies.lock().unwrap().pop_front()
    }

    fn stop(&mut self) {
        if !self.ignore_stop {
            self.replies.lock().unwrap().clear();
        }
    }

    fn set_difficulty(&mut self, _difficulty: AiDifficulty) {}
}

pub fn table(oracle: impl MoveOracle + 'static) -> Tabletop {
    init_headless_logging("warn");
    Tabletop::new(
        Box::new(oracle),
        Box::new(ManualClock::new()),
        ParticlePool::new(200, Some(7)),
        Some(7),
    )
}

/// Runs frames until the current move has played out. Panics if it never
/// does.
pub fn play_out(table: &mut Tabletop) {
    for _ in 0..(60 * 30) {
        table.frame(FRAME);
        let state = table.orchestrator.state();
        if !state.is_move_in_flight && !state.is_ai_thinking {
            return;
        }
    }
    panic!(
        "move never finished; stuck in {:?}",
        table.orchestrator.phase()
    );
}

pub fn count<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], pred: F) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

pub fn assert_idle_for(table: &Tabletop, faction: Faction) {
    let state = table.orchestrator.state();
    assert_eq!(table.orchestrator.phase(), TurnPhase::Idle);
    assert_eq!(state.active_faction, faction);
    assert!(!state.is_move_in_flight);
}
