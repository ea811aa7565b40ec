//! Borrow bundle handed to sequences each frame, and an owned table for
//! headless play
//!
//! The orchestrator and the battle sequencer never own the registry, pool,
//! camera or animator. They receive a [`Scene`] that borrows all four for
//! the duration of one call.
//!
//! [`Tabletop`] owns one of everything and drives frames in the same order
//! the Bevy schedule does, which is what tests and tools use.

use crate::ai::MoveSearch;
use crate::animation::{AnimationClock, ModelAnimator};
use crate::board::BoardPosition;
use crate::camera::CameraRig;
use crate::effects::ParticlePool;
use crate::oracle::MoveOracle;
use crate::orchestrator::{GameEvent, TurnOrchestrator};
use crate::registry::PieceRegistry;

/// Mutable access to every visual subsystem for one call
pub struct Scene<'a> {
    pub registry: &'a mut PieceRegistry,
    pub pool: &'a mut ParticlePool,
    pub camera: &'a mut CameraRig,
    pub animator: &'a mut ModelAnimator,
}

impl Scene<'_> {
    /// Frame-driven updates that run whether or not a sequence is in flight:
    /// camera, then particles, then clips.
    pub fn advance_effects(&mut self, dt: f32) {
        self.camera.update(dt);
        self.pool.update(dt);
        self.animator.update();
    }
}

/// One complete game table, owned in one place
pub struct Tabletop {
    pub registry: PieceRegistry,
    pub pool: ParticlePool,
    pub camera: CameraRig,
    pub animator: ModelAnimator,
    pub orchestrator: TurnOrchestrator,
}

impl Tabletop {
    /// Builds a table around `oracle` and sets up the starting board.
    pub fn new(
        oracle: Box<dyn MoveOracle>,
        clock: Box<dyn AnimationClock>,
        pool: ParticlePool,
        seed: Option<u64>,
    ) -> Self {
        let mut table = Self {
            registry: PieceRegistry::default(),
            pool,
            camera: CameraRig::default(),
            animator: ModelAnimator::new(clock),
            orchestrator: TurnOrchestrator::new(oracle, seed),
        };
        table.reset();
        table
    }

    /// Hands the given faction's moves to `search`.
    pub fn with_ai(mut self, faction: crate::board::Faction, search: Box<dyn MoveSearch>) -> Self {
        self.orchestrator.set_ai(Some(faction), Some(search));
        self
    }

    /// Splits the table into the orchestrator and a scene over the rest.
    pub fn split(&mut self) -> (&mut TurnOrchestrator, Scene<'_>) {
        (
            &mut self.orchestrator,
            Scene {
                registry: &mut self.registry,
                pool: &mut self.pool,
                camera: &mut self.camera,
                animator: &mut self.animator,
            },
        )
    }

    /// Runs one frame of `dt` seconds.
    pub fn frame(&mut self, dt: f32) {
        let (orchestrator, mut scene) = self.split();
        scene.advance_effects(dt);
        orchestrator.update(dt, &mut scene);
    }

    pub fn click(&mut self, square: BoardPosition) {
        let (orchestrator, mut scene) = self.split();
        orchestrator.handle_click(square, &mut scene);
    }

    pub fn reset(&mut self) {
        let (orchestrator, mut scene) = self.split();
        orchestrator.reset(&mut scene);
    }

    /// Events emitted since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.orchestrator.events_mut().drain()
    }
}
