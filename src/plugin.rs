//! Bevy wiring for the arena
//!
//! [`ArenaPlugin`] inserts the orchestrator and the four visual subsystems as
//! resources and runs them in a fixed order every frame:
//!
//! ```text
//! Input       SquareClicked / ResetRequested -> orchestrator
//! Orchestrate camera -> particles -> clips -> battle -> AI -> move pipeline
//! Publish     orchestrator outbox -> GameEvent messages
//! ```
//!
//! Rendering is a separate plugin so the arena runs headless under
//! `MinimalPlugins`.

use crate::ai::ResilientSearch;
use crate::animation::{ModelAnimator, SystemClock};
use crate::board::BoardPosition;
use crate::camera::CameraRig;
use crate::core::ArenaSettings;
use crate::effects::ParticlePool;
use crate::oracle::ChessOracle;
use crate::orchestrator::{GameEvent, TurnOrchestrator};
use crate::registry::{AssetDirLibrary, ModelLibrary, PieceRegistry, PrimitiveLibrary};
use crate::scene::Scene;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::path::Path;

/// A board square was clicked
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareClicked(pub BoardPosition);

/// Start a new game; deferred while a move is playing
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ResetRequested;

/// Frame order for arena systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum ArenaSystems {
    /// Clicks and reset requests reach the orchestrator
    Input,
    /// Effects, battles and move pipeline advance by one frame
    Orchestrate,
    /// Emitted events become messages
    Publish,
    /// Scene state is copied onto render entities
    Visual,
}

/// Mutable access to the visual subsystems from a system
#[derive(SystemParam)]
pub struct SceneParams<'w> {
    pub registry: ResMut<'w, PieceRegistry>,
    pub pool: ResMut<'w, ParticlePool>,
    pub camera: ResMut<'w, CameraRig>,
    pub animator: ResMut<'w, ModelAnimator>,
}

impl SceneParams<'_> {
    pub fn scene(&mut self) -> Scene<'_> {
        Scene {
            registry: &mut *self.registry,
            pool: &mut *self.pool,
            camera: &mut *self.camera,
            animator: &mut *self.animator,
        }
    }
}

/// Gameplay half of the app: orchestration without any rendering
#[derive(Default)]
pub struct ArenaPlugin {
    pub settings: ArenaSettings,
}

/// Models under `assets/models` when present, primitives otherwise
fn model_library() -> Box<dyn ModelLibrary> {
    let root = Path::new("assets");
    if root.join("models").is_dir() {
        info!("[REGISTRY] Loading models from {:?}", root);
        Box::new(AssetDirLibrary::new(root))
    } else {
        Box::new(PrimitiveLibrary)
    }
}

impl Plugin for ArenaPlugin {
    fn build(&self, app: &mut App) {
        let settings = self.settings.clone();
        let seed = settings.rng_seed;

        let mut orchestrator = TurnOrchestrator::new(Box::new(ChessOracle::new()), seed);
        orchestrator.set_promotion_choice(settings.promotion_choice);
        if let Some(faction) = settings.ai_faction {
            let search = ResilientSearch::from_engine_path(
                settings.engine_path.as_deref(),
                settings.difficulty,
                seed,
            );
            orchestrator.set_ai(Some(faction), Some(Box::new(search)));
        }

        app.insert_resource(PieceRegistry::new(model_library()))
            .insert_resource(ParticlePool::new(settings.particle_capacity, seed))
            .insert_resource(CameraRig::default())
            .insert_resource(ModelAnimator::new(Box::new(SystemClock::default())))
            .insert_resource(orchestrator)
            .insert_resource(settings)
            .add_message::<SquareClicked>()
            .add_message::<ResetRequested>()
            .add_message::<GameEvent>();

        app.configure_sets(
            Update,
            (
                ArenaSystems::Input,
                ArenaSystems::Orchestrate,
                ArenaSystems::Publish,
                ArenaSystems::Visual,
            )
                .chain(),
        );

        app.add_systems(Startup, start_game).add_systems(
            Update,
            (
                route_input.in_set(ArenaSystems::Input),
                advance_frame.in_set(ArenaSystems::Orchestrate),
                publish_events.in_set(ArenaSystems::Publish),
            ),
        );
    }
}

fn start_game(mut orchestrator: ResMut<TurnOrchestrator>, mut params: SceneParams) {
    orchestrator.reset(&mut params.scene());
}

fn route_input(
    mut clicks: MessageReader<SquareClicked>,
    mut resets: MessageReader<ResetRequested>,
    mut orchestrator: ResMut<TurnOrchestrator>,
    mut params: SceneParams,
) {
    let mut scene = params.scene();
    for SquareClicked(square) in clicks.read() {
        orchestrator.handle_click(*square, &mut scene);
    }
    if resets.read().count() > 0 {
        orchestrator.reset(&mut scene);
    }
}

fn advance_frame(
    time: Res<Time>,
    mut orchestrator: ResMut<TurnOrchestrator>,
    mut params: SceneParams,
) {
    let dt = time.delta_secs();
    let mut scene = params.scene();
    scene.advance_effects(dt);
    orchestrator.update(dt, &mut scene);
}

fn publish_events(mut orchestrator: ResMut<TurnOrchestrator>, mut writer: MessageWriter<GameEvent>) {
    for event in orchestrator.events_mut().drain() {
        writer.write(event);
    }
}
