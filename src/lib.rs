//! Turn and battle orchestration for capture-cutscene chess
//!
//! A [`orchestrator::TurnOrchestrator`] drives whole turns: it consults a
//! [`oracle::MoveOracle`] for legality, plays accepted moves through a
//! pipeline of animated steps, hands captures to the
//! [`battle::BattleSequencer`], and asks an [`ai::MoveSearch`] for the AI's
//! moves. The visual subsystems it drives ([`registry`], [`effects`],
//! [`camera`], [`animation`]) are plain state that the Bevy [`rendering`]
//! layer mirrors onto entities.
//!
//! [`scene::Tabletop`] runs the same frame loop without Bevy's schedule,
//! which is how the integration tests play whole games.

pub mod ai;
pub mod animation;
pub mod battle;
pub mod board;
pub mod camera;
pub mod core;
pub mod effects;
pub mod oracle;
pub mod orchestrator;
pub mod plugin;
pub mod registry;
pub mod rendering;
pub mod scene;
pub mod tween;

pub use plugin::{ArenaPlugin, ArenaSystems, ResetRequested, SquareClicked};
pub use rendering::ArenaRenderPlugin;
pub use scene::{Scene, Tabletop};
