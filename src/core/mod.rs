//! Application infrastructure: errors, settings and logging

pub mod error;
pub mod logging;
pub mod settings;

pub use logging::init_headless_logging;
pub use settings::{ArenaSettings, Cli};
