//! Arena settings and their persistence
//!
//! [`ArenaSettings`] is stored as pretty JSON in `settings.json` under the
//! platform configuration directory, falling back to the working directory
//! when none exists. Loading never fails the app: a missing or unreadable
//! file means defaults. Command-line flags are applied on top.

use crate::ai::AiDifficulty;
use crate::board::{Faction, PieceArchetype};
use crate::core::error::SettingsError;
use crate::effects::DEFAULT_CAPACITY;
use bevy::prelude::*;
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILENAME: &str = "settings.json";

/// Default log filter for both the windowed app and headless runs
pub const DEFAULT_LOG_FILTER: &str = "info,battlechess=debug,wgpu=error,naga=warn";

/// Which side the AI plays, as chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AiSide {
    Light,
    Dark,
    None,
}

impl AiSide {
    pub fn faction(self) -> Option<Faction> {
        match self {
            AiSide::Light => Some(Faction::Light),
            AiSide::Dark => Some(Faction::Dark),
            AiSide::None => None,
        }
    }
}

/// User-facing configuration for one arena session
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Side played by the AI; `None` for two human players
    pub ai_faction: Option<Faction>,
    pub difficulty: AiDifficulty,
    /// UCI engine binary. Without one the AI plays random legal moves.
    pub engine_path: Option<PathBuf>,
    pub particle_capacity: usize,
    /// Seed for particles, battles and random play; `None` seeds from the OS
    pub rng_seed: Option<u64>,
    /// Archetype a human promotion becomes
    pub promotion_choice: PieceArchetype,
    pub log_filter: String,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            ai_faction: Some(Faction::Dark),
            difficulty: AiDifficulty::Medium,
            engine_path: None,
            particle_capacity: DEFAULT_CAPACITY,
            rng_seed: None,
            promotion_choice: PieceArchetype::Caster,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Resolves the settings file path, e.g.
/// `~/.config/battlechess/settings.json` on Linux.
pub fn settings_path() -> PathBuf {
    match ProjectDirs::from("com", "battlechess", "BattleChess") {
        Some(dirs) => dirs.config_dir().join(SETTINGS_FILENAME),
        None => PathBuf::from(SETTINGS_FILENAME),
    }
}

impl ArenaSettings {
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads from `path`, falling back to defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("[SETTINGS] No settings file at {:?}. Using defaults.", path);
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(settings) => {
                info!("[SETTINGS] Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!(
                    "[SETTINGS] Failed to load settings from {:?}: {}. Using defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Saves to `path`, logging instead of failing. Returns whether the file
    /// was written.
    pub fn save_or_warn(&self, path: &Path) -> bool {
        match self.save_to(path) {
            Ok(()) => {
                info!("[SETTINGS] Saved settings to {:?}", path);
                true
            }
            Err(e) => {
                warn!("[SETTINGS] Failed to save settings to {:?}: {}", path, e);
                false
            }
        }
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(side) = cli.ai {
            self.ai_faction = side.faction();
        }
        if let Some(difficulty) = cli.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(engine) = &cli.engine {
            self.engine_path = Some(engine.clone());
        }
        if cli.seed.is_some() {
            self.rng_seed = cli.seed;
        }
        if let Some(capacity) = cli.particles {
            self.particle_capacity = capacity;
        }
        if let Some(filter) = &cli.log {
            self.log_filter = filter.clone();
        }
    }
}

/// Capture-cutscene chess on a 3D table
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about)]
pub struct Cli {
    /// Side played by the AI
    #[arg(long, value_enum)]
    pub ai: Option<AiSide>,

    #[arg(long, value_enum)]
    pub difficulty: Option<AiDifficulty>,

    /// Path to a UCI engine binary
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// Fixed RNG seed for reproducible effects and random play
    #[arg(long)]
    pub seed: Option<u64>,

    /// Particle pool capacity
    #[arg(long)]
    pub particles: Option<usize>,

    /// Log filter, e.g. "info,battlechess=trace"
    #[arg(long)]
    pub log: Option<String>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub save_settings: bool,

    /// Read and write settings at this path instead of the default location
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

impl Cli {
    /// Settings file in effect for this run
    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(settings_path)
    }
}
