use battlechess::core::{ArenaSettings, Cli};
use battlechess::{ArenaPlugin, ArenaRenderPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;
use clap::Parser;

const WINDOW_WIDTH: u32 = 1366;
const WINDOW_HEIGHT: u32 = 768;

fn main() {
    let cli = Cli::parse();
    let settings_path = cli.settings_path();

    let mut settings = ArenaSettings::load_or_default(&settings_path);
    settings.apply_cli(&cli);

    let window = Window {
        title: "Battle Chess".to_string(),
        resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
        ..default()
    };

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(window),
                ..default()
            })
            .set(LogPlugin {
                filter: settings.log_filter.clone(),
                ..default()
            }),
    );

    // Logging is up once LogPlugin is built.
    if cli.save_settings {
        settings.save_or_warn(&settings_path);
    }

    app.add_plugins(ArenaPlugin { settings })
        .add_plugins(ArenaRenderPlugin)
        .run();
}
