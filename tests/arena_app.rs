//! The arena running inside a headless Bevy app

mod common;

use battlechess::board::Faction;
use battlechess::core::ArenaSettings;
use battlechess::orchestrator::{GameEvent, TurnOrchestrator, TurnPhase};
use battlechess::registry::PieceRegistry;
use battlechess::{ArenaPlugin, ArenaSystems, ResetRequested, SquareClicked};
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use common::sq;
use std::time::Duration;

#[derive(Resource, Default)]
struct Seen(Vec<GameEvent>);

fn record(mut reader: MessageReader<GameEvent>, mut seen: ResMut<Seen>) {
    seen.0.extend(reader.read().cloned());
}

fn app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(16)))
        .add_plugins(ArenaPlugin {
            settings: ArenaSettings {
                ai_faction: None,
                rng_seed: Some(5),
                ..default()
            },
        })
        .init_resource::<Seen>()
        .add_systems(Update, record.after(ArenaSystems::Publish));
    app.update();
    app
}

fn run(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

fn orchestrator(app: &App) -> &TurnOrchestrator {
    app.world().resource::<TurnOrchestrator>()
}

#[test]
fn test_startup_sets_the_table() {
    let app = app();
    assert_eq!(app.world().resource::<PieceRegistry>().len(), 32);
    assert_eq!(
        app.world().resource::<Seen>().0,
        vec![GameEvent::TurnChanged(Faction::Light)]
    );
    assert_eq!(orchestrator(&app).phase(), TurnPhase::Idle);
}

#[test]
fn test_clicks_play_a_move() {
    let mut app = app();
    app.world_mut().write_message(SquareClicked(sq("e2")));
    app.update();
    assert_eq!(orchestrator(&app).phase(), TurnPhase::Selected);

    app.world_mut().write_message(SquareClicked(sq("e4")));
    app.update();
    assert!(orchestrator(&app).state().is_move_in_flight);

    run(&mut app, 120);
    assert_eq!(orchestrator(&app).state().active_faction, Faction::Dark);
    assert!(app.world().resource::<PieceRegistry>().get(sq("e4")).is_some());

    let seen = &app.world().resource::<Seen>().0;
    assert!(seen.iter().any(|e| matches!(e, GameEvent::MoveCommitted(_))));
    assert_eq!(seen.last(), Some(&GameEvent::TurnChanged(Faction::Dark)));
}

#[test]
fn test_reset_message_mid_move_is_deferred() {
    let mut app = app();
    app.world_mut().write_message(SquareClicked(sq("g1")));
    app.update();
    app.world_mut().write_message(SquareClicked(sq("f3")));
    app.update();
    app.world_mut().write_message(ResetRequested);
    app.update();
    assert!(orchestrator(&app).is_reset_pending());

    run(&mut app, 120);
    assert!(!orchestrator(&app).is_reset_pending());
    assert_eq!(orchestrator(&app).epoch(), 2);
    let registry = app.world().resource::<PieceRegistry>();
    assert!(registry.get(sq("g1")).is_some());
    assert!(registry.get(sq("f3")).is_none());
}
