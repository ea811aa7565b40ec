use crate::board::BoardPosition;
use crate::orchestrator::TurnOrchestrator;
use crate::plugin::SquareClicked;
use bevy::picking::pointer::PointerInteraction;
use bevy::prelude::*;

/// A clickable board square
#[derive(Component, Debug, Clone, Copy)]
pub struct BoardSquare(pub BoardPosition);

/// Square materials, swapped to show the selection and its targets
#[derive(Resource, Clone)]
pub struct SquarePalette {
    pub light: Handle<StandardMaterial>,
    pub dark: Handle<StandardMaterial>,
    pub selected: Handle<StandardMaterial>,
    pub target: Handle<StandardMaterial>,
}

impl SquarePalette {
    fn base(&self, square: BoardPosition) -> Handle<StandardMaterial> {
        if (square.file() + square.rank()) % 2 == 0 {
            self.dark.clone()
        } else {
            self.light.clone()
        }
    }
}

fn flat(materials: &mut Assets<StandardMaterial>, color: Color) -> Handle<StandardMaterial> {
    materials.add(StandardMaterial {
        base_color: color,
        perceptual_roughness: 0.9,
        ..default()
    })
}

pub(crate) fn spawn_board(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let palette = SquarePalette {
        light: flat(&mut materials, Color::srgb(0.85, 0.82, 0.74)),
        dark: flat(&mut materials, Color::srgb(0.28, 0.24, 0.22)),
        selected: flat(&mut materials, Color::srgb(0.9, 0.75, 0.25)),
        target: flat(&mut materials, Color::srgb(0.35, 0.65, 0.45)),
    };
    let mesh = meshes.add(Plane3d::default().mesh().size(1.0, 1.0));

    for square in BoardPosition::all() {
        commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(palette.base(square)),
                Transform::from_translation(square.to_world()),
                PointerInteraction::default(),
                BoardSquare(square),
                Name::new(format!("Square {square}")),
            ))
            .observe(on_square_click);
    }

    commands.spawn((
        PointLight {
            shadows_enabled: true,
            intensity: 2_000_000.0,
            range: 40.0,
            ..default()
        },
        Transform::from_xyz(3.5, 8.0, 3.5),
    ));
    commands.insert_resource(palette);
}

fn on_square_click(
    click: On<Pointer<Click>>,
    squares: Query<&BoardSquare>,
    mut writer: MessageWriter<SquareClicked>,
) {
    if !matches!(click.event.button, PointerButton::Primary) {
        return;
    }
    let Ok(BoardSquare(square)) = squares.get(click.entity) else {
        return;
    };
    debug!("[INPUT] Clicked square {}", square);
    writer.write(SquareClicked(*square));
}

/// Paints the selected square and its legal targets.
pub(crate) fn highlight_squares(
    orchestrator: Res<TurnOrchestrator>,
    palette: Res<SquarePalette>,
    mut squares: Query<(&BoardSquare, &mut MeshMaterial3d<StandardMaterial>)>,
) {
    if !orchestrator.is_changed() {
        return;
    }
    let state = orchestrator.state();
    for (BoardSquare(square), mut material) in squares.iter_mut() {
        let wanted = if state.selected == Some(*square) {
            palette.selected.clone()
        } else if state.legal_targets.contains(square) {
            palette.target.clone()
        } else {
            palette.base(*square)
        };
        if material.0 != wanted {
            material.0 = wanted;
        }
    }
}
