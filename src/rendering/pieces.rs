//! Piece entities mirroring the [`PieceRegistry`]
//!
//! Entities are spawned and despawned when the registry's revision changes.
//! Transforms and opacity are copied every frame since the move pipeline and
//! battles animate them continuously.

use crate::board::Faction;
use crate::plugin::SquareClicked;
use crate::registry::{PieceId, PieceRegistry, PrimitiveShape, RenderHandle, VisualPiece};
use bevy::prelude::*;
use std::collections::HashMap;

/// Links an entity to its registry piece
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct PieceVisual(pub PieceId);

/// Per-piece material, faded with the piece's opacity
#[derive(Component, Debug, Clone)]
pub struct PieceMaterial(pub Handle<StandardMaterial>);

fn faction_color(faction: Faction) -> Color {
    match faction {
        Faction::Light => Color::srgb(0.92, 0.88, 0.8),
        Faction::Dark => Color::srgb(0.18, 0.16, 0.2),
    }
}

fn primitive_mesh(shape: PrimitiveShape) -> Mesh {
    match shape {
        PrimitiveShape::Capsule { radius, length } => Capsule3d::new(radius, length).into(),
        PrimitiveShape::Cylinder { radius, height } => Cylinder::new(radius, height).into(),
        PrimitiveShape::Cone { radius, height } => Cone { radius, height }.into(),
        PrimitiveShape::Cuboid { size } => Cuboid::from_size(size).into(),
        PrimitiveShape::Sphere { radius } => Sphere::new(radius).into(),
    }
}

fn spawn_piece(
    commands: &mut Commands,
    piece: &VisualPiece,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    asset_server: &AssetServer,
) {
    let material = materials.add(StandardMaterial {
        base_color: faction_color(piece.faction),
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    let mut entity = commands.spawn((
        piece.transform,
        Visibility::Inherited,
        PieceVisual(piece.id),
        PieceMaterial(material.clone()),
        Name::new(format!("{} {} {}", piece.faction, piece.archetype, piece.position)),
    ));
    match &piece.render {
        RenderHandle::Primitive(shape) => {
            let mesh = meshes.add(primitive_mesh(*shape));
            let lift = Transform::from_xyz(0.0, shape.height() * 0.5, 0.0);
            entity.with_children(|parent| {
                parent.spawn((Mesh3d(mesh), MeshMaterial3d(material), lift));
            });
        }
        RenderHandle::Model { path } => {
            let relative = path.strip_prefix("assets").unwrap_or(path).to_path_buf();
            let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(relative));
            entity.with_children(|parent| {
                parent.spawn(SceneRoot(scene));
            });
        }
    }
    entity.observe(on_piece_click);
}

/// Clicking a piece clicks the square it stands on.
fn on_piece_click(
    click: On<Pointer<Click>>,
    pieces: Query<&PieceVisual>,
    registry: Res<PieceRegistry>,
    mut writer: MessageWriter<SquareClicked>,
) {
    if !matches!(click.event.button, PointerButton::Primary) {
        return;
    }
    let Ok(PieceVisual(id)) = pieces.get(click.entity) else {
        return;
    };
    if let Some(piece) = registry.find(*id) {
        writer.write(SquareClicked(piece.position));
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn sync_pieces(
    mut commands: Commands,
    registry: Res<PieceRegistry>,
    mut seen_revision: Local<Option<u64>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    mut visuals: Query<(Entity, &PieceVisual, &PieceMaterial, &mut Transform)>,
) {
    if *seen_revision != Some(registry.revision()) {
        *seen_revision = Some(registry.revision());

        let mut spawned: HashMap<PieceId, Entity> = HashMap::new();
        for (entity, PieceVisual(id), _, _) in visuals.iter() {
            if registry.find(*id).is_some() {
                spawned.insert(*id, entity);
            } else {
                commands.entity(entity).despawn();
            }
        }
        for piece in registry.iter().filter(|p| !spawned.contains_key(&p.id)) {
            spawn_piece(&mut commands, piece, &mut meshes, &mut materials, &asset_server);
        }
    }

    for (_, PieceVisual(id), PieceMaterial(handle), mut transform) in visuals.iter_mut() {
        let Some(piece) = registry.find(*id) else {
            continue;
        };
        if *transform != piece.transform {
            *transform = piece.transform;
        }
        if let Some(material) = materials.get_mut(handle) {
            let alpha = piece.opacity.clamp(0.0, 1.0);
            if (material.base_color.alpha() - alpha).abs() > f32::EPSILON {
                material.base_color.set_alpha(alpha);
            }
        }
    }
}
