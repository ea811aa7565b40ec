//! 3D presentation of the arena
//!
//! Nothing here owns game state. Each system copies one subsystem's state
//! onto entities in [`ArenaSystems::Visual`]:
//!
//! - `board` - 64 pickable squares that turn clicks into [`SquareClicked`]
//! - `pieces` - one entity per registry piece, transform and fade synced
//! - `effects` - a fixed entity per particle slot plus the projectile marker
//! - `camera` - the camera follows [`CameraRig`]; right-drag orbits when allowed
//!
//! [`SquareClicked`]: crate::plugin::SquareClicked
//! [`CameraRig`]: crate::camera::CameraRig

pub mod board;
pub mod camera;
pub mod effects;
pub mod pieces;

use crate::plugin::{ArenaSystems, ResetRequested};
use bevy::prelude::*;

/// Window-side half of the app. Requires [`crate::plugin::ArenaPlugin`].
pub struct ArenaRenderPlugin;

impl Plugin for ArenaRenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MeshPickingPlugin)
            .add_systems(
                Startup,
                (
                    board::spawn_board,
                    camera::spawn_camera,
                    effects::spawn_particle_visuals,
                ),
            )
            .add_systems(
                Update,
                (camera::orbit_camera, request_reset_on_key).in_set(ArenaSystems::Input),
            )
            .add_systems(
                Update,
                (
                    board::highlight_squares,
                    pieces::sync_pieces,
                    effects::sync_particles,
                    effects::sync_projectile,
                    camera::sync_camera,
                )
                    .in_set(ArenaSystems::Visual),
            );
    }
}

fn request_reset_on_key(keys: Res<ButtonInput<KeyCode>>, mut writer: MessageWriter<ResetRequested>) {
    if keys.just_pressed(KeyCode::KeyR) {
        info!("[TURN] Reset requested from keyboard");
        writer.write(ResetRequested);
    }
}
