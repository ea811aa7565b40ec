use crate::camera::{CameraRig, Viewpoint};
use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;

/// Marks the camera driven by [`CameraRig`]
#[derive(Component, Debug)]
pub struct ArenaCamera;

/// Orbit speed for right-drag, radians per pixel
const RADIANS_PER_DOT: f32 = 0.005;
const MIN_ORBIT_HEIGHT: f32 = 1.5;

pub(crate) fn spawn_camera(mut commands: Commands, rig: Res<CameraRig>) {
    commands.spawn((Camera3d::default(), rig.current().transform(), ArenaCamera));
}

pub(crate) fn sync_camera(rig: Res<CameraRig>, mut cameras: Query<&mut Transform, With<ArenaCamera>>) {
    if !rig.is_changed() {
        return;
    }
    for mut transform in cameras.iter_mut() {
        *transform = rig.current().transform();
    }
}

/// Right-drag orbits the view around its target. The rig refuses the new
/// view while a battle owns the camera.
pub(crate) fn orbit_camera(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut rig: ResMut<CameraRig>,
) {
    if !mouse_button.pressed(MouseButton::Right) || mouse_motion.delta == Vec2::ZERO {
        return;
    }
    if !rig.controls_enabled() {
        return;
    }

    let current = rig.current();
    let arm = current.position - current.target;
    let yaw = Quat::from_rotation_y(-mouse_motion.delta.x * RADIANS_PER_DOT);
    let right = arm.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
    let pitch = Quat::from_axis_angle(right, -mouse_motion.delta.y * RADIANS_PER_DOT);

    let mut orbited = yaw * pitch * arm;
    if orbited.y < MIN_ORBIT_HEIGHT {
        orbited = yaw * arm;
    }
    rig.set_view(Viewpoint::new(current.target + orbited, current.target));
}
