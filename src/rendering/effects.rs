use crate::battle::BattlePalette;
use crate::effects::ParticlePool;
use crate::orchestrator::TurnOrchestrator;
use bevy::prelude::*;

/// Entity drawing one pool slot
#[derive(Component, Debug, Clone, Copy)]
pub struct ParticleSlot(pub usize);

#[derive(Component, Debug)]
pub struct SlotMaterial(pub Handle<StandardMaterial>);

/// The glowing orb a caster's spell travels as
#[derive(Component, Debug)]
pub struct ProjectileMarker;

const PARTICLE_RADIUS: f32 = 0.05;
const PROJECTILE_RADIUS: f32 = 0.12;

/// One hidden entity per pool slot, reused for the whole session
pub(crate) fn spawn_particle_visuals(
    mut commands: Commands,
    pool: Res<ParticlePool>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Sphere::new(PARTICLE_RADIUS));
    for slot in 0..pool.capacity() {
        let material = materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            alpha_mode: AlphaMode::Blend,
            ..default()
        });
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            SlotMaterial(material),
            Transform::default(),
            Visibility::Hidden,
            ParticleSlot(slot),
        ));
    }

    let glow = BattlePalette::for_attacker(
        crate::board::PieceArchetype::Caster,
        crate::board::Faction::Light,
    )
    .charge;
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(PROJECTILE_RADIUS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: glow,
            emissive: glow.to_linear() * 4.0,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        ProjectileMarker,
    ));
    debug!("[PARTICLES] Spawned {} slot entities", pool.capacity());
}

pub(crate) fn sync_particles(
    pool: Res<ParticlePool>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut slots: Query<(&ParticleSlot, &SlotMaterial, &mut Transform, &mut Visibility)>,
) {
    let particles = pool.slots();
    for (ParticleSlot(index), SlotMaterial(handle), mut transform, mut visibility) in slots.iter_mut() {
        let Some(particle) = particles.get(*index).filter(|p| p.active) else {
            visibility.set_if_neq(Visibility::Hidden);
            continue;
        };
        visibility.set_if_neq(Visibility::Visible);
        transform.translation = particle.position;
        transform.scale = Vec3::splat(particle.scale());
        if let Some(material) = materials.get_mut(handle) {
            material.base_color = particle.color.with_alpha(particle.opacity());
        }
    }
}

pub(crate) fn sync_projectile(
    orchestrator: Res<TurnOrchestrator>,
    mut marker: Query<(&mut Transform, &mut Visibility), With<ProjectileMarker>>,
) {
    let Ok((mut transform, mut visibility)) = marker.single_mut() else {
        return;
    };
    match orchestrator.battle().projectile() {
        Some(position) => {
            transform.translation = position;
            visibility.set_if_neq(Visibility::Visible);
        }
        None => {
            visibility.set_if_neq(Visibility::Hidden);
        }
    }
}
