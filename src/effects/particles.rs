//! Fixed-capacity particle pool
//!
//! All particles are allocated once when the pool is built. Spawning claims
//! the first inactive slot in pool order; when every slot is busy the request
//! is dropped without touching any live particle. Nothing is allocated or
//! freed during play, so effect bursts never cause memory churn.
//!
//! # Lifecycle
//!
//! ```text
//! construction: N slots, all inactive
//! spawn       : first inactive slot -> active, fully overwritten
//! update      : integrate, apply gravity, age; expired -> inactive
//! ```
//!
//! A slot's identity is its index. Expiry only clears the `active` flag; the
//! next spawn into that slot overwrites every field.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};

/// Pool size used when settings do not override it
pub const DEFAULT_CAPACITY: usize = 200;

/// Downward acceleration applied to every live particle (units/s²)
pub const GRAVITY: f32 = -6.0;

/// Constant upward kick added to burst velocities so they read as explosions
pub const BURST_UPWARD_BIAS: f32 = 1.5;

/// Smallest rendered scale, as a fraction of full size
pub const SCALE_FLOOR: f32 = 0.5;

/// Remaining life at or below this is treated as expired. Absorbs float drift
/// when a lifetime is consumed in many small steps.
const LIFE_EPSILON: f32 = 1e-4;

/// One pooled particle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Color,
    pub remaining_life: f32,
    pub total_life: f32,
    pub active: bool,
}

impl Particle {
    const DORMANT: Particle = Particle {
        position: Vec3::ZERO,
        velocity: Vec3::ZERO,
        color: Color::WHITE,
        remaining_life: 0.0,
        total_life: 0.0,
        active: false,
    };

    /// `remaining_life / total_life`, or 0 for inactive particles
    pub fn life_ratio(&self) -> f32 {
        if !self.active || self.total_life <= 0.0 {
            return 0.0;
        }
        (self.remaining_life / self.total_life).clamp(0.0, 1.0)
    }

    /// Linear fade driven by remaining life
    pub fn opacity(&self) -> f32 {
        self.life_ratio()
    }

    /// Shrinks with remaining life but never below [`SCALE_FLOOR`]
    pub fn scale(&self) -> f32 {
        self.life_ratio().max(SCALE_FLOOR)
    }
}

/// Shared particle slots for every effect in a match
#[derive(Resource, Debug)]
pub struct ParticlePool {
    slots: Vec<Particle>,
    rng: StdRng,
    dropped: u64,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl ParticlePool {
    /// Allocates `capacity` dormant slots. A seed makes burst directions
    /// reproducible.
    pub fn new(capacity: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            slots: vec![Particle::DORMANT; capacity],
            rng,
            dropped: 0,
        }
    }

    /// Activates the first free slot. Returns its index, or `None` when the
    /// pool is full or the lifetime is not positive.
    pub fn spawn(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        color: Color,
        lifetime_secs: f32,
    ) -> Option<usize> {
        if lifetime_secs <= LIFE_EPSILON {
            return None;
        }
        let Some(index) = self.slots.iter().position(|p| !p.active) else {
            self.dropped += 1;
            return None;
        };
        self.slots[index] = Particle {
            position,
            velocity,
            color,
            remaining_life: lifetime_secs,
            total_life: lifetime_secs,
            active: true,
        };
        Some(index)
    }

    /// Spawns `count` particles flying outward over a sphere with an upward
    /// bias. Returns how many actually found a slot.
    pub fn spawn_burst(
        &mut self,
        position: Vec3,
        count: usize,
        color: Color,
        speed: f32,
        lifetime_secs: f32,
    ) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            let velocity = self.sphere_direction() * speed + Vec3::Y * BURST_UPWARD_BIAS;
            if self.spawn(position, velocity, color, lifetime_secs).is_some() {
                spawned += 1;
            }
        }
        if spawned < count {
            debug!(
                "[PARTICLES] Burst at {:?} dropped {} of {} ({} dropped in total)",
                position,
                count - spawned,
                count,
                self.dropped
            );
        }
        spawned
    }

    /// Uniformly sampled polar/azimuthal direction
    fn sphere_direction(&mut self) -> Vec3 {
        let theta = self.rng.random_range(0.0..PI);
        let phi = self.rng.random_range(0.0..TAU);
        Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
    }

    /// Advances every live particle by `dt` seconds and retires the expired.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for particle in self.slots.iter_mut().filter(|p| p.active) {
            particle.position += particle.velocity * dt;
            particle.velocity.y += GRAVITY * dt;
            particle.remaining_life -= dt;
            if particle.remaining_life <= LIFE_EPSILON {
                particle.active = false;
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|p| p.active).count()
    }

    /// Total spawn requests dropped because the pool was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sum of the opacity ratio over live particles
    pub fn total_opacity(&self) -> f32 {
        self.slots.iter().map(Particle::opacity).sum()
    }

    /// All slots in pool order, live or not
    pub fn slots(&self) -> &[Particle] {
        &self.slots
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.slots.iter().enumerate().filter(|(_, p)| p.active)
    }
}
