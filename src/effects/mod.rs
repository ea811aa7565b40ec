//! Visual effect primitives shared by every sequence
//!
//! Only the particle pool lives here today; battle-specific palettes and
//! emission patterns are in [`crate::battle`].

pub mod particles;

pub use particles::{Particle, ParticlePool, DEFAULT_CAPACITY};
