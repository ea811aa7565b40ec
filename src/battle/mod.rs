//! Capture cutscene
//!
//! [`BattleSequencer::play_battle`] turns a capture into a fixed run of
//! stages, each starting only after the previous one has finished:
//!
//! ```text
//! CameraApproach
//!   caster: Charge (0.4s) -> Projectile (0.4s) -> Settle (0.2s)
//!   melee : LungeOut (0.15s) -> LungeHold (0.1s) -> LungeBack (0.2s)
//! Death (0.4s) -> Pause (0.3s) -> CameraReturn -> Release
//! ```
//!
//! Only one battle runs at a time; a second request while playing is
//! ignored. The defender is faded and shrunk but stays in the registry; the
//! caller removes it once the battle has finished.
//!
//! Pieces are looked up by board square every tick, so a missing piece simply
//! skips its part of the choreography.

pub mod palette;

pub use palette::{soul_color, BattlePalette, DISSOLVE_COLOR};

use crate::animation::ClipKind;
use crate::board::{BoardPosition, Faction, PieceArchetype};
use crate::scene::Scene;
use crate::tween::{ease_in_out_cubic, ease_out_quad, Tween};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::f32::consts::TAU;

pub const CHARGE_SECS: f32 = 0.4;
pub const CHARGE_PARTICLES: usize = 25;
const CHARGE_RADIUS: f32 = 0.8;
const CHARGE_LIFT: f32 = 0.3;

pub const PROJECTILE_SECS: f32 = 0.4;
pub const TRAIL_CHANCE: f32 = 0.4;
pub const TRAIL_PARTICLES: usize = 5;
const TRAIL_JITTER: f32 = 0.3;
const TRAIL_LIFE: f32 = 0.3;

pub const IMPACT_PARTICLES: usize = 30;
const IMPACT_SPEED: f32 = 3.0;
const IMPACT_LIFE: f32 = 0.6;
pub const SETTLE_SECS: f32 = 0.2;

pub const LUNGE_OUT_SECS: f32 = 0.15;
pub const LUNGE_HOLD_SECS: f32 = 0.1;
pub const LUNGE_BACK_SECS: f32 = 0.2;
/// Fraction of the attacker→defender distance covered by a lunge
pub const LUNGE_REACH: f32 = 0.6;

pub const DEATH_SECS: f32 = 0.4;
pub const SOUL_PARTICLES: usize = 20;
const SOUL_LIFE: f32 = 0.8;
pub const DISSOLVE_PARTICLES: usize = 50;
const DISSOLVE_LIFE: f32 = 0.5;
pub const DEATH_END_SCALE: f32 = 0.2;
/// Upward drift of the dying piece, units per second
const DEATH_DRIFT: f32 = 0.5;

pub const PAUSE_SECS: f32 = 0.3;

/// Height effects are emitted at, roughly piece chest height
const EFFECT_HEIGHT: f32 = 0.5;

/// Who attacks whom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BattleRequest {
    pub attacker: BoardPosition,
    pub defender: BoardPosition,
    pub archetype: PieceArchetype,
    pub faction: Faction,
}

/// One step of the cutscene
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleStage {
    CameraApproach,
    Charge,
    Projectile,
    Settle,
    LungeOut,
    LungeHold,
    LungeBack,
    Death,
    Pause,
    CameraReturn,
    Release,
}

impl BattleStage {
    fn duration(self) -> Option<f32> {
        match self {
            BattleStage::Charge => Some(CHARGE_SECS),
            BattleStage::Projectile => Some(PROJECTILE_SECS),
            BattleStage::Settle => Some(SETTLE_SECS),
            BattleStage::LungeOut => Some(LUNGE_OUT_SECS),
            BattleStage::LungeHold => Some(LUNGE_HOLD_SECS),
            BattleStage::LungeBack => Some(LUNGE_BACK_SECS),
            BattleStage::Death => Some(DEATH_SECS),
            BattleStage::Pause => Some(PAUSE_SECS),
            BattleStage::CameraApproach | BattleStage::CameraReturn | BattleStage::Release => None,
        }
    }
}

/// The stage list for an attacker archetype
pub fn battle_plan(archetype: PieceArchetype) -> Vec<BattleStage> {
    let mut plan = vec![BattleStage::CameraApproach];
    if archetype.is_caster() {
        plan.extend([
            BattleStage::Charge,
            BattleStage::Projectile,
            BattleStage::Settle,
        ]);
    } else {
        plan.extend([
            BattleStage::LungeOut,
            BattleStage::LungeHold,
            BattleStage::LungeBack,
        ]);
    }
    plan.extend([
        BattleStage::Death,
        BattleStage::Pause,
        BattleStage::CameraReturn,
        BattleStage::Release,
    ]);
    plan
}

struct ActiveStage {
    stage: BattleStage,
    tween: Tween,
}

struct Battle {
    request: BattleRequest,
    palette: BattlePalette,
    plan: VecDeque<BattleStage>,
    active: Option<ActiveStage>,
    /// Attacker translation when the battle started
    attacker_origin: Vec3,
    /// Defender translation when it started dying
    defender_origin: Vec3,
}

/// Plays one capture cutscene at a time
#[derive(Resource)]
pub struct BattleSequencer {
    battle: Option<Battle>,
    projectile: Option<Vec3>,
    rng: StdRng,
    completed: u64,
}

impl Default for BattleSequencer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BattleSequencer {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            battle: None,
            projectile: None,
            rng,
            completed: 0,
        }
    }

    /// Starts the cutscene. Returns `false` without doing anything while
    /// another battle is playing.
    pub fn play_battle(&mut self, request: BattleRequest, scene: &mut Scene) -> bool {
        if self.battle.is_some() {
            debug!(
                "[BATTLE] Ignoring battle {} -> {}: a battle is already playing",
                request.attacker, request.defender
            );
            return false;
        }
        info!(
            "[BATTLE] {} {} on {} attacks {}",
            request.faction, request.archetype, request.attacker, request.defender
        );
        let attacker_origin = scene
            .registry
            .get(request.attacker)
            .map(|p| p.transform.translation)
            .unwrap_or_else(|| request.attacker.to_world());
        self.battle = Some(Battle {
            request,
            palette: BattlePalette::for_attacker(request.archetype, request.faction),
            plan: battle_plan(request.archetype).into(),
            active: None,
            attacker_origin,
            defender_origin: request.defender.to_world(),
        });
        self.update(0.0, scene);
        true
    }

    pub fn is_playing(&self) -> bool {
        self.battle.is_some()
    }

    /// Current stage, if a battle is playing
    pub fn stage(&self) -> Option<BattleStage> {
        self.battle
            .as_ref()
            .and_then(|b| b.active.as_ref())
            .map(|a| a.stage)
    }

    /// World position of the projectile while one is in the air
    pub fn projectile(&self) -> Option<Vec3> {
        self.projectile
    }

    /// Number of battles that ran to completion
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Advances the running battle by `dt` seconds. Time left over when a
    /// stage finishes carries into the next one.
    ///
    /// Returns the part of `dt` the battle did not use: all of it when no
    /// battle is playing, none while one still is.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) -> f32 {
        let mut budget = dt.max(0.0);
        loop {
            let Some(battle) = self.battle.as_mut() else {
                return budget;
            };
            if battle.active.is_none() {
                let Some(stage) = battle.plan.pop_front() else {
                    self.battle = None;
                    self.completed += 1;
                    return budget;
                };
                battle.active = Some(ActiveStage {
                    stage,
                    tween: Tween::new(stage.duration().unwrap_or(0.0)),
                });
                self.enter(stage, scene);
            }

            let Some(battle) = self.battle.as_mut() else {
                return budget;
            };
            let Some(active) = battle.active.as_mut() else {
                continue;
            };
            let stage = active.stage;

            let finished = match stage.duration() {
                Some(_) => {
                    let step = budget;
                    budget = active.tween.advance(step);
                    let progress = active.tween.progress();
                    let finished = active.tween.is_finished();
                    self.tick(stage, progress, step - budget, scene);
                    finished
                }
                None => match stage {
                    BattleStage::CameraApproach | BattleStage::CameraReturn => {
                        !scene.camera.is_animating()
                    }
                    _ => true,
                },
            };

            if !finished {
                return 0.0;
            }
            self.exit(stage, scene);
            if let Some(battle) = self.battle.as_mut() {
                battle.active = None;
            }
        }
    }

    fn enter(&mut self, stage: BattleStage, scene: &mut Scene) {
        let Some(battle) = self.battle.as_ref() else {
            return;
        };
        let request = battle.request;
        let palette = battle.palette;
        let attacker_id = scene.registry.get(request.attacker).map(|p| p.id);
        debug!("[BATTLE] Stage {:?}", stage);

        match stage {
            BattleStage::CameraApproach => {
                scene
                    .camera
                    .transition_to_battle(request.attacker, request.defender);
            }
            BattleStage::Charge => {
                let center = battle.attacker_origin + Vec3::Y * EFFECT_HEIGHT;
                for i in 0..CHARGE_PARTICLES {
                    let angle = TAU * i as f32 / CHARGE_PARTICLES as f32;
                    let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * CHARGE_RADIUS;
                    let velocity = -offset / CHARGE_SECS + Vec3::Y * CHARGE_LIFT;
                    scene
                        .pool
                        .spawn(center + offset, velocity, palette.charge, CHARGE_SECS);
                }
                if let Some(id) = attacker_id {
                    scene.animator.play_kind(id, ClipKind::Magic, false);
                }
            }
            BattleStage::Projectile => {
                self.projectile = Some(battle.attacker_origin + Vec3::Y * EFFECT_HEIGHT);
            }
            BattleStage::LungeOut => {
                if let Some(id) = attacker_id {
                    scene.animator.play_kind(id, ClipKind::Attack, false);
                }
            }
            BattleStage::Death => {
                let origin = scene
                    .registry
                    .get(request.defender)
                    .map(|p| p.transform.translation)
                    .unwrap_or_else(|| request.defender.to_world());
                if let Some(battle) = self.battle.as_mut() {
                    battle.defender_origin = origin;
                }
                self.spawn_death_particles(origin, request.faction.opponent(), scene);
                if let Some(id) = scene.registry.get(request.defender).map(|p| p.id) {
                    scene.animator.play_kind(id, ClipKind::Death, false);
                }
            }
            BattleStage::CameraReturn => {
                scene.camera.return_to_default();
            }
            BattleStage::Settle
            | BattleStage::LungeHold
            | BattleStage::LungeBack
            | BattleStage::Pause
            | BattleStage::Release => {}
        }
    }

    /// Per-frame work for timed stages. `step` is the time this stage
    /// consumed this frame.
    fn tick(&mut self, stage: BattleStage, progress: f32, step: f32, scene: &mut Scene) {
        let Some(battle) = self.battle.as_ref() else {
            return;
        };
        let request = battle.request;
        let origin = battle.attacker_origin;
        let target = request.defender.to_world();

        match stage {
            BattleStage::Projectile => {
                let from = origin + Vec3::Y * EFFECT_HEIGHT;
                let to = target + Vec3::Y * EFFECT_HEIGHT;
                let position = from.lerp(to, ease_in_out_cubic(progress));
                self.projectile = Some(position);
                if step > 0.0 && self.rng.random::<f32>() < TRAIL_CHANCE {
                    let trail = battle.palette.trail;
                    for _ in 0..TRAIL_PARTICLES {
                        let jitter = Vec3::new(
                            self.rng.random_range(-TRAIL_JITTER..TRAIL_JITTER),
                            self.rng.random_range(-TRAIL_JITTER..TRAIL_JITTER),
                            self.rng.random_range(-TRAIL_JITTER..TRAIL_JITTER),
                        );
                        scene.pool.spawn(position, jitter, trail, TRAIL_LIFE);
                    }
                }
            }
            BattleStage::LungeOut | BattleStage::LungeBack => {
                let peak = origin.lerp(target, LUNGE_REACH);
                let (from, to) = if stage == BattleStage::LungeOut {
                    (origin, peak)
                } else {
                    (peak, origin)
                };
                if let Some(piece) = scene.registry.get_mut(request.attacker) {
                    piece.transform.translation = from.lerp(to, ease_out_quad(progress));
                }
            }
            BattleStage::Death => {
                let eased = ease_out_quad(progress);
                let base = battle.defender_origin;
                let elapsed = progress * DEATH_SECS;
                if let Some(piece) = scene.registry.get_mut(request.defender) {
                    piece.transform.scale = Vec3::splat(1.0 + (DEATH_END_SCALE - 1.0) * eased);
                    piece.opacity = 1.0 - eased;
                    piece.transform.translation = base + Vec3::Y * DEATH_DRIFT * elapsed;
                }
            }
            _ => {}
        }
    }

    fn exit(&mut self, stage: BattleStage, scene: &mut Scene) {
        let Some(battle) = self.battle.as_ref() else {
            return;
        };
        let request = battle.request;
        let impact = battle.palette.impact;
        let defender_chest = request.defender.to_world() + Vec3::Y * EFFECT_HEIGHT;

        match stage {
            BattleStage::Projectile => {
                self.projectile = None;
                scene.pool.spawn_burst(
                    defender_chest,
                    IMPACT_PARTICLES,
                    impact,
                    IMPACT_SPEED,
                    IMPACT_LIFE,
                );
            }
            BattleStage::LungeHold => {
                scene.pool.spawn_burst(
                    defender_chest,
                    IMPACT_PARTICLES,
                    impact,
                    IMPACT_SPEED,
                    IMPACT_LIFE,
                );
            }
            BattleStage::LungeBack => {
                let origin = battle.attacker_origin;
                if let Some(piece) = scene.registry.get_mut(request.attacker) {
                    piece.transform.translation = origin;
                }
            }
            BattleStage::Release => {
                self.projectile = None;
                if let Some(id) = scene.registry.get(request.attacker).map(|p| p.id) {
                    scene.animator.play_kind(id, ClipKind::Idle, true);
                }
                debug!(
                    "[BATTLE] Released; {} particles still live",
                    scene.pool.active_count()
                );
            }
            _ => {}
        }
    }

    fn spawn_death_particles(&mut self, origin: Vec3, fallen: Faction, scene: &mut Scene) {
        let chest = origin + Vec3::Y * EFFECT_HEIGHT;
        let soul = soul_color(fallen);
        for _ in 0..SOUL_PARTICLES {
            let velocity = Vec3::new(
                self.rng.random_range(-0.3..0.3),
                self.rng.random_range(0.6..1.2),
                self.rng.random_range(-0.3..0.3),
            );
            scene.pool.spawn(chest, velocity, soul, SOUL_LIFE);
        }
        for _ in 0..DISSOLVE_PARTICLES {
            let angle = self.rng.random_range(0.0..TAU);
            let outward = Vec3::new(angle.cos(), 0.0, angle.sin()) * self.rng.random_range(1.0..2.5);
            let velocity = outward + Vec3::Y * self.rng.random_range(1.5..3.0);
            scene.pool.spawn(chest, velocity, DISSOLVE_COLOR, DISSOLVE_LIFE);
        }
    }
}
