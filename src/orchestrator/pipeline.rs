//! The MoveInFlight pipeline
//!
//! An accepted move becomes a queue of steps, built once from the
//! [`MoveResult`] and played strictly one after another:
//!
//! ```text
//! [Battle -> Remove]            enemy on the destination square
//! [Battle -> Remove]            captured piece elsewhere (en passant)
//! [Relocate]                    secondary piece (castling rook)
//! Face -> Glide -> FaceBack     the mover itself
//! [Promote]                     swap the mover for its promotion
//! Conclude                      events, turn flip, AI request
//! ```
//!
//! Human and AI moves run through the same queue.

use super::events::{GameEvent, GameOverReason, Outcome};
use super::state::TurnPhase;
use super::TurnOrchestrator;
use crate::animation::ClipKind;
use crate::battle::BattleRequest;
use crate::board::{BoardPosition, PieceArchetype};
use crate::oracle::{MoveResult, Relocation};
use crate::registry::PieceRegistry;
use crate::scene::Scene;
use crate::tween::{ease_in_out_cubic, Tween};
use bevy::prelude::*;
use std::collections::VecDeque;

/// Rotate-to-face before moving
pub const FACE_SECS: f32 = 0.15;
/// Glide time per square of distance
pub const GLIDE_SECS_PER_SQUARE: f32 = 0.18;
/// Secondary relocation time per square of distance
pub const RELOCATE_SECS_PER_SQUARE: f32 = 0.15;
/// Rotate back to the resting direction after arriving
pub const FACE_BACK_SECS: f32 = 0.15;

/// One step of the pipeline
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveStep {
    /// Play the capture cutscene and wait for it
    Battle {
        defender: BoardPosition,
    },
    /// Remove the defeated piece and announce the capture
    Remove {
        square: BoardPosition,
    },
    Relocate(Relocation),
    Face,
    Glide,
    FaceBack,
    Promote(PieceArchetype),
    Conclude,
}

impl MoveStep {
    fn duration(self, result: &MoveResult) -> Option<f32> {
        match self {
            MoveStep::Relocate(r) => Some(r.from.distance(r.to) * RELOCATE_SECS_PER_SQUARE),
            MoveStep::Face => Some(FACE_SECS),
            MoveStep::Glide => Some(result.from.distance(result.to) * GLIDE_SECS_PER_SQUARE),
            MoveStep::FaceBack => Some(FACE_BACK_SECS),
            MoveStep::Battle { .. }
            | MoveStep::Remove { .. }
            | MoveStep::Promote(_)
            | MoveStep::Conclude => None,
        }
    }
}

/// Lays out the steps for an accepted move.
pub fn build_plan(result: &MoveResult, registry: &PieceRegistry) -> VecDeque<MoveStep> {
    let mut plan = VecDeque::new();
    let is_enemy = |square: BoardPosition| {
        registry
            .get(square)
            .is_some_and(|piece| piece.faction != result.mover)
    };

    if is_enemy(result.to) {
        plan.push_back(MoveStep::Battle {
            defender: result.to,
        });
        plan.push_back(MoveStep::Remove { square: result.to });
    }
    if let Some(captured) = result.actual_captured_square {
        if captured != result.to && is_enemy(captured) {
            plan.push_back(MoveStep::Battle { defender: captured });
            plan.push_back(MoveStep::Remove { square: captured });
        }
    }
    if let Some(relocation) = result.secondary_relocation {
        plan.push_back(MoveStep::Relocate(relocation));
    }
    plan.extend([MoveStep::Face, MoveStep::Glide, MoveStep::FaceBack]);
    if let Some(archetype) = result.promotion {
        plan.push_back(MoveStep::Promote(archetype));
    }
    plan.push_back(MoveStep::Conclude);
    plan
}

struct ActiveStep {
    step: MoveStep,
    tween: Tween,
    start: Transform,
}

/// A move that is playing out
pub(crate) struct InFlight {
    result: MoveResult,
    plan: VecDeque<MoveStep>,
    active: Option<ActiveStep>,
}

impl InFlight {
    pub(crate) fn new(result: MoveResult, registry: &PieceRegistry) -> Self {
        let plan = build_plan(&result, registry);
        debug!("[TURN] Plan for {} -> {}: {:?}", result.from, result.to, plan);
        Self {
            result,
            plan,
            active: None,
        }
    }

    pub(crate) fn current_step(&self) -> Option<MoveStep> {
        self.active.as_ref().map(|a| a.step)
    }
}

/// Rotation that faces from `from` toward `to`
fn facing(from: BoardPosition, to: BoardPosition) -> Option<Quat> {
    let delta = to.to_world() - from.to_world();
    (delta.length_squared() > 0.0).then(|| Quat::from_rotation_y(delta.x.atan2(delta.z)))
}

impl TurnOrchestrator {
    /// Advances the in-flight move. Time left over when a step finishes
    /// carries into the next one.
    pub(super) fn advance_pipeline(&mut self, dt: f32, scene: &mut Scene) {
        let mut budget = dt.max(0.0);
        loop {
            let Some(flight) = self.in_flight.as_mut() else {
                return;
            };
            if flight.active.is_none() {
                let Some(step) = flight.plan.pop_front() else {
                    self.in_flight = None;
                    return;
                };
                let start = self.enter_step(step, scene);
                let Some(flight) = self.in_flight.as_mut() else {
                    return;
                };
                flight.active = Some(ActiveStep {
                    step,
                    tween: Tween::new(step.duration(&flight.result).unwrap_or(0.0)),
                    start,
                });
            }

            let Some(flight) = self.in_flight.as_mut() else {
                return;
            };
            let Some(active) = flight.active.as_mut() else {
                continue;
            };
            let step = active.step;

            let finished = match step.duration(&flight.result) {
                Some(_) => {
                    budget = active.tween.advance(budget);
                    let progress = ease_in_out_cubic(active.tween.progress());
                    let start = active.start;
                    let done = active.tween.is_finished();
                    let result = flight.result.clone();
                    tick_step(step, &result, start, progress, scene);
                    done
                }
                None => match step {
                    MoveStep::Battle { .. } => !self.battle.is_playing(),
                    _ => true,
                },
            };
            if !finished {
                return;
            }

            self.exit_step(step, scene);
            if let Some(flight) = self.in_flight.as_mut() {
                flight.active = None;
            }
        }
    }

    /// Entry actions; returns the transform the step animates from.
    fn enter_step(&mut self, step: MoveStep, scene: &mut Scene) -> Transform {
        let Some(result) = self.in_flight.as_ref().map(|f| f.result.clone()) else {
            return Transform::IDENTITY;
        };
        let subject = match step {
            MoveStep::Relocate(r) => r.from,
            MoveStep::FaceBack | MoveStep::Promote(_) => result.to,
            _ => result.from,
        };
        let start = scene
            .registry
            .get(subject)
            .map(|p| p.transform)
            .unwrap_or_else(|| Transform::from_translation(subject.to_world()));

        match step {
            MoveStep::Battle { defender } => {
                let request = BattleRequest {
                    attacker: result.from,
                    defender,
                    archetype: result.moved_archetype,
                    faction: result.mover,
                };
                if !self.battle.play_battle(request, scene) {
                    warn!("[TURN] Battle refused for {} -> {}", result.from, defender);
                }
            }
            MoveStep::Glide => {
                if let Some(id) = scene.registry.get(result.from).map(|p| p.id) {
                    scene.animator.play_kind(id, ClipKind::Walk, true);
                }
            }
            _ => {}
        }
        start
    }

    fn exit_step(&mut self, step: MoveStep, scene: &mut Scene) {
        let Some(result) = self.in_flight.as_ref().map(|f| f.result.clone()) else {
            return;
        };
        match step {
            MoveStep::Remove { square } => {
                if let Some(fallen) = scene.registry.remove(square, scene.animator) {
                    info!(
                        "[TURN] {} {} captured on {}",
                        fallen.faction, fallen.archetype, square
                    );
                    self.events.emit(GameEvent::CaptureOccurred {
                        archetype: fallen.archetype,
                        by: result.mover,
                    });
                }
            }
            MoveStep::Relocate(r) => {
                if let Err(e) = scene.registry.relocate(r.from, r.to) {
                    warn!("[TURN] Secondary relocation failed: {}", e);
                }
            }
            MoveStep::Glide => {
                if let Err(e) = scene.registry.relocate(result.from, result.to) {
                    warn!("[TURN] Relocation failed: {}", e);
                }
                if let Some(id) = scene.registry.get(result.to).map(|p| p.id) {
                    scene.animator.play_kind(id, ClipKind::Idle, true);
                }
            }
            MoveStep::FaceBack => {
                if let Some(piece) = scene.registry.get_mut(result.to) {
                    piece.transform.rotation = piece.faction.resting_rotation();
                }
            }
            MoveStep::Promote(archetype) => {
                scene.registry.remove(result.to, scene.animator);
                match scene
                    .registry
                    .spawn(archetype, result.mover, result.to, scene.animator)
                {
                    Ok(_) => info!("[TURN] Promoted on {} to {}", result.to, archetype),
                    Err(e) => warn!("[TURN] Promotion failed: {}", e),
                }
            }
            MoveStep::Conclude => self.conclude(result, scene),
            MoveStep::Battle { .. } | MoveStep::Face => {}
        }
    }

    fn conclude(&mut self, result: MoveResult, scene: &mut Scene) {
        self.in_flight = None;
        self.moves_played += 1;
        let mover = result.mover;
        let terminal = if result.is_checkmate {
            Some((Outcome::Winner(mover), GameOverReason::Checkmate))
        } else if result.is_stalemate {
            Some((Outcome::Draw, GameOverReason::Stalemate))
        } else if result.is_insufficient_material {
            Some((Outcome::Draw, GameOverReason::InsufficientMaterial))
        } else {
            None
        };
        let gives_check = result.is_check;
        self.events.emit(GameEvent::MoveCommitted(result));

        if let Some((outcome, reason)) = terminal {
            info!("[TURN] Game over: {:?} by {:?}", outcome, reason);
            self.state.transition_to(TurnPhase::GameOver);
            self.events.emit(GameEvent::GameOver { outcome, reason });
        } else {
            let next = mover.opponent();
            if gives_check {
                self.events.emit(GameEvent::CheckDeclared(next));
            }
            self.state.active_faction = next;
            self.state.transition_to(TurnPhase::Idle);
            info!("[TURN] {} to move", next);
            self.events.emit(GameEvent::TurnChanged(next));
        }

        if self.reset_pending {
            self.reset_pending = false;
            self.reset_now(scene);
        } else {
            self.request_ai_move_if_due();
        }
    }
}

/// Per-frame motion for timed steps. `progress` is already eased.
fn tick_step(step: MoveStep, result: &MoveResult, start: Transform, progress: f32, scene: &mut Scene) {
    match step {
        MoveStep::Relocate(r) => {
            if let Some(piece) = scene.registry.get_mut(r.from) {
                piece.transform.translation = start.translation.lerp(r.to.to_world(), progress);
            }
        }
        MoveStep::Face => {
            let Some(target) = facing(result.from, result.to) else {
                return;
            };
            if let Some(piece) = scene.registry.get_mut(result.from) {
                piece.transform.rotation = start.rotation.slerp(target, progress);
            }
        }
        MoveStep::Glide => {
            if let Some(piece) = scene.registry.get_mut(result.from) {
                piece.transform.translation = start.translation.lerp(result.to.to_world(), progress);
            }
        }
        MoveStep::FaceBack => {
            if let Some(piece) = scene.registry.get_mut(result.to) {
                let rest = piece.faction.resting_rotation();
                piece.transform.rotation = start.rotation.slerp(rest, progress);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ManualClock, ModelAnimator};
    use crate::board::Faction;
    use crate::oracle::SpecialMove;

    fn sq(name: &str) -> BoardPosition {
        BoardPosition::from_algebraic(name).unwrap()
    }

    fn registry_with(pieces: &[(&str, PieceArchetype, Faction)]) -> PieceRegistry {
        let mut registry = PieceRegistry::default();
        let mut animator = ModelAnimator::new(Box::new(ManualClock::new()));
        for (name, archetype, faction) in pieces {
            registry
                .spawn(*archetype, *faction, sq(name), &mut animator)
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_quiet_move_plan() {
        let registry = registry_with(&[("e2", PieceArchetype::Skirmisher, Faction::Light)]);
        let result = MoveResult::quiet(sq("e2"), sq("e4"), Faction::Light, PieceArchetype::Skirmisher);
        let plan: Vec<_> = build_plan(&result, &registry).into();
        assert_eq!(
            plan,
            [MoveStep::Face, MoveStep::Glide, MoveStep::FaceBack, MoveStep::Conclude]
        );
    }

    #[test]
    fn test_capture_plan_battles_before_moving() {
        let registry = registry_with(&[
            ("e4", PieceArchetype::Skirmisher, Faction::Light),
            ("d5", PieceArchetype::Skirmisher, Faction::Dark),
        ]);
        let mut result =
            MoveResult::quiet(sq("e4"), sq("d5"), Faction::Light, PieceArchetype::Skirmisher);
        result.captured_archetype = Some(PieceArchetype::Skirmisher);
        let plan: Vec<_> = build_plan(&result, &registry).into();
        assert_eq!(plan[0], MoveStep::Battle { defender: sq("d5") });
        assert_eq!(plan[1], MoveStep::Remove { square: sq("d5") });
        assert_eq!(plan[2], MoveStep::Face);
    }

    #[test]
    fn test_en_passant_plan_targets_captured_square() {
        let registry = registry_with(&[
            ("e5", PieceArchetype::Skirmisher, Faction::Light),
            ("d5", PieceArchetype::Skirmisher, Faction::Dark),
        ]);
        let mut result =
            MoveResult::quiet(sq("e5"), sq("d6"), Faction::Light, PieceArchetype::Skirmisher);
        result.special = SpecialMove::EnPassant;
        result.captured_archetype = Some(PieceArchetype::Skirmisher);
        result.actual_captured_square = Some(sq("d5"));
        let plan: Vec<_> = build_plan(&result, &registry).into();
        assert_eq!(plan[0], MoveStep::Battle { defender: sq("d5") });
        assert_eq!(plan[1], MoveStep::Remove { square: sq("d5") });
    }

    #[test]
    fn test_castle_and_promotion_ordering() {
        let registry = registry_with(&[
            ("e1", PieceArchetype::Sovereign, Faction::Light),
            ("h1", PieceArchetype::Bulwark, Faction::Light),
        ]);
        let mut result =
            MoveResult::quiet(sq("e1"), sq("g1"), Faction::Light, PieceArchetype::Sovereign);
        result.special = SpecialMove::Castle;
        result.secondary_relocation = Some(Relocation {
            from: sq("h1"),
            to: sq("f1"),
        });
        let plan: Vec<_> = build_plan(&result, &registry).into();
        assert!(matches!(plan[0], MoveStep::Relocate(_)));
        assert_eq!(plan[1], MoveStep::Face);

        let mut promotion =
            MoveResult::quiet(sq("a7"), sq("a8"), Faction::Light, PieceArchetype::Skirmisher);
        promotion.promotion = Some(PieceArchetype::Caster);
        let plan: Vec<_> = build_plan(&promotion, &registry).into();
        assert_eq!(plan[plan.len() - 2], MoveStep::Promote(PieceArchetype::Caster));
    }

    #[test]
    fn test_facing_points_at_destination() {
        let north = facing(sq("e2"), sq("e4")).unwrap();
        assert!((north * Vec3::Z - Vec3::Z).length() < 1e-5);
        let east = facing(sq("a1"), sq("c1")).unwrap();
        assert!((east * Vec3::Z - Vec3::X).length() < 1e-5);
        assert!(facing(sq("a1"), sq("a1")).is_none());
    }
}
