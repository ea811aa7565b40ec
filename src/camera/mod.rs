//! Scripted camera flights between named viewpoints
//!
//! The rig owns the authoritative camera pose. It knows two destinations: the
//! default table view captured at construction, and a side-on battle framing
//! computed from two board squares. Flights are single-flight: asking for a
//! new one while a flight is running is ignored.
//!
//! While a flight runs, user orbit/drag controls are switched off and then
//! restored to exactly the enabled state they had when the flight began.

use crate::board::{BoardPosition, BOARD_CENTER};
use crate::tween::{ease_in_out_cubic, Tween};
use bevy::prelude::*;

/// Duration of the flight into battle framing
pub const BATTLE_TRANSITION_SECS: f32 = 0.6;

/// Duration of the flight back to the default view
pub const RETURN_SECS: f32 = 0.5;

/// Camera height above the board during a battle
pub const BATTLE_CAMERA_HEIGHT: f32 = 2.5;

/// Sideways offset per square of attacker/defender separation
pub const BATTLE_OFFSET_PER_SQUARE: f32 = 1.5;

/// Minimum sideways offset, so adjacent pieces are not framed too tightly
pub const BATTLE_OFFSET_FLOOR: f32 = 3.0;

/// Height of the look-at point, roughly piece chest height
const BATTLE_LOOK_HEIGHT: f32 = 0.5;

/// Camera position plus the point it looks at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewpoint {
    pub position: Vec3,
    pub target: Vec3,
}

impl Viewpoint {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    /// Three-quarter view from behind the Light side
    pub fn table_default() -> Self {
        Self::new(Vec3::new(3.5, 9.0, -5.5), BOARD_CENTER)
    }

    /// Side-on framing of a fight between two squares.
    ///
    /// Sits above the midpoint, pushed out along the horizontal perpendicular
    /// to the attacker→defender axis by a distance proportional to their
    /// separation but never closer than [`BATTLE_OFFSET_FLOOR`].
    pub fn battle_framing(attacker: BoardPosition, defender: BoardPosition) -> Self {
        let a = attacker.to_world();
        let d = defender.to_world();
        let midpoint = (a + d) * 0.5;

        let axis = Vec3::new(d.x - a.x, 0.0, d.z - a.z);
        let perpendicular = Vec3::new(-axis.z, 0.0, axis.x)
            .try_normalize()
            .unwrap_or(Vec3::X);
        let offset = (attacker.distance(defender) * BATTLE_OFFSET_PER_SQUARE)
            .max(BATTLE_OFFSET_FLOOR);

        Self {
            position: midpoint + perpendicular * offset + Vec3::Y * BATTLE_CAMERA_HEIGHT,
            target: midpoint + Vec3::Y * BATTLE_LOOK_HEIGHT,
        }
    }

    pub fn lerp(self, other: Viewpoint, t: f32) -> Viewpoint {
        Viewpoint {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
        }
    }

    /// Camera transform looking at the target with +Y up
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.target, Vec3::Y)
    }
}

/// Which scripted flight is running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightKind {
    ToBattle,
    ToDefault,
}

#[derive(Clone, Debug)]
struct Flight {
    kind: FlightKind,
    from: Viewpoint,
    to: Viewpoint,
    tween: Tween,
    controls_before: bool,
}

/// Authoritative camera pose and scripted flights
#[derive(Resource, Debug)]
pub struct CameraRig {
    default_view: Viewpoint,
    current: Viewpoint,
    flight: Option<Flight>,
    controls_enabled: bool,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(Viewpoint::table_default())
    }
}

impl CameraRig {
    /// Captures `default_view` as the home viewpoint and starts there.
    pub fn new(default_view: Viewpoint) -> Self {
        Self {
            default_view,
            current: default_view,
            flight: None,
            controls_enabled: true,
        }
    }

    /// Starts a flight into side-on battle framing. Returns `false` (and does
    /// nothing) if a flight is already running.
    pub fn transition_to_battle(&mut self, attacker: BoardPosition, defender: BoardPosition) -> bool {
        let to = Viewpoint::battle_framing(attacker, defender);
        self.begin(FlightKind::ToBattle, to, BATTLE_TRANSITION_SECS)
    }

    /// Starts a flight back to the default view. Returns `false` if a flight
    /// is already running.
    pub fn return_to_default(&mut self) -> bool {
        self.begin(FlightKind::ToDefault, self.default_view, RETURN_SECS)
    }

    fn begin(&mut self, kind: FlightKind, to: Viewpoint, duration: f32) -> bool {
        if let Some(flight) = &self.flight {
            debug!(
                "[CAMERA] Ignoring {:?} request while {:?} is in progress",
                kind, flight.kind
            );
            return false;
        }
        self.flight = Some(Flight {
            kind,
            from: self.current,
            to,
            tween: Tween::new(duration),
            controls_before: self.controls_enabled,
        });
        self.controls_enabled = false;
        true
    }

    /// Advances the running flight, if any.
    pub fn update(&mut self, dt: f32) {
        let Some(flight) = self.flight.as_mut() else {
            return;
        };
        flight.tween.advance(dt);
        if flight.tween.is_finished() {
            self.current = flight.to;
            self.controls_enabled = flight.controls_before;
            self.flight = None;
        } else {
            let eased = ease_in_out_cubic(flight.tween.progress());
            self.current = flight.from.lerp(flight.to, eased);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.flight.is_some()
    }

    pub fn flight_kind(&self) -> Option<FlightKind> {
        self.flight.as_ref().map(|f| f.kind)
    }

    pub fn current(&self) -> Viewpoint {
        self.current
    }

    pub fn default_view(&self) -> Viewpoint {
        self.default_view
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// Enables or disables user controls. During a flight the request is
    /// recorded and takes effect when the flight ends.
    pub fn set_controls_enabled(&mut self, enabled: bool) {
        match self.flight.as_mut() {
            Some(flight) => flight.controls_before = enabled,
            None => self.controls_enabled = enabled,
        }
    }

    /// Moves the camera directly, for user orbit controls. Refused while a
    /// flight is running or controls are disabled.
    pub fn set_view(&mut self, view: Viewpoint) -> bool {
        if self.flight.is_some() || !self.controls_enabled {
            return false;
        }
        self.current = view;
        true
    }
}
