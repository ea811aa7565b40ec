//! Easing curves and time-normalised progress tracking
//!
//! Every timed visual in the crate (camera flights, battle stages, piece
//! glides) is a [`Tween`] advanced by frame delta and sampled through one of
//! the easing curves below.

/// Cubic ease-in-out: slow start, fast middle, slow end
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Quadratic ease-out: fast start, gentle landing
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Fixed-duration progress tracker
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    duration: f32,
    elapsed: f32,
}

impl Tween {
    /// A non-positive duration produces a tween that is already finished.
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration: duration_secs.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Advances by `dt` seconds and returns the time left over past the end.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let dt = dt.max(0.0);
        let remaining = self.duration - self.elapsed;
        if dt >= remaining {
            self.elapsed = self.duration;
            dt - remaining
        } else {
            self.elapsed += dt;
            0.0
        }
    }

    /// Linear progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}
