//! Per-piece clip playback
//!
//! Source models ship clips with arbitrary names ("Armature|Run_Cycle",
//! "CastSpell01", ...). On registration every clip name is normalised into
//! the closed set {idle, walk, attack, magic, death} by case-insensitive
//! substring match, first match wins:
//!
//! | Precedence | Substrings        | Normalised |
//! |------------|-------------------|------------|
//! | 1          | `idle`            | idle       |
//! | 2          | `walk`, `run`     | walk       |
//! | 3          | `attack`, `hit`   | attack     |
//! | 4          | `magic`, `cast`   | magic      |
//! | 5          | `death`, `die`    | death      |
//! | -          | anything else     | passthrough (lowercased) |
//!
//! Playing a clip cross-fades out of the current one over
//! [`CROSS_FADE_SECS`]. Asking for a missing instance or clip is a silent
//! no-op that returns an already-resolved [`ClipSignal`], so callers never
//! branch on whether assets loaded.

pub mod clock;

pub use clock::{AnimationClock, ManualClock, SystemClock};

use crate::registry::PieceId;
use bevy::prelude::*;
use std::collections::HashMap;

/// Cross-fade length between consecutive clips
pub const CROSS_FADE_SECS: f32 = 0.2;

/// The clip vocabulary every sequence is written against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Idle,
    Walk,
    Attack,
    Magic,
    Death,
}

impl ClipKind {
    pub fn name(self) -> &'static str {
        match self {
            ClipKind::Idle => "idle",
            ClipKind::Walk => "walk",
            ClipKind::Attack => "attack",
            ClipKind::Magic => "magic",
            ClipKind::Death => "death",
        }
    }
}

/// Normalised clip key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClipKey {
    Known(ClipKind),
    Other(String),
}

impl From<ClipKind> for ClipKey {
    fn from(kind: ClipKind) -> Self {
        ClipKey::Known(kind)
    }
}

fn classify(lower: &str) -> Option<ClipKind> {
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if has(&["idle"]) {
        Some(ClipKind::Idle)
    } else if has(&["walk", "run"]) {
        Some(ClipKind::Walk)
    } else if has(&["attack", "hit"]) {
        Some(ClipKind::Attack)
    } else if has(&["magic", "cast"]) {
        Some(ClipKind::Magic)
    } else if has(&["death", "die"]) {
        Some(ClipKind::Death)
    } else {
        None
    }
}

/// Maps an arbitrary source clip name onto the normalised vocabulary.
pub fn normalize_clip_name(raw: &str) -> ClipKey {
    let lower = raw.to_lowercase();
    match classify(&lower) {
        Some(kind) => ClipKey::Known(kind),
        None => ClipKey::Other(lower),
    }
}

/// A clip as shipped with a model
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipSource {
    pub name: String,
    pub duration_secs: f32,
}

impl ClipSource {
    pub fn new(name: impl Into<String>, duration_secs: f32) -> Self {
        Self {
            name: name.into(),
            duration_secs,
        }
    }
}

/// Completion handle returned by [`ModelAnimator::play`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipSignal {
    /// Nothing to wait for: looping clip, missing instance, or missing clip
    Resolved,
    /// Resolves when this playback reaches its end or is superseded
    Pending { instance: PieceId, playback: u64 },
}

#[derive(Clone, Debug)]
struct Playback {
    id: u64,
    key: ClipKey,
    time: f32,
    duration: f32,
    looping: bool,
    finished: bool,
}

impl Playback {
    fn advance(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        self.time += dt;
        if self.duration <= 0.0 {
            self.time = 0.0;
            self.finished = !self.looping;
        } else if self.looping {
            self.time %= self.duration;
        } else if self.time >= self.duration {
            self.time = self.duration;
            self.finished = true;
        }
    }
}

#[derive(Clone, Debug)]
struct FadeOut {
    key: ClipKey,
    remaining: f32,
}

/// Clip table and playback state for one visual piece
#[derive(Debug, Default)]
pub struct AnimationBinding {
    clips: HashMap<ClipKey, ClipSource>,
    current: Option<Playback>,
    fading_out: Option<FadeOut>,
}

impl AnimationBinding {
    pub fn from_sources(sources: impl IntoIterator<Item = ClipSource>) -> Self {
        let mut clips = HashMap::new();
        for source in sources {
            let key = normalize_clip_name(&source.name);
            if clips.contains_key(&key) {
                debug!(
                    "[ANIM] Clip '{}' normalises to an existing key {:?}; keeping the first",
                    source.name, key
                );
                continue;
            }
            clips.insert(key, source);
        }
        Self {
            clips,
            current: None,
            fading_out: None,
        }
    }

    pub fn has_clip(&self, key: &ClipKey) -> bool {
        self.clips.contains_key(key)
    }

    fn advance(&mut self, dt: f32) {
        if let Some(playback) = self.current.as_mut() {
            playback.advance(dt);
        }
        if let Some(fade) = self.fading_out.as_mut() {
            fade.remaining -= dt;
            if fade.remaining <= 0.0 {
                self.fading_out = None;
            }
        }
    }
}

/// Drives clip playback for every registered piece
#[derive(Resource)]
pub struct ModelAnimator {
    bindings: HashMap<PieceId, AnimationBinding>,
    clock: Box<dyn AnimationClock>,
    last_tick: Option<std::time::Duration>,
    next_playback: u64,
}

impl Default for ModelAnimator {
    fn default() -> Self {
        Self::new(Box::new(SystemClock::default()))
    }
}

impl ModelAnimator {
    pub fn new(clock: Box<dyn AnimationClock>) -> Self {
        Self {
            bindings: HashMap::new(),
            clock,
            last_tick: None,
            next_playback: 0,
        }
    }

    /// Registers a piece's clips. Pieces without clips are simply never
    /// registered, and every call against them is a no-op.
    pub fn register(&mut self, instance: PieceId, clips: impl IntoIterator<Item = ClipSource>) {
        let binding = AnimationBinding::from_sources(clips);
        if binding.clips.is_empty() {
            return;
        }
        self.bindings.insert(instance, binding);
    }

    pub fn unregister(&mut self, instance: PieceId) {
        self.bindings.remove(&instance);
    }

    pub fn is_registered(&self, instance: PieceId) -> bool {
        self.bindings.contains_key(&instance)
    }

    /// Cross-fades `instance` into the clip named `name`.
    pub fn play(&mut self, instance: PieceId, name: &str, looping: bool) -> ClipSignal {
        self.play_key(instance, normalize_clip_name(name), looping)
    }

    pub fn play_kind(&mut self, instance: PieceId, kind: ClipKind, looping: bool) -> ClipSignal {
        self.play_key(instance, ClipKey::Known(kind), looping)
    }

    fn play_key(&mut self, instance: PieceId, key: ClipKey, looping: bool) -> ClipSignal {
        let Some(binding) = self.bindings.get_mut(&instance) else {
            return ClipSignal::Resolved;
        };
        let Some(duration) = binding.clips.get(&key).map(|c| c.duration_secs) else {
            return ClipSignal::Resolved;
        };

        if let Some(previous) = binding.current.take() {
            binding.fading_out = Some(FadeOut {
                key: previous.key,
                remaining: CROSS_FADE_SECS,
            });
        }

        let id = self.next_playback;
        self.next_playback += 1;
        binding.current = Some(Playback {
            id,
            key,
            time: 0.0,
            duration,
            looping,
            finished: false,
        });

        if looping {
            ClipSignal::Resolved
        } else {
            ClipSignal::Pending {
                instance,
                playback: id,
            }
        }
    }

    /// True once the clip behind `signal` finished, was replaced, or its
    /// instance went away.
    pub fn is_resolved(&self, signal: ClipSignal) -> bool {
        let ClipSignal::Pending { instance, playback } = signal else {
            return true;
        };
        match self.bindings.get(&instance).and_then(|b| b.current.as_ref()) {
            Some(current) => current.id != playback || current.finished,
            None => true,
        }
    }

    /// Advances every binding by the time elapsed on the animator's own clock
    /// since the previous call.
    pub fn update(&mut self) {
        let now = self.clock.now();
        let dt = match self.last_tick {
            Some(last) => now.saturating_sub(last).as_secs_f32(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        if dt <= 0.0 {
            return;
        }
        for binding in self.bindings.values_mut() {
            binding.advance(dt);
        }
    }

    pub fn current_clip(&self, instance: PieceId) -> Option<&ClipKey> {
        self.bindings
            .get(&instance)?
            .current
            .as_ref()
            .map(|p| &p.key)
    }

    /// Playhead of the current clip in seconds
    pub fn playhead(&self, instance: PieceId) -> Option<f32> {
        Some(self.bindings.get(&instance)?.current.as_ref()?.time)
    }

    /// Weight of the current clip; below 1.0 while a cross-fade is running.
    pub fn blend_weight(&self, instance: PieceId) -> f32 {
        let Some(binding) = self.bindings.get(&instance) else {
            return 0.0;
        };
        if binding.current.is_none() {
            return 0.0;
        }
        match &binding.fading_out {
            Some(fade) => 1.0 - (fade.remaining / CROSS_FADE_SECS).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    pub fn fading_clip(&self, instance: PieceId) -> Option<&ClipKey> {
        self.bindings
            .get(&instance)?
            .fading_out
            .as_ref()
            .map(|f| &f.key)
    }
}
