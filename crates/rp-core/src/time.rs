//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Tick` counter: one tick is one
//! request/response exchange with the backend.  The backend steps physics at
//! a target framerate, which `TickClock` uses to convert between seconds of
//! simulated motion and tick counts.
//!
//! Motion durations supplied by callers are expressed in seconds at a nominal
//! 60 fps.  When the backend runs faster than life the same motion would look
//! rushed, so actions may scale durations by `framerate / 60`.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── TickClock ────────────────────────────────────────────────────────────────

/// Nominal framerate that caller-supplied motion durations refer to.
pub const NOMINAL_FRAMERATE: u32 = 60;

/// Tracks the current tick and the backend's target framerate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickClock {
    /// Physics frames per simulated second the backend is asked to run at.
    pub target_framerate: u32,
    /// The current tick, advanced by `TickClock::advance()` each exchange.
    pub current_tick: Tick,
}

impl TickClock {
    pub fn new(target_framerate: u32) -> Self {
        Self { target_framerate, current_tick: Tick::ZERO }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Scale a nominal-60fps duration so perceived motion speed does not
    /// depend on how fast the backend is stepping.
    #[inline]
    pub fn scaled_duration(&self, duration_secs: f32, scale: bool) -> f32 {
        scale_duration(duration_secs, self.target_framerate, scale)
    }

    /// How many ticks span `secs` simulated seconds? (rounds up)
    #[inline]
    pub fn ticks_for_secs(&self, secs: f32) -> u64 {
        (secs.max(0.0) * self.target_framerate as f32).ceil() as u64
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(100)
    }
}

impl fmt::Display for TickClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} fps", self.current_tick, self.target_framerate)
    }
}

/// Free-function form of [`TickClock::scaled_duration`] for callers that only
/// carry the framerate.
#[inline]
pub fn scale_duration(duration_secs: f32, target_framerate: u32, scale: bool) -> f32 {
    if scale {
        duration_secs * target_framerate as f32 / NOMINAL_FRAMERATE as f32
    } else {
        duration_secs
    }
}
