//! One-shot pulse timer.
//!
//! Used for fixed-width trigger pulses, retrigger pulses, timed gates and
//! as an elapsed-time counter for debounce windows.

/// A one-shot timer armed with a duration.
///
/// `process` reports `true` for every step that begins inside the armed
/// duration, then disarms. The elapsed time keeps accumulating after the
/// pulse ends, so the same timer can be read as a free-running counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseTimer {
    /// Seconds since the timer was last armed or reset.
    elapsed: f32,
    /// Armed duration in seconds; zero when disarmed.
    duration: f32,
}

impl PulseTimer {
    /// Creates a disarmed timer with zero elapsed time.
    pub const fn new() -> Self {
        Self {
            elapsed: 0.0,
            duration: 0.0,
        }
    }

    /// Creates a disarmed timer whose elapsed time is already unbounded.
    ///
    /// An elapsed-time comparison against any window passes immediately.
    pub const fn expired() -> Self {
        Self {
            elapsed: f32::INFINITY,
            duration: 0.0,
        }
    }

    /// Arms the timer for `duration` seconds starting now.
    #[inline]
    pub fn trigger(&mut self, duration: f32) {
        self.elapsed = 0.0;
        self.duration = duration.max(0.0);
    }

    /// Advances the timer by `dt` and returns whether it was active.
    #[inline]
    pub fn process(&mut self, dt: f32) -> bool {
        let active = self.elapsed < self.duration;
        self.elapsed += dt;
        if !active {
            self.duration = 0.0;
        }
        active
    }

    /// Returns true while the armed duration has not run out.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }

    /// Seconds since the timer was last armed or reset.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Disarms the timer and zeros the elapsed time.
    #[inline]
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.duration = 0.0;
    }
}

impl Default for PulseTimer {
    fn default() -> Self {
        Self::new()
    }
}
