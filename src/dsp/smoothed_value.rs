//! Smoothed values for visual feedback.
//!
//! Node brightness jumps to full when a voice starts and then fades out
//! along an exponential curve, so short trigger bursts remain visible to
//! whatever renders the panel.

/// A value that smoothly interpolates toward a target.
///
/// Uses a one-pole lowpass whose coefficient is derived from a time
/// constant. With `instant_rise` set, upward moves skip the smoothing and
/// only decay is gradual.
#[derive(Clone, Debug)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    /// Smoothing coefficient (0-1). Higher = slower smoothing.
    smoothing_factor: f32,
    sample_rate: f32,
    time_constant_ms: f32,
    instant_rise: bool,
}

impl SmoothedValue {
    /// Time constant used for node brightness decay.
    pub const BRIGHTNESS_TIME_CONSTANT_MS: f32 = 50.0;

    /// Creates a new smoothed value.
    ///
    /// # Arguments
    ///
    /// * `initial` - Starting value (both current and target)
    /// * `time_constant_ms` - Time in milliseconds to cover ~63% of the distance to the target
    /// * `sample_rate` - Rate at which `next()` is called, in Hz
    pub fn new(initial: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            smoothing_factor: Self::calc_smoothing_factor(time_constant_ms, sample_rate),
            sample_rate,
            time_constant_ms,
            instant_rise: false,
        }
    }

    /// Creates a brightness follower: rises instantly, decays over 50 ms.
    pub fn brightness(sample_rate: f32) -> Self {
        let mut value = Self::new(0.0, Self::BRIGHTNESS_TIME_CONSTANT_MS, sample_rate);
        value.instant_rise = true;
        value
    }

    /// factor = exp(-1 / (time_constant * sample_rate))
    fn calc_smoothing_factor(time_constant_ms: f32, sample_rate: f32) -> f32 {
        if time_constant_ms <= 0.0 || sample_rate <= 0.0 {
            return 0.0;
        }
        let time_constant_samples = time_constant_ms * 0.001 * sample_rate;
        if time_constant_samples < 1.0 {
            return 0.0;
        }
        (-1.0 / time_constant_samples).exp()
    }

    #[inline]
    pub fn set_target(&mut self, value: f32) {
        self.target = value;
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advances the smoothing by one sample and returns the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let diff = self.current - self.target;
        if diff.abs() <= 1e-4 || (self.instant_rise && diff < 0.0) {
            self.current = self.target;
        } else {
            self.current = self.target + self.smoothing_factor * diff;
        }
        self.current
    }

    /// Sets the value immediately without smoothing.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Updates the sample rate and recalculates the smoothing factor.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.smoothing_factor = Self::calc_smoothing_factor(self.time_constant_ms, sample_rate);
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::brightness(44100.0)
    }
}
