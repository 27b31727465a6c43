//! Processing context for DSP modules.
//!
//! Provides runtime information that modules need during per-sample processing.

/// Context provided to modules during processing.
///
/// Every module is stepped once per sample period; `sample_time` is the
/// duration of that period and is the only clock any timer in the crate
/// advances by.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// The sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: f32,
    /// Duration of one sample period in seconds.
    pub sample_time: f32,
}

impl ProcessContext {
    /// Creates a new process context for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            sample_time: 1.0 / sample_rate,
        }
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_context_creation() {
        let ctx = ProcessContext::new(48000.0);
        assert_eq!(ctx.sample_rate, 48000.0);
        assert!((ctx.sample_time - 1.0 / 48000.0).abs() < 1e-12);
    }

    #[test]
    fn test_process_context_default() {
        let ctx = ProcessContext::default();
        assert_eq!(ctx.sample_rate, 44100.0);
    }
}
