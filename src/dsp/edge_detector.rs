//! Schmitt-trigger edge detection.
//!
//! Converts a continuous voltage into clean rising edges using hysteresis,
//! either for a single channel or multiplexed across a polyphonic port.

use super::signal::{PolySignal, MAX_CHANNELS};

/// A single-channel Schmitt trigger.
///
/// Latches high when the voltage reaches [`EdgeDetector::HIGH_THRESHOLD`]
/// and low when it falls to [`EdgeDetector::LOW_THRESHOLD`] or below.
/// Reports a rising edge exactly once per crossing into the high state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    high: bool,
}

impl EdgeDetector {
    /// Voltage at or above which the detector latches high.
    pub const HIGH_THRESHOLD: f32 = 2.0;
    /// Voltage at or below which the detector latches low.
    pub const LOW_THRESHOLD: f32 = 0.1;

    /// Creates a detector in the low state.
    pub const fn new() -> Self {
        Self { high: false }
    }

    /// Processes one voltage sample. Returns true on a rising edge.
    #[inline]
    pub fn process(&mut self, voltage: f32) -> bool {
        if self.high {
            if voltage <= Self::LOW_THRESHOLD {
                self.high = false;
            }
            false
        } else if voltage >= Self::HIGH_THRESHOLD {
            self.high = true;
            true
        } else {
            false
        }
    }

    /// Returns the current latched state.
    #[inline]
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Returns the detector to the low state.
    #[inline]
    pub fn reset(&mut self) {
        self.high = false;
    }
}

/// One [`EdgeDetector`] per polyphonic channel of a port.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolyEdgeDetector {
    channels: [EdgeDetector; MAX_CHANNELS],
}

impl PolyEdgeDetector {
    /// Creates a detector with every channel low.
    pub const fn new() -> Self {
        Self {
            channels: [EdgeDetector::new(); MAX_CHANNELS],
        }
    }

    /// Processes every active channel of `port`. Returns true if any
    /// channel produced a rising edge.
    ///
    /// Channels beyond the port's channel count read as 0 V, so they
    /// unlatch rather than staying stuck high after a cable shrinks.
    pub fn process(&mut self, port: &PolySignal) -> bool {
        let active = port.channels();
        let mut fired = false;
        for (ch, detector) in self.channels.iter_mut().enumerate() {
            let voltage = if ch < active { port.voltage_at(ch) } else { 0.0 };
            fired |= detector.process(voltage);
        }
        fired
    }

    /// Returns true if any channel is latched high.
    pub fn any_high(&self) -> bool {
        self.channels.iter().any(EdgeDetector::is_high)
    }

    /// Returns the detector for one channel.
    pub fn channel(&self, channel: usize) -> Option<&EdgeDetector> {
        self.channels.get(channel)
    }

    /// Returns every channel to the low state.
    pub fn reset(&mut self) {
        for detector in &mut self.channels {
            detector.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edge_fires_once() {
        let mut det = EdgeDetector::new();
        assert!(!det.process(0.0));
        assert!(det.process(5.0));
        assert!(!det.process(5.0));
        assert!(!det.process(10.0));
        assert!(det.is_high());
    }

    #[test]
    fn test_hysteresis_band() {
        let mut det = EdgeDetector::new();
        // Below the high threshold never fires
        assert!(!det.process(1.9));
        assert!(det.process(2.0));

        // Dropping into the band does not unlatch
        assert!(!det.process(1.0));
        assert!(det.is_high());
        assert!(!det.process(3.0));

        // Dropping to the low threshold does
        det.process(0.1);
        assert!(!det.is_high());
        assert!(det.process(3.0));
    }

    #[test]
    fn test_reset_unlatches() {
        let mut det = EdgeDetector::new();
        det.process(10.0);
        det.reset();
        assert!(!det.is_high());
        assert!(det.process(10.0));
    }

    #[test]
    fn test_poly_detector_per_channel() {
        let mut det = PolyEdgeDetector::new();
        let mut port = PolySignal::new();
        port.connect(3);

        assert!(!det.process(&port));

        port.set_voltage_at(2, 10.0);
        assert!(det.process(&port));
        assert!(det.any_high());
        assert!(det.channel(2).map_or(false, |d| d.is_high()));
        assert!(!det.channel(0).map_or(true, |d| d.is_high()));

        // Second channel rising while the third is held still fires
        port.set_voltage_at(1, 10.0);
        assert!(det.process(&port));
        assert!(!det.process(&port));
    }

    #[test]
    fn test_poly_detector_releases_dropped_channels() {
        let mut det = PolyEdgeDetector::new();
        let mut port = PolySignal::new();
        port.connect(4);
        port.set_voltage_at(3, 10.0);
        det.process(&port);
        assert!(det.any_high());

        port.connect(2);
        det.process(&port);
        assert!(!det.any_high());
    }
}
