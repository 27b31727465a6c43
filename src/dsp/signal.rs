//! Signal types and per-sample port state.
//!
//! Every port carries up to [`MAX_CHANNELS`] voltages, following the
//! polyphonic cable convention: an input with one channel is mono and is
//! broadcast to every channel that asks for it.

/// Maximum number of polyphonic channels a single port can carry.
pub const MAX_CHANNELS: usize = 16;

/// The type of signal flowing through a port.
///
/// - **Control**: continuous CV, typically -10 V to 10 V
/// - **Gate**: held high (10 V) while a voice is active
/// - **Trigger**: short 10 V pulses marking discrete events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalType {
    Control,
    Gate,
    Trigger,
}

impl SignalType {
    /// Returns a human-readable name for the signal type.
    pub fn name(&self) -> &'static str {
        match self {
            SignalType::Control => "Control",
            SignalType::Gate => "Gate",
            SignalType::Trigger => "Trigger",
        }
    }
}

/// The state of one port for the current sample.
///
/// For inputs, `channels` is the number of channels on the patched cable
/// and `connected` follows from it. For outputs, `connected` is set by the
/// host when a cable is attached and `channels` is set by the module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolySignal {
    voltages: [f32; MAX_CHANNELS],
    channels: usize,
    connected: bool,
}

impl PolySignal {
    /// Creates an unpatched port with all voltages at zero.
    pub const fn new() -> Self {
        Self {
            voltages: [0.0; MAX_CHANNELS],
            channels: 0,
            connected: false,
        }
    }

    /// Returns true if a cable is patched into this port.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Marks the port as patched with the given number of channels.
    ///
    /// The channel count is clamped to 1..=16.
    pub fn connect(&mut self, channels: usize) {
        self.connected = true;
        self.channels = channels.clamp(1, MAX_CHANNELS);
    }

    /// Marks the port as unpatched and zeros it.
    pub fn disconnect(&mut self) {
        *self = Self::new();
    }

    /// Returns the active channel count.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sets the active channel count; voltages above the count are zeroed.
    pub fn set_channels(&mut self, channels: usize) {
        let channels = channels.min(MAX_CHANNELS);
        for v in &mut self.voltages[channels..] {
            *v = 0.0;
        }
        self.channels = channels;
    }

    /// Returns the voltage on channel 0.
    #[inline]
    pub fn voltage(&self) -> f32 {
        self.voltages[0]
    }

    /// Returns the voltage on a specific channel.
    #[inline]
    pub fn voltage_at(&self, channel: usize) -> f32 {
        self.voltages.get(channel).copied().unwrap_or(0.0)
    }

    /// Returns the voltage for `channel`, broadcasting a mono signal.
    #[inline]
    pub fn poly_voltage(&self, channel: usize) -> f32 {
        if self.channels == 1 {
            self.voltages[0]
        } else {
            self.voltage_at(channel)
        }
    }

    /// Sets the voltage on channel 0.
    #[inline]
    pub fn set_voltage(&mut self, voltage: f32) {
        self.voltages[0] = voltage;
    }

    /// Sets the voltage on a specific channel. Out-of-range channels are ignored.
    #[inline]
    pub fn set_voltage_at(&mut self, channel: usize, voltage: f32) {
        if let Some(v) = self.voltages.get_mut(channel) {
            *v = voltage;
        }
    }

    /// Returns the active voltages.
    pub fn voltages(&self) -> &[f32] {
        &self.voltages[..self.channels]
    }
}

impl Default for PolySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder read for ports a frame does not have.
pub static UNPATCHED: PolySignal = PolySignal::new();

/// Input and output port state for one module, indexed by port order.
#[derive(Clone, Debug, Default)]
pub struct PortFrame {
    pub inputs: Vec<PolySignal>,
    pub outputs: Vec<PolySignal>,
}

impl PortFrame {
    /// Creates a frame with the given number of input and output ports.
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            inputs: vec![PolySignal::new(); num_inputs],
            outputs: vec![PolySignal::new(); num_outputs],
        }
    }

    /// Returns an input port, or an unpatched placeholder if the index is out of range.
    pub fn input(&self, index: usize) -> &PolySignal {
        self.inputs.get(index).unwrap_or(&UNPATCHED)
    }

    /// Returns an output port, or `None` if the index is out of range.
    pub fn output_mut(&mut self, index: usize) -> Option<&mut PolySignal> {
        self.outputs.get_mut(index)
    }

    /// Returns true if the output at `index` is patched.
    pub fn output_connected(&self, index: usize) -> bool {
        self.outputs.get(index).map_or(false, |p| p.is_connected())
    }
}
