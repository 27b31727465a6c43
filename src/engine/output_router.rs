//! Shared polyphonic bus and its channel allocator.
//!
//! The router owns the sixteen-channel CV/gate/retrigger bus and the table of
//! which node occupies which channel. Nodes only ever request or release
//! channels through the operations here.

use tracing::debug;

use super::node::NodeId;
use super::{NODE_COUNT, RETRIGGER_PULSE};
use crate::dsp::{PolySignal, PulseTimer, MAX_CHANNELS};

/// Voltage written to gate and retrigger outputs while high.
const GATE_VOLTAGE: f32 = 10.0;

/// Base of the exponential gate-length control.
pub const GATE_LENGTH_BASE: f32 = 11.0;

/// Rule for choosing which bus channel a firing node receives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllocationPolicy {
    /// Round-robin starting after the last assigned channel.
    Rotate,
    /// Lowest free channel; the highest channel is stolen when saturated.
    #[default]
    Reset,
    /// Each node always uses the channel matching its id.
    Fixed,
}

impl AllocationPolicy {
    pub const ALL: [AllocationPolicy; 3] = [
        AllocationPolicy::Rotate,
        AllocationPolicy::Reset,
        AllocationPolicy::Fixed,
    ];

    /// Returns the persisted integer form.
    pub fn index(self) -> i64 {
        match self {
            AllocationPolicy::Rotate => 0,
            AllocationPolicy::Reset => 1,
            AllocationPolicy::Fixed => 2,
        }
    }

    /// Parses the persisted integer form.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            AllocationPolicy::Rotate => "Rotate",
            AllocationPolicy::Reset => "Reset",
            AllocationPolicy::Fixed => "Fixed",
        }
    }
}

/// How long a bus gate stays open once a node fires onto it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GateMode {
    /// Open for the duration set by the gate-length control.
    #[default]
    Timed,
    /// Open while the owning node's trigger inputs stay high.
    Follow,
}

impl GateMode {
    pub const LABELS: &'static [&'static str] = &["Timed", "Follow"];

    /// Converts a choice parameter value into a mode.
    pub fn from_param(value: f32) -> Self {
        if value >= 0.5 {
            GateMode::Follow
        } else {
            GateMode::Timed
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BusChannel {
    owner: Option<NodeId>,
    /// Timed gate; only consulted in [`GateMode::Timed`].
    gate: PulseTimer,
    /// Set on assignment, cleared on release; only consulted in [`GateMode::Follow`].
    held: bool,
    retrigger: PulseTimer,
}

impl BusChannel {
    fn clear(&mut self) {
        self.owner = None;
        self.gate.reset();
        self.held = false;
    }
}

/// The shared bus: channel table, allocation policy and gate timing.
#[derive(Clone, Debug)]
pub struct OutputRouter {
    channel_count: usize,
    policy: AllocationPolicy,
    /// Last channel assigned under [`AllocationPolicy::Rotate`].
    rotate_cursor: Option<usize>,
    channels: [BusChannel; MAX_CHANNELS],
    gate_mode: GateMode,
    /// Gate-length knob, 0..1.
    gate_knob: f32,
    /// Per-channel multiplier from the gate-length input.
    gate_scale: [f32; MAX_CHANNELS],
    cv_range: (f32, f32),
}

impl OutputRouter {
    /// Channel count a freshly constructed router uses.
    pub const DEFAULT_CHANNELS: usize = MAX_CHANNELS;
    /// Default gate-length knob position (~0.5 s).
    pub const DEFAULT_GATE_KNOB: f32 = 0.169_092_08;

    pub fn new() -> Self {
        Self {
            channel_count: Self::DEFAULT_CHANNELS,
            policy: AllocationPolicy::default(),
            rotate_cursor: None,
            channels: [BusChannel::default(); MAX_CHANNELS],
            gate_mode: GateMode::default(),
            gate_knob: Self::DEFAULT_GATE_KNOB,
            gate_scale: [1.0; MAX_CHANNELS],
            cv_range: Self::cv_range_for(true, 1.0),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn gate_mode(&self) -> GateMode {
        self.gate_mode
    }

    pub fn rotate_cursor(&self) -> Option<usize> {
        self.rotate_cursor
    }

    /// The CV range computed on the last `process` call.
    pub fn cv_range(&self) -> (f32, f32) {
        self.cv_range
    }

    /// Sets the polyphony, clamped to 1..=16. Channels at or above the new
    /// count are closed.
    pub fn set_channel_count(&mut self, count: usize) {
        let count = count.clamp(1, MAX_CHANNELS);
        if count != self.channel_count {
            debug!(from = self.channel_count, to = count, "bus channel count changed");
        }
        self.channel_count = count;
        if self.policy == AllocationPolicy::Rotate
            && self.rotate_cursor.map_or(false, |c| c >= count)
        {
            self.rotate_cursor = None;
        }
        for ch in count..MAX_CHANNELS {
            self.close_channel(ch);
        }
    }

    /// Switches allocation policy. The rotate cursor always starts over.
    pub fn set_allocation_policy(&mut self, policy: AllocationPolicy) {
        if policy != self.policy {
            debug!(from = self.policy.name(), to = policy.name(), "allocation policy changed");
        }
        self.policy = policy;
        self.rotate_cursor = None;
    }

    pub fn set_gate_mode(&mut self, mode: GateMode) {
        self.gate_mode = mode;
    }

    /// Updates the gate-length control from its knob and optional
    /// polyphonic input. A mono input scales every channel; a poly input
    /// scales each channel by its own voltage; unpatched channels use 1.
    pub fn set_gate_length(&mut self, knob: f32, input: &PolySignal) {
        self.gate_knob = knob;
        let channels = input.channels();
        for (ch, scale) in self.gate_scale.iter_mut().enumerate() {
            *scale = if channels == 1 || ch < channels {
                input.poly_voltage(ch) / 10.0
            } else {
                1.0
            };
        }
    }

    /// Gate duration in seconds for a channel: `(11^knob - 1) * scale`, floored at zero.
    pub fn gate_length(&self, channel: usize) -> f32 {
        let base = GATE_LENGTH_BASE.powf(self.gate_knob) - 1.0;
        let scale = self.gate_scale.get(channel).copied().unwrap_or(1.0);
        (base * scale).max(0.0)
    }

    /// Returns the node occupying a channel.
    pub fn owner(&self, channel: usize) -> Option<NodeId> {
        self.channels.get(channel).and_then(|c| c.owner)
    }

    /// Returns the channel a node occupies.
    pub fn channel_of(&self, node: NodeId) -> Option<usize> {
        self.channels.iter().position(|c| c.owner == Some(node))
    }

    /// Returns true while a channel's gate is asserted.
    pub fn is_gating(&self, channel: usize) -> bool {
        self.channels.get(channel).map_or(false, |c| {
            c.owner.is_some()
                && match self.gate_mode {
                    GateMode::Timed => c.gate.is_active(),
                    GateMode::Follow => c.held,
                }
        })
    }

    /// Assigns a channel to a firing node, opens its gate and fires a
    /// retrigger pulse.
    ///
    /// Any channel the node already owns is released first, and whichever
    /// node occupied the target channel loses it. Returns `None` only when
    /// the fixed policy maps the node beyond the configured channel count.
    pub fn play_node(&mut self, node: NodeId) -> Option<usize> {
        self.release_node(node);
        let ch = self.allocate(node)?;
        self.close_channel(ch);

        let gate_length = self.gate_length(ch);
        let channel = &mut self.channels[ch];
        channel.owner = Some(node);
        channel.held = true;
        channel.gate.trigger(gate_length);
        channel.retrigger.trigger(RETRIGGER_PULSE);
        Some(ch)
    }

    /// Zeroes a channel's gate and clears its owner. A no-op on an empty
    /// or out-of-range channel.
    pub fn close_channel(&mut self, channel: usize) {
        if let Some(c) = self.channels.get_mut(channel) {
            c.clear();
        }
    }

    /// Releases whatever channel a node occupies.
    pub fn release_node(&mut self, node: NodeId) {
        for c in self.channels.iter_mut().filter(|c| c.owner == Some(node)) {
            c.clear();
        }
    }

    /// Picks the target channel for a firing node.
    fn allocate(&mut self, node: NodeId) -> Option<usize> {
        let count = self.channel_count;
        if count == 1 {
            return Some(0);
        }

        match self.policy {
            AllocationPolicy::Rotate => {
                let mut cursor = self.rotate_cursor;
                for _ in 0..count {
                    let next = cursor.map_or(0, |c| (c + 1) % count);
                    cursor = Some(next);
                    if self.channels[next].owner.is_none() {
                        self.rotate_cursor = cursor;
                        return Some(next);
                    }
                }
                // Saturated: step once more past the scan and steal.
                let stolen = cursor.map_or(0, |c| (c + 1) % count);
                self.rotate_cursor = Some(stolen);
                Some(stolen)
            }
            AllocationPolicy::Reset => Some(
                self.channels[..count]
                    .iter()
                    .position(|c| c.owner.is_none())
                    .unwrap_or(count - 1),
            ),
            AllocationPolicy::Fixed => (node < count).then_some(node),
        }
    }

    /// Maps a normalized value onto a CV range.
    pub fn cv_range_for(bipolar: bool, attenuversion: f32) -> (f32, f32) {
        if bipolar {
            (-5.0 * attenuversion, 5.0 * attenuversion)
        } else {
            (0.0, 10.0 * attenuversion)
        }
    }

    /// Advances one sample and writes the bus outputs.
    ///
    /// `values` holds every node's held value, indexed by node id. Channels
    /// whose gate has ended are closed here.
    pub fn process(
        &mut self,
        dt: f32,
        bipolar: bool,
        attenuversion: f32,
        values: &[f32; NODE_COUNT],
        bus: BusOutputs<'_>,
    ) {
        self.cv_range = Self::cv_range_for(bipolar, attenuversion);
        let (cv_min, cv_max) = self.cv_range;

        let count = self.channel_count;
        bus.cv.set_channels(count);
        bus.gate.set_channels(count);
        bus.retrig.set_channels(count);

        for ch in 0..count {
            let retrig_high = self.channels[ch].retrigger.process(dt);
            bus.retrig
                .set_voltage_at(ch, if retrig_high { GATE_VOLTAGE } else { 0.0 });

            let timed_active = self.channels[ch].gate.process(dt);
            let open = match self.gate_mode {
                GateMode::Timed => timed_active,
                GateMode::Follow => self.channels[ch].held,
            };

            let owner = self.channels[ch].owner;
            match owner {
                Some(node) if open => {
                    let value = values.get(node).copied().unwrap_or(0.0);
                    bus.cv.set_voltage_at(ch, cv_min + value * (cv_max - cv_min));
                    bus.gate.set_voltage_at(ch, GATE_VOLTAGE);
                }
                _ => {
                    self.close_channel(ch);
                    bus.gate.set_voltage_at(ch, 0.0);
                }
            }
        }
    }

    /// Closes every channel and forgets the rotate position.
    pub fn reset(&mut self) {
        for c in &mut self.channels {
            c.clear();
            c.retrigger.reset();
        }
        self.rotate_cursor = None;
    }
}

impl Default for OutputRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// The three polyphonic bus outputs.
pub struct BusOutputs<'a> {
    pub cv: &'a mut PolySignal,
    pub gate: &'a mut PolySignal,
    pub retrig: &'a mut PolySignal,
}
