//! Double-buffered message exchange between a module and its expander.
//!
//! The producing side writes into the producer slot during its step and asks
//! for a flip; the host swaps the slots at the end of the step, so the
//! consumer always reads a complete message from the previous step.

use super::NODE_COUNT;

/// Number of floats in one message.
pub const MESSAGE_LEN: usize = NODE_COUNT + 3;

/// Sentinel value meaning "no override for this node".
pub const NO_OVERRIDE: f32 = -1.0;

const BYPASS_OFFSET: usize = NODE_COUNT;
const HOLD_OFFSET: usize = NODE_COUNT + 2;

/// Voltage at or above which a bypass flag reads as set.
const BYPASS_THRESHOLD: f32 = 5.0;
const HOLD_THRESHOLD: f32 = 0.5;

/// One step's worth of expander data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpanderMessage {
    /// Per-node value in 0..1, or [`NO_OVERRIDE`].
    pub values: [f32; NODE_COUNT],
    /// Bypass flags for the two bypassable nodes, 0 V or 10 V.
    pub bypass: [f32; 2],
    /// Hold flag, 0 or 1.
    pub hold: f32,
}

impl ExpanderMessage {
    /// A message that changes nothing.
    pub const fn inert() -> Self {
        Self {
            values: [NO_OVERRIDE; NODE_COUNT],
            bypass: [0.0; 2],
            hold: 0.0,
        }
    }

    pub fn encode(&self) -> [f32; MESSAGE_LEN] {
        let mut buf = [0.0; MESSAGE_LEN];
        buf[..NODE_COUNT].copy_from_slice(&self.values);
        buf[BYPASS_OFFSET..HOLD_OFFSET].copy_from_slice(&self.bypass);
        buf[HOLD_OFFSET] = self.hold;
        buf
    }

    pub fn decode(buf: &[f32; MESSAGE_LEN]) -> Self {
        let mut values = [NO_OVERRIDE; NODE_COUNT];
        values.copy_from_slice(&buf[..NODE_COUNT]);
        Self {
            values,
            bypass: [buf[BYPASS_OFFSET], buf[BYPASS_OFFSET + 1]],
            hold: buf[HOLD_OFFSET],
        }
    }

    /// The override for a node, or `None` for the sentinel.
    pub fn value(&self, node: usize) -> Option<f32> {
        self.values
            .get(node)
            .copied()
            .filter(|v| *v >= 0.0)
            .map(|v| v.min(1.0))
    }

    pub fn bypass(&self, index: usize) -> bool {
        self.bypass
            .get(index)
            .map_or(false, |v| *v >= BYPASS_THRESHOLD)
    }

    pub fn hold(&self) -> bool {
        self.hold >= HOLD_THRESHOLD
    }
}

impl Default for ExpanderMessage {
    fn default() -> Self {
        Self::inert()
    }
}

/// A producer/consumer slot pair plus the flip request flag.
///
/// The bridge also remembers which module type sits on the other side, so
/// the consumer can ignore a neighbor that is not the expected companion.
#[derive(Clone, Debug)]
pub struct ExpanderBridge {
    producer: [f32; MESSAGE_LEN],
    consumer: [f32; MESSAGE_LEN],
    flip_requested: bool,
    companion: Option<&'static str>,
}

impl ExpanderBridge {
    pub fn new() -> Self {
        let inert = ExpanderMessage::inert().encode();
        Self {
            producer: inert,
            consumer: inert,
            flip_requested: false,
            companion: None,
        }
    }

    /// Records the neighbor's module id.
    pub fn attach(&mut self, module_id: &'static str) {
        self.companion = Some(module_id);
    }

    /// Forgets the neighbor and clears both slots.
    pub fn detach(&mut self) {
        *self = Self::new();
    }

    pub fn companion(&self) -> Option<&'static str> {
        self.companion
    }

    pub fn is_attached_to(&self, module_id: &str) -> bool {
        self.companion == Some(module_id)
    }

    /// The slot the producing side writes this step.
    pub fn producer_mut(&mut self) -> &mut [f32; MESSAGE_LEN] {
        &mut self.producer
    }

    /// The message completed on the previous step.
    pub fn consumer(&self) -> &[f32; MESSAGE_LEN] {
        &self.consumer
    }

    pub fn request_flip(&mut self) {
        self.flip_requested = true;
    }

    /// Swaps the slots if a flip was requested. Called by the host once all
    /// modules have stepped.
    pub fn end_step(&mut self) {
        if self.flip_requested {
            std::mem::swap(&mut self.producer, &mut self.consumer);
            self.flip_requested = false;
        }
    }
}

impl Default for ExpanderBridge {
    fn default() -> Self {
        Self::new()
    }
}
