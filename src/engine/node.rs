//! A single routing node.
//!
//! Each node holds a value and a rotating destination. On every qualifying
//! trigger edge it closes out its current destination, advances to the next
//! usable one and either pulses a local output or hands the event to the
//! [`OutputRouter`].

use super::destination::Destination;
use super::output_router::{GateMode, OutputRouter};
use super::{NODE_INPUTS, NODE_OUTPUTS, SUPPRESS_WINDOW, TRIGGER_PULSE};
use crate::dsp::{PolyEdgeDetector, PolySignal, PulseTimer, SmoothedValue};

/// Stable node identity, 0..16. Also the fixed-policy channel.
pub type NodeId = usize;

/// Voltage of a local trigger pulse.
const PULSE_VOLTAGE: f32 = 10.0;

/// Result of a firing cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    /// The event went to the bus and was assigned this channel.
    Bus(usize),
    /// A trigger pulse was emitted on this local output.
    Local(usize),
    /// No destination qualified; nothing was emitted.
    Idle,
}

/// Per-step inputs a node reads.
#[derive(Clone, Copy, Debug)]
pub struct NodeInputs<'a> {
    pub triggers: [&'a PolySignal; NODE_INPUTS],
    /// The node's own value control, 0..1.
    pub control: f32,
    /// Value supplied by the expander, if any.
    pub external: Option<f32>,
    /// Sample & hold: the value is captured only when the node fires onto the bus.
    pub hold: bool,
    pub bypass: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    state: Destination,
    reset_pending: bool,
    held_value: f32,
    bypass: bool,
    triggers: [PolyEdgeDetector; NODE_INPUTS],
    out_pulses: [PulseTimer; NODE_OUTPUTS],
    since_fire: PulseTimer,
    brightness: SmoothedValue,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            state: Destination::INITIAL,
            reset_pending: false,
            held_value: 0.5,
            bypass: false,
            triggers: [PolyEdgeDetector::new(); NODE_INPUTS],
            out_pulses: [PulseTimer::new(); NODE_OUTPUTS],
            since_fire: PulseTimer::expired(),
            brightness: SmoothedValue::brightness(44100.0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The destination the node last fired to.
    pub fn state(&self) -> Destination {
        self.state
    }

    /// Restores the routing position, e.g. from a saved session.
    pub fn set_state(&mut self, state: Destination) {
        self.state = state;
    }

    /// The value the bus maps to CV while this node owns a channel.
    pub fn held_value(&self) -> f32 {
        self.held_value
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Visual feedback level, 0..1.
    pub fn brightness(&self) -> f32 {
        self.brightness.current()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.brightness.set_sample_rate(sample_rate);
    }

    /// Defers a reset to the node's next firing boundary, so a gate that is
    /// already open runs out normally.
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Returns the node to its constructed runtime state immediately.
    pub fn reset(&mut self) {
        self.state = Destination::INITIAL;
        self.reset_pending = false;
        for t in &mut self.triggers {
            t.reset();
        }
        for p in &mut self.out_pulses {
            p.reset();
        }
        self.since_fire = PulseTimer::expired();
        self.brightness.set_immediate(0.0);
    }

    /// Updates the bypass flag. Turning bypass on releases any bus channel
    /// the node holds.
    pub fn set_bypass(&mut self, bypass: bool, router: &mut OutputRouter) {
        if bypass && !self.bypass && router.channel_of(self.id).is_some() {
            router.release_node(self.id);
        }
        self.bypass = bypass;
    }

    /// Advances one sample. Returns the firing outcome if a trigger was accepted.
    ///
    /// `outputs` are this node's local trigger outputs; their connected
    /// flags decide which local destinations are usable.
    pub fn process(
        &mut self,
        inputs: NodeInputs<'_>,
        outputs: &mut [PolySignal],
        router: &mut OutputRouter,
        dt: f32,
    ) -> Option<NodeEvent> {
        self.set_bypass(inputs.bypass, router);

        let control = match (inputs.hold, inputs.external) {
            (false, Some(v)) => v,
            _ => inputs.control,
        };
        if !inputs.hold {
            self.held_value = control;
        }

        for (pulse, out) in self.out_pulses.iter_mut().zip(outputs.iter_mut()) {
            let high = pulse.process(dt);
            out.set_channels(1);
            out.set_voltage(if high { PULSE_VOLTAGE } else { 0.0 });
        }

        self.since_fire.process(dt);
        let mut triggered = false;
        for (detector, port) in self.triggers.iter_mut().zip(inputs.triggers) {
            triggered |= detector.process(port);
        }

        let event = if triggered && self.since_fire.elapsed() >= SUPPRESS_WINDOW {
            let held = if inputs.hold {
                Some(inputs.external.unwrap_or(control))
            } else {
                None
            };
            Some(self.fire(outputs, router, held))
        } else {
            None
        };

        if router.gate_mode() == GateMode::Follow
            && router.channel_of(self.id).is_some()
            && !self.any_input_high()
        {
            router.release_node(self.id);
        }

        let active = router.channel_of(self.id).is_some()
            || self.out_pulses.iter().any(PulseTimer::is_active);
        self.brightness.set_target(if active { 1.0 } else { 0.0 });
        self.brightness.next();

        event
    }

    /// Returns true while any trigger input channel is latched high.
    pub fn any_input_high(&self) -> bool {
        self.triggers.iter().any(PolyEdgeDetector::any_high)
    }

    /// Runs one firing cycle.
    ///
    /// `sampled` is the value to capture when landing on the bus in sample &
    /// hold mode.
    fn fire(
        &mut self,
        outputs: &mut [PolySignal],
        router: &mut OutputRouter,
        sampled: Option<f32>,
    ) -> NodeEvent {
        self.since_fire.reset();

        match self.state {
            Destination::Bus => {
                // A timed gate is left to run out on its own.
                if router.gate_mode() == GateMode::Follow {
                    router.release_node(self.id);
                }
            }
            Destination::Local(i) => {
                if let Some(pulse) = self.out_pulses.get_mut(i) {
                    pulse.reset();
                }
                if let Some(out) = outputs.get_mut(i) {
                    out.set_voltage(0.0);
                }
            }
        }

        if self.reset_pending {
            self.state = Destination::INITIAL;
            self.reset_pending = false;
        }

        for _ in 0..=Destination::COUNT {
            self.state = self.state.next();
            match self.state {
                Destination::Bus if !self.bypass => {
                    if let Some(value) = sampled {
                        self.held_value = value;
                    }
                    return match router.play_node(self.id) {
                        Some(ch) => {
                            self.brightness.set_target(1.0);
                            NodeEvent::Bus(ch)
                        }
                        None => NodeEvent::Idle,
                    };
                }
                Destination::Local(i) if outputs.get(i).map_or(false, |o| o.is_connected()) => {
                    self.out_pulses[i].trigger(TRIGGER_PULSE);
                    return NodeEvent::Local(i);
                }
                _ => {}
            }
        }

        // Bypassed with every local output unpatched: park on the bus slot.
        self.state = Destination::Bus;
        NodeEvent::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::output_router::AllocationPolicy;

    const DT: f32 = 1.0 / 44100.0;

    struct Harness {
        node: Node,
        router: OutputRouter,
        inputs: [PolySignal; NODE_INPUTS],
        outputs: [PolySignal; NODE_OUTPUTS],
        bypass: bool,
        hold: bool,
        external: Option<f32>,
        control: f32,
    }

    impl Harness {
        fn new(id: NodeId) -> Self {
            let mut inputs = [PolySignal::new(); NODE_INPUTS];
            inputs[0].connect(1);
            Self {
                node: Node::new(id),
                router: OutputRouter::new(),
                inputs,
                outputs: [PolySignal::new(); NODE_OUTPUTS],
                bypass: false,
                hold: false,
                external: None,
                control: 0.5,
            }
        }

        fn connect_outputs(&mut self, which: &[usize]) {
            for &i in which {
                self.outputs[i].connect(1);
            }
        }

        fn step(&mut self, voltage: f32) -> Option<NodeEvent> {
            self.inputs[0].set_voltage(voltage);
            let [a, b] = &self.inputs;
            let inputs = NodeInputs {
                triggers: [a, b],
                control: self.control,
                external: self.external,
                hold: self.hold,
                bypass: self.bypass,
            };
            self.node
                .process(inputs, &mut self.outputs, &mut self.router, DT)
        }

        /// One rising edge followed by enough low samples to clear the
        /// suppression window.
        fn pulse(&mut self) -> Option<NodeEvent> {
            let event = self.step(10.0);
            for _ in 0..100 {
                self.step(0.0);
            }
            event
        }
    }

    #[test]
    fn test_first_fire_goes_to_bus() {
        let mut h = Harness::new(2);
        h.connect_outputs(&[0, 1, 2, 3]);
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
        assert_eq!(h.node.state(), Destination::Bus);
    }

    #[test]
    fn test_cycles_through_connected_outputs() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0, 1, 2, 3]);
        let events: Vec<_> = (0..6).map(|_| h.pulse()).collect();
        assert_eq!(
            events,
            vec![
                Some(NodeEvent::Bus(0)),
                Some(NodeEvent::Local(0)),
                Some(NodeEvent::Local(1)),
                Some(NodeEvent::Local(2)),
                Some(NodeEvent::Local(3)),
                Some(NodeEvent::Bus(0)),
            ]
        );
    }

    #[test]
    fn test_skips_disconnected_outputs() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[2]);
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
        assert_eq!(h.pulse(), Some(NodeEvent::Local(2)));
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
    }

    #[test]
    fn test_connectedness_queried_each_fire() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0]);
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
        h.outputs[0].disconnect();
        h.outputs[1].connect(1);
        assert_eq!(h.pulse(), Some(NodeEvent::Local(1)));
    }

    #[test]
    fn test_local_pulse_is_emitted() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0]);
        h.pulse();
        h.step(10.0);
        // The pulse becomes visible on the step after the fire
        h.step(10.0);
        assert_eq!(h.outputs[0].voltage(), 10.0);
        for _ in 0..100 {
            h.step(0.0);
        }
        assert_eq!(h.outputs[0].voltage(), 0.0);
    }

    #[test]
    fn test_bypass_skips_bus() {
        let mut h = Harness::new(0);
        h.bypass = true;
        h.connect_outputs(&[1, 3]);
        assert_eq!(h.pulse(), Some(NodeEvent::Local(1)));
        assert_eq!(h.pulse(), Some(NodeEvent::Local(3)));
        assert_eq!(h.pulse(), Some(NodeEvent::Local(1)));
        assert_eq!(h.router.channel_of(0), None);
    }

    #[test]
    fn test_bypassed_with_nothing_connected_is_idle() {
        let mut h = Harness::new(0);
        h.bypass = true;
        assert_eq!(h.pulse(), Some(NodeEvent::Idle));
        assert_eq!(h.node.state(), Destination::Bus);
        assert_eq!(h.pulse(), Some(NodeEvent::Idle));
    }

    #[test]
    fn test_bypass_on_releases_channel_same_step() {
        let mut h = Harness::new(5);
        h.router.set_allocation_policy(AllocationPolicy::Fixed);
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(5)));
        assert_eq!(h.router.owner(5), Some(5));

        h.bypass = true;
        h.step(0.0);
        assert_eq!(h.router.owner(5), None);
    }

    #[test]
    fn test_chatter_inside_suppression_window_is_ignored() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0, 1, 2, 3]);
        assert_eq!(h.step(10.0), Some(NodeEvent::Bus(0)));

        // Bounce back low and high again 0.5 ms later
        let half_ms = (0.0005 / DT) as usize;
        for _ in 0..half_ms - 1 {
            h.step(0.0);
        }
        assert_eq!(h.step(10.0), None);
        assert_eq!(h.node.state(), Destination::Bus);

        // After the window a fresh edge is accepted
        for _ in 0..100 {
            h.step(0.0);
        }
        assert_eq!(h.step(10.0), Some(NodeEvent::Local(0)));
    }

    #[test]
    fn test_deferred_reset_applies_at_next_fire() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0, 1, 2, 3]);
        h.pulse();
        h.pulse();
        h.pulse();
        assert_eq!(h.node.state(), Destination::Local(1));

        h.node.request_reset();
        assert!(h.node.is_reset_pending());
        // Nothing moves until the next trigger
        h.step(0.0);
        assert_eq!(h.node.state(), Destination::Local(1));

        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
        assert!(!h.node.is_reset_pending());
    }

    #[test]
    fn test_deferred_reset_keeps_timed_gate() {
        let mut h = Harness::new(0);
        h.pulse();
        assert_eq!(h.router.owner(0), Some(0));
        h.node.request_reset();
        h.step(0.0);
        assert_eq!(h.router.owner(0), Some(0));
    }

    #[test]
    fn test_follow_mode_gate_tracks_input() {
        let mut h = Harness::new(3);
        h.router.set_gate_mode(GateMode::Follow);
        assert_eq!(h.step(10.0), Some(NodeEvent::Bus(0)));
        for _ in 0..500 {
            h.step(10.0);
        }
        assert_eq!(h.router.owner(0), Some(3));

        h.step(0.0);
        assert_eq!(h.router.owner(0), None);
    }

    #[test]
    fn test_external_value_overrides_control() {
        let mut h = Harness::new(0);
        h.external = Some(0.9);
        h.step(0.0);
        assert_eq!(h.node.held_value(), 0.9);

        h.external = None;
        h.step(0.0);
        assert_eq!(h.node.held_value(), 0.5);
    }

    #[test]
    fn test_hold_mode_samples_on_bus_fire() {
        let mut h = Harness::new(0);
        h.hold = true;
        h.external = Some(0.2);
        h.step(0.0);
        // Held value does not follow while holding
        assert_eq!(h.node.held_value(), 0.5);

        h.pulse();
        assert_eq!(h.node.held_value(), 0.2);

        h.external = Some(0.8);
        h.step(0.0);
        assert_eq!(h.node.held_value(), 0.2);
    }

    #[test]
    fn test_hold_mode_without_external_samples_control() {
        let mut h = Harness::new(0);
        h.hold = true;
        h.control = 0.3;
        h.pulse();
        assert_eq!(h.node.held_value(), 0.3);
        h.control = 0.6;
        h.step(0.0);
        assert_eq!(h.node.held_value(), 0.3);
    }

    #[test]
    fn test_brightness_feedback() {
        let mut h = Harness::new(0);
        assert_eq!(h.node.brightness(), 0.0);
        h.step(10.0);
        assert_eq!(h.node.brightness(), 1.0);
    }

    #[test]
    fn test_polyphonic_trigger_input() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0]);
        h.inputs[1].connect(4);
        h.inputs[1].set_voltage_at(3, 10.0);
        assert_eq!(h.step(0.0), Some(NodeEvent::Bus(0)));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut h = Harness::new(0);
        h.connect_outputs(&[0]);
        h.pulse();
        h.pulse();
        h.node.reset();
        assert_eq!(h.node.state(), Destination::INITIAL);
        assert_eq!(h.pulse(), Some(NodeEvent::Bus(0)));
    }
}
