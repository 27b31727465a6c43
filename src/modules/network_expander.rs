//! Network Expander module.
//!
//! Sits next to a [`Network`](super::Network) and feeds it per-node values,
//! the two bypass flags and the sample & hold switch.

use crate::dsp::{
    DspModule, EdgeDetector, ModuleCategory, ModuleInfo, ParameterDefinition, PortDefinition,
    PortFrame, ProcessContext, SignalType,
};
use crate::engine::{ExpanderBridge, ExpanderMessage, NODE_COUNT, NO_OVERRIDE};

/// The network's companion expander.
///
/// # Ports
///
/// **Inputs:**
/// - **CV 0-15** (Control, poly): node values, 10 V = 1.0. An unpatched input
///   takes the next channel of the nearest patched input above it.
/// - **Bypass 0-1** (Gate): bypass nodes 0 and 8 while high.
/// - **Hold** (Gate): overrides the hold switch while patched.
///
/// # Parameters
///
/// - **Hold**: sample & hold. Node values are captured only when a node
///   fires onto the bus.
pub struct NetworkExpander {
    bypass_triggers: [EdgeDetector; 2],
    hold_trigger: EdgeDetector,
    /// The message built on the last step.
    message: ExpanderMessage,
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl NetworkExpander {
    pub const ID: &'static str = "route.network_expander";

    /// Parameter index constants.
    pub const PARAM_HOLD: usize = 0;

    /// Input port index constants.
    pub const INPUT_CV: usize = 0;
    pub const INPUT_BYPASS: usize = Self::INPUT_CV + NODE_COUNT;
    pub const INPUT_HOLD: usize = Self::INPUT_BYPASS + 2;

    pub fn new() -> Self {
        let mut ports: Vec<PortDefinition> = (0..NODE_COUNT)
            .map(|node| {
                PortDefinition::input(
                    format!("cv_{}", node),
                    format!("CV {}", node),
                    SignalType::Control,
                )
            })
            .collect();
        ports.push(PortDefinition::input("bypass_0", "Bypass 0", SignalType::Gate));
        ports.push(PortDefinition::input("bypass_1", "Bypass 1", SignalType::Gate));
        ports.push(PortDefinition::input("hold", "Hold", SignalType::Gate));

        Self {
            bypass_triggers: [EdgeDetector::new(); 2],
            hold_trigger: EdgeDetector::new(),
            message: ExpanderMessage::inert(),
            ports,
            parameters: vec![ParameterDefinition::toggle("hold", "Sample & Hold", false)],
        }
    }

    /// The message built on the last step.
    pub fn message(&self) -> &ExpanderMessage {
        &self.message
    }

    /// Writes the current message into a bridge's producer slot and asks
    /// for a flip at the end of the step.
    pub fn produce(&self, bridge: &mut ExpanderBridge) {
        *bridge.producer_mut() = self.message.encode();
        bridge.request_flip();
    }

    /// Value for `node`: its own input, or the next channel of the closest
    /// patched input above it.
    fn node_value(io: &PortFrame, node: usize) -> f32 {
        let mut offset = 0;
        for source in (0..=node).rev() {
            let port = io.input(Self::INPUT_CV + source);
            if port.is_connected() {
                return if port.channels() > offset {
                    port.voltage_at(offset) / 10.0
                } else {
                    NO_OVERRIDE
                };
            }
            offset += 1;
        }
        NO_OVERRIDE
    }
}

impl Default for NetworkExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for NetworkExpander {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: NetworkExpander::ID,
            name: "Network Expander",
            category: ModuleCategory::Expander,
            description: "Per-node CV, bypass and sample & hold for an adjacent Network",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn prepare(&mut self, _sample_rate: f32) {}

    fn process(&mut self, io: &mut PortFrame, params: &[f32], _context: &ProcessContext) {
        for (k, trigger) in self.bypass_triggers.iter_mut().enumerate() {
            trigger.process(io.input(Self::INPUT_BYPASS + k).voltage());
        }

        let hold_in = io.input(Self::INPUT_HOLD);
        self.hold_trigger.process(hold_in.voltage());
        let hold = if hold_in.is_connected() {
            self.hold_trigger.is_high()
        } else {
            params.get(Self::PARAM_HOLD).map_or(false, |v| *v >= 0.5)
        };

        for (node, value) in self.message.values.iter_mut().enumerate() {
            *value = Self::node_value(io, node);
        }
        for (flag, trigger) in self.message.bypass.iter_mut().zip(&self.bypass_triggers) {
            *flag = if trigger.is_high() { 10.0 } else { 0.0 };
        }
        self.message.hold = if hold { 1.0 } else { 0.0 };
    }

    fn reset(&mut self) {
        for trigger in &mut self.bypass_triggers {
            trigger.reset();
        }
        self.hold_trigger.reset();
        self.message = ExpanderMessage::inert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(expander: &mut NetworkExpander, frame: &mut PortFrame, params: &[f32]) {
        expander.process(frame, params, &ProcessContext::default());
    }

    #[test]
    fn test_layout() {
        let expander = NetworkExpander::new();
        let frame = expander.port_frame();
        assert_eq!(frame.inputs.len(), 19);
        assert_eq!(frame.outputs.len(), 0);
        assert_eq!(expander.default_params(), vec![0.0]);
        assert_eq!(expander.info().id, "route.network_expander");
    }

    #[test]
    fn test_unpatched_sends_no_overrides() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        run(&mut expander, &mut frame, &[0.0]);
        assert!((0..NODE_COUNT).all(|n| expander.message().value(n).is_none()));
        assert!(!expander.message().hold());
    }

    #[test]
    fn test_mono_input_feeds_only_its_node() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        frame.inputs[3].connect(1);
        frame.inputs[3].set_voltage(5.0);
        run(&mut expander, &mut frame, &[0.0]);

        assert_eq!(expander.message().value(3), Some(0.5));
        assert_eq!(expander.message().value(4), None);
        assert_eq!(expander.message().value(2), None);
    }

    #[test]
    fn test_poly_input_spreads_downward() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        frame.inputs[0].connect(16);
        for ch in 0..16 {
            frame.inputs[0].set_voltage_at(ch, ch as f32 * 0.5);
        }
        // A patched input further down takes over from there
        frame.inputs[10].connect(2);
        frame.inputs[10].set_voltage_at(0, 9.0);
        frame.inputs[10].set_voltage_at(1, 8.0);
        run(&mut expander, &mut frame, &[0.0]);

        let msg = expander.message();
        assert_eq!(msg.value(0), Some(0.0));
        assert_eq!(msg.value(5), Some(0.25));
        assert_eq!(msg.value(9), Some(0.45));
        assert_eq!(msg.value(10), Some(0.9));
        assert_eq!(msg.value(11), Some(0.8));
        assert_eq!(msg.value(12), None);
    }

    #[test]
    fn test_bypass_inputs_use_hysteresis() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        frame.inputs[NetworkExpander::INPUT_BYPASS].connect(1);
        frame.inputs[NetworkExpander::INPUT_BYPASS].set_voltage(5.0);
        run(&mut expander, &mut frame, &[0.0]);
        assert!(expander.message().bypass(0));
        assert!(!expander.message().bypass(1));

        // Stays latched until the input falls below the low threshold
        frame.inputs[NetworkExpander::INPUT_BYPASS].set_voltage(1.0);
        run(&mut expander, &mut frame, &[0.0]);
        assert!(expander.message().bypass(0));

        frame.inputs[NetworkExpander::INPUT_BYPASS].set_voltage(0.0);
        run(&mut expander, &mut frame, &[0.0]);
        assert!(!expander.message().bypass(0));
    }

    #[test]
    fn test_hold_input_overrides_switch() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        run(&mut expander, &mut frame, &[1.0]);
        assert!(expander.message().hold());

        frame.inputs[NetworkExpander::INPUT_HOLD].connect(1);
        run(&mut expander, &mut frame, &[1.0]);
        assert!(!expander.message().hold());

        frame.inputs[NetworkExpander::INPUT_HOLD].set_voltage(10.0);
        run(&mut expander, &mut frame, &[0.0]);
        assert!(expander.message().hold());
    }

    #[test]
    fn test_produce_requests_flip() {
        let mut expander = NetworkExpander::new();
        let mut frame = expander.port_frame();
        frame.inputs[0].connect(1);
        frame.inputs[0].set_voltage(2.0);
        run(&mut expander, &mut frame, &[0.0]);

        let mut bridge = ExpanderBridge::new();
        expander.produce(&mut bridge);
        bridge.end_step();
        assert_eq!(ExpanderMessage::decode(bridge.consumer()).value(0), Some(0.2));
    }
}
