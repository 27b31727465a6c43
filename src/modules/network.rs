//! Network module.
//!
//! Sixteen routing nodes sharing one polyphonic bus. Each node forwards the
//! triggers it receives to its four local outputs in turn, with the bus as
//! a fifth stop in the cycle. A bus stop claims a channel, opens its gate
//! and maps the node's value onto the CV output.

use tracing::{debug, warn};

use crate::dsp::{
    DspModule, EdgeDetector, ModuleCategory, ModuleError, ModuleInfo, ParameterDefinition,
    ParameterDisplay, PolySignal, PortDefinition, PortFrame, ProcessContext, SignalType,
    MAX_CHANNELS, UNPATCHED,
};
use crate::engine::output_router::GATE_LENGTH_BASE;
use crate::engine::{
    AllocationPolicy, BusOutputs, Destination, ExpanderBridge, ExpanderMessage, GateMode, Node,
    NodeInputs, OutputRouter, Side, NODE_COUNT, NODE_INPUTS, NODE_OUTPUTS,
};
use crate::persistence::NetworkSnapshot;

use super::network_expander::NetworkExpander;

/// Number of reset trigger inputs.
pub const RESET_INPUTS: usize = 6;

/// Nodes that have a bypass control, in bypass-index order.
pub const BYPASSABLE_NODES: [usize; 2] = [0, 8];

/// The trigger-routing network.
///
/// # Ports
///
/// **Inputs:**
/// - **trig_N_K** (Trigger, poly): two trigger inputs per node.
/// - **Attenuversion** (Control): overrides the attenuversion knob, ±10 V.
/// - **Gate Length** (Control, poly): scales the bus gate length, 10 V = 1x.
/// - **Reset 0-5** (Trigger): any rising edge resets every node at its next fire.
///
/// **Outputs:**
/// - **out_N_K** (Trigger): four local trigger outputs per node.
/// - **CV**, **Gate**, **Retrig** (poly): the shared bus.
///
/// # Parameters
///
/// Per-node values, two bypass toggles (nodes 0 and 8), attenuversion,
/// bipolar, gate length, reset and gate mode.
pub struct Network {
    nodes: Vec<Node>,
    router: OutputRouter,
    /// Bridges to an expander on the left and right side.
    bridges: [ExpanderBridge; 2],
    reset_triggers: [EdgeDetector; RESET_INPUTS],
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl Network {
    pub const ID: &'static str = "route.network";

    /// Parameter index constants.
    pub const PARAM_VALUE: usize = 0;
    pub const PARAM_BYPASS: usize = Self::PARAM_VALUE + NODE_COUNT;
    pub const PARAM_ATTENUVERSION: usize = Self::PARAM_BYPASS + BYPASSABLE_NODES.len();
    pub const PARAM_BIPOLAR: usize = Self::PARAM_ATTENUVERSION + 1;
    pub const PARAM_GATE_LENGTH: usize = Self::PARAM_BIPOLAR + 1;
    pub const PARAM_RESET: usize = Self::PARAM_GATE_LENGTH + 1;
    pub const PARAM_GATE_MODE: usize = Self::PARAM_RESET + 1;

    /// Input port index constants.
    pub const INPUT_TRIG: usize = 0;
    pub const INPUT_ATTENUVERSION: usize = Self::INPUT_TRIG + NODE_COUNT * NODE_INPUTS;
    pub const INPUT_GATE_LENGTH: usize = Self::INPUT_ATTENUVERSION + 1;
    pub const INPUT_RESET: usize = Self::INPUT_GATE_LENGTH + 1;

    /// Output port index constants.
    pub const OUTPUT_TRIG: usize = 0;
    pub const OUTPUT_CV: usize = Self::OUTPUT_TRIG + NODE_COUNT * NODE_OUTPUTS;
    pub const OUTPUT_GATE: usize = Self::OUTPUT_CV + 1;
    pub const OUTPUT_RETRIG: usize = Self::OUTPUT_GATE + 1;

    /// Creates a new network with every node at its initial position.
    pub fn new() -> Self {
        let mut ports = Vec::with_capacity(NODE_COUNT * (NODE_INPUTS + NODE_OUTPUTS) + 11);
        for node in 0..NODE_COUNT {
            for k in 0..NODE_INPUTS {
                ports.push(PortDefinition::input(
                    format!("trig_{}_{}", node, k),
                    format!("Node {} trigger {}", node, k),
                    SignalType::Trigger,
                ));
            }
        }
        ports.push(PortDefinition::input("attenuversion", "Attenuversion", SignalType::Control));
        ports.push(PortDefinition::input("gate_length", "Gate Length", SignalType::Control));
        for k in 0..RESET_INPUTS {
            ports.push(PortDefinition::input(
                format!("reset_{}", k),
                format!("Reset {}", k),
                SignalType::Trigger,
            ));
        }
        for node in 0..NODE_COUNT {
            for k in 0..NODE_OUTPUTS {
                ports.push(PortDefinition::output(
                    format!("out_{}_{}", node, k),
                    format!("Node {} out {}", node, k),
                    SignalType::Trigger,
                ));
            }
        }
        ports.push(PortDefinition::output("cv", "CV", SignalType::Control));
        ports.push(PortDefinition::output("gate", "Gate", SignalType::Gate));
        ports.push(PortDefinition::output("retrig", "Retrig", SignalType::Trigger));

        const VALUE_IDS: [&str; NODE_COUNT] = [
            "value_0", "value_1", "value_2", "value_3", "value_4", "value_5", "value_6",
            "value_7", "value_8", "value_9", "value_10", "value_11", "value_12", "value_13",
            "value_14", "value_15",
        ];
        const VALUE_NAMES: [&str; NODE_COUNT] = [
            "Value 0", "Value 1", "Value 2", "Value 3", "Value 4", "Value 5", "Value 6",
            "Value 7", "Value 8", "Value 9", "Value 10", "Value 11", "Value 12", "Value 13",
            "Value 14", "Value 15",
        ];

        let mut parameters: Vec<ParameterDefinition> = VALUE_IDS
            .iter()
            .zip(VALUE_NAMES)
            .map(|(&id, name)| ParameterDefinition::normalized(id, name, 0.5))
            .collect();
        parameters.push(ParameterDefinition::toggle("bypass_0", "Bypass node 0", false));
        parameters.push(ParameterDefinition::toggle("bypass_1", "Bypass node 8", false));
        parameters.push(ParameterDefinition::new(
            "attenuversion",
            "Attenuversion",
            -1.0,
            1.0,
            0.8,
            ParameterDisplay::linear(""),
        ));
        parameters.push(ParameterDefinition::toggle("bipolar", "Bipolar", true));
        parameters.push(ParameterDefinition::new(
            "gate_length",
            "Gate Length",
            0.0,
            1.0,
            OutputRouter::DEFAULT_GATE_KNOB,
            ParameterDisplay::exponential(GATE_LENGTH_BASE, "s"),
        ));
        parameters.push(ParameterDefinition::button("reset", "Reset"));
        parameters.push(ParameterDefinition::choice(
            "gate_mode",
            "Gate Mode",
            GateMode::LABELS,
            0,
        ));

        Self {
            nodes: (0..NODE_COUNT).map(Node::new).collect(),
            router: OutputRouter::new(),
            bridges: [ExpanderBridge::new(), ExpanderBridge::new()],
            reset_triggers: [EdgeDetector::new(); RESET_INPUTS],
            ports,
            parameters,
        }
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    /// Visual activity level of a node, 0..1.
    pub fn brightness(&self, node: usize) -> f32 {
        self.nodes.get(node).map_or(0.0, Node::brightness)
    }

    pub fn set_channel_count(&mut self, count: usize) {
        self.router.set_channel_count(count);
    }

    pub fn set_allocation_policy(&mut self, policy: AllocationPolicy) {
        self.router.set_allocation_policy(policy);
    }

    /// Releases a bus channel. The gate drops on the next step.
    pub fn close_channel(&mut self, channel: usize) {
        self.router.close_channel(channel);
    }

    pub fn bridge(&self, side: Side) -> &ExpanderBridge {
        &self.bridges[side.index()]
    }

    pub fn bridge_mut(&mut self, side: Side) -> &mut ExpanderBridge {
        &mut self.bridges[side.index()]
    }

    /// Swaps any expander buffers whose flip was requested this step.
    pub fn end_step(&mut self) {
        for bridge in &mut self.bridges {
            bridge.end_step();
        }
    }

    /// Marks every node for reset at its next firing boundary.
    pub fn request_reset(&mut self) {
        debug!("network reset requested");
        self.mark_reset();
    }

    fn mark_reset(&mut self) {
        for node in &mut self.nodes {
            node.request_reset();
        }
    }

    /// The message from the first side holding an expander, or an inert one.
    fn expander_message(&self) -> ExpanderMessage {
        self.bridges
            .iter()
            .find(|b| b.is_attached_to(NetworkExpander::ID))
            .map(|b| ExpanderMessage::decode(b.consumer()))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            channel_count: Some(self.router.channel_count() as i64),
            allocation_policy: Some(self.router.policy().index()),
            node_states: Some(self.nodes.iter().map(|n| n.state().to_state()).collect()),
        }
    }

    /// Applies a snapshot, clamping out-of-range values.
    pub fn restore(&mut self, snapshot: &NetworkSnapshot) {
        if let Some(count) = snapshot.channel_count {
            let clamped = count.clamp(1, MAX_CHANNELS as i64);
            if clamped != count {
                warn!(count, clamped, "channel count out of range");
            }
            self.router.set_channel_count(clamped as usize);
        }

        if let Some(index) = snapshot.allocation_policy {
            let policy = AllocationPolicy::from_index(index).unwrap_or_else(|| {
                warn!(index, "unknown allocation policy, using default");
                AllocationPolicy::default()
            });
            self.router.set_allocation_policy(policy);
        }

        if let Some(states) = &snapshot.node_states {
            if states.len() != NODE_COUNT {
                warn!(len = states.len(), "node state count mismatch");
            }
            for (node, &state) in self.nodes.iter_mut().zip(states) {
                node.set_state(Destination::from_state_clamped(state));
            }
        }

        debug!(
            channels = self.router.channel_count(),
            policy = self.router.policy().name(),
            "network state restored"
        );
    }

    fn node_bypass(node: usize, params: &[f32], message: &ExpanderMessage) -> bool {
        BYPASSABLE_NODES
            .iter()
            .position(|&n| n == node)
            .map_or(false, |k| {
                params.get(Self::PARAM_BYPASS + k).map_or(false, |v| *v >= 0.5) || message.bypass(k)
            })
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for Network {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: Network::ID,
            name: "Network",
            category: ModuleCategory::Routing,
            description: "Routes triggers through sixteen nodes onto local outputs and a polyphonic bus",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn prepare(&mut self, sample_rate: f32) {
        for node in &mut self.nodes {
            node.set_sample_rate(sample_rate);
        }
    }

    fn process(&mut self, io: &mut PortFrame, params: &[f32], context: &ProcessContext) {
        let param = |index: usize| params.get(index).copied().unwrap_or(0.0);
        let PortFrame { inputs, outputs } = io;
        let inputs: &[PolySignal] = inputs;
        let input = move |index: usize| inputs.get(index).unwrap_or(&UNPATCHED);

        let mut reset = param(Self::PARAM_RESET) >= 0.5;
        for (k, trigger) in self.reset_triggers.iter_mut().enumerate() {
            reset |= trigger.process(input(Self::INPUT_RESET + k).voltage());
        }
        if reset {
            self.mark_reset();
        }

        let message = self.expander_message();

        self.router
            .set_gate_mode(GateMode::from_param(param(Self::PARAM_GATE_MODE)));
        self.router.set_gate_length(
            param(Self::PARAM_GATE_LENGTH),
            input(Self::INPUT_GATE_LENGTH),
        );

        let dt = context.sample_time;
        for (id, node) in self.nodes.iter_mut().enumerate() {
            let trig = Self::INPUT_TRIG + id * NODE_INPUTS;
            let node_inputs = NodeInputs {
                triggers: [input(trig), input(trig + 1)],
                control: param(Self::PARAM_VALUE + id),
                external: message.value(id),
                hold: message.hold(),
                bypass: Self::node_bypass(id, params, &message),
            };
            let start = Self::OUTPUT_TRIG + id * NODE_OUTPUTS;
            if let Some(node_outputs) = outputs.get_mut(start..start + NODE_OUTPUTS) {
                node.process(node_inputs, node_outputs, &mut self.router, dt);
            }
        }

        let attenuversion_in = input(Self::INPUT_ATTENUVERSION);
        let attenuversion = if attenuversion_in.is_connected() {
            (attenuversion_in.voltage() / 10.0).clamp(-1.0, 1.0)
        } else {
            param(Self::PARAM_ATTENUVERSION)
        };
        let bipolar = param(Self::PARAM_BIPOLAR) >= 0.5;

        let mut values = [0.0; NODE_COUNT];
        for (value, node) in values.iter_mut().zip(&self.nodes) {
            *value = node.held_value();
        }

        if let Some([cv, gate, retrig]) = outputs.get_mut(Self::OUTPUT_CV..=Self::OUTPUT_RETRIG) {
            self.router.process(
                dt,
                bipolar,
                attenuversion,
                &values,
                BusOutputs { cv, gate, retrig },
            );
        }
    }

    fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        for trigger in &mut self.reset_triggers {
            trigger.reset();
        }
        self.router.reset();
    }

    fn serialize_state(&self) -> Option<Vec<u8>> {
        self.snapshot().to_json().ok().map(String::into_bytes)
    }

    fn deserialize_state(&mut self, data: &[u8]) -> Result<(), ModuleError> {
        let json = std::str::from_utf8(data)
            .map_err(|e| ModuleError::DeserializationFailed(e.to_string()))?;
        let snapshot = NetworkSnapshot::from_json(json)
            .map_err(|e| ModuleError::DeserializationFailed(e.to_string()))?;
        self.restore(&snapshot);
        Ok(())
    }
}
