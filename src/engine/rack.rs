//! A minimal synchronous host for a network and its expander.
//!
//! The rack owns the module instances together with their port frames and
//! parameter values, and steps them once per sample in a fixed order:
//! expander, network, buffer flip.

use tracing::info;

use crate::dsp::{DspModule, ModuleError, PortFrame, ProcessContext};
use crate::modules::{Network, NetworkExpander};

/// Which side of the network the expander sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// A hosted module with its port state and parameter values.
pub struct Slot<M: DspModule> {
    pub module: M,
    pub frame: PortFrame,
    /// Current parameter values, in definition order.
    pub params: Vec<f32>,
}

impl<M: DspModule> Slot<M> {
    fn new(mut module: M, sample_rate: f32) -> Self {
        module.prepare(sample_rate);
        let frame = module.port_frame();
        let params = module.default_params();
        Self {
            module,
            frame,
            params,
        }
    }

    /// Sets a parameter, clamped to its definition's range.
    pub fn set_param(&mut self, index: usize, value: f32) -> Result<(), ModuleError> {
        let definition = self.module.parameters().get(index).ok_or_else(|| {
            ModuleError::InvalidParameter {
                id: index.to_string(),
                reason: "no such parameter".to_string(),
            }
        })?;
        if !value.is_finite() {
            return Err(ModuleError::InvalidParameter {
                id: definition.id.to_string(),
                reason: format!("{} is not a finite value", value),
            });
        }
        self.params[index] = definition.clamp(value);
        Ok(())
    }

    pub fn param(&self, index: usize) -> Option<f32> {
        self.params.get(index).copied()
    }

    fn process(&mut self, context: &ProcessContext) {
        self.module.process(&mut self.frame, &self.params, context);
    }
}

/// One network with an optional expander beside it.
pub struct Rack {
    network: Slot<Network>,
    expander: Option<(Side, Slot<NetworkExpander>)>,
    context: ProcessContext,
}

impl Rack {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            network: Slot::new(Network::new(), sample_rate),
            expander: None,
            context: ProcessContext::new(sample_rate),
        }
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    pub fn network(&self) -> &Slot<Network> {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Slot<Network> {
        &mut self.network
    }

    pub fn expander(&self) -> Option<&Slot<NetworkExpander>> {
        self.expander.as_ref().map(|(_, slot)| slot)
    }

    pub fn expander_mut(&mut self) -> Option<&mut Slot<NetworkExpander>> {
        self.expander.as_mut().map(|(_, slot)| slot)
    }

    pub fn expander_side(&self) -> Option<Side> {
        self.expander.as_ref().map(|(side, _)| *side)
    }

    /// Places a fresh expander beside the network, replacing any existing one.
    pub fn attach_expander(&mut self, side: Side) {
        self.detach_expander();
        let slot = Slot::new(NetworkExpander::new(), self.context.sample_rate);
        self.network.module.bridge_mut(side).attach(NetworkExpander::ID);
        self.expander = Some((side, slot));
        info!(side = side.name(), "expander attached");
    }

    /// Removes the expander. Returns false if there was none.
    pub fn detach_expander(&mut self) -> bool {
        match self.expander.take() {
            Some((side, _)) => {
                self.network.module.bridge_mut(side).detach();
                info!(side = side.name(), "expander detached");
                true
            }
            None => false,
        }
    }

    /// Processes one sample period.
    pub fn step(&mut self) {
        if let Some((side, expander)) = &mut self.expander {
            expander.process(&self.context);
            expander
                .module
                .produce(self.network.module.bridge_mut(*side));
        }
        self.network.process(&self.context);
        self.network.module.end_step();
    }

    pub fn run(&mut self, samples: usize) {
        for _ in 0..samples {
            self.step();
        }
    }

    /// Updates the sample rate of every hosted module.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.context = ProcessContext::new(sample_rate);
        self.network.module.prepare(sample_rate);
        if let Some((_, expander)) = &mut self.expander {
            expander.module.prepare(sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Destination;

    #[test]
    fn test_attach_and_detach() {
        let mut rack = Rack::new(44100.0);
        assert!(!rack.detach_expander());

        rack.attach_expander(Side::Left);
        assert_eq!(rack.expander_side(), Some(Side::Left));
        assert!(rack
            .network()
            .module
            .bridge(Side::Left)
            .is_attached_to(NetworkExpander::ID));

        rack.attach_expander(Side::Right);
        assert_eq!(rack.expander_side(), Some(Side::Right));
        assert_eq!(rack.network().module.bridge(Side::Left).companion(), None);

        assert!(rack.detach_expander());
        assert!(rack.expander().is_none());
        assert_eq!(rack.network().module.bridge(Side::Right).companion(), None);
    }

    #[test]
    fn test_set_param_clamps() {
        let mut rack = Rack::new(44100.0);
        rack.network_mut()
            .set_param(Network::PARAM_ATTENUVERSION, 3.0)
            .unwrap();
        assert_eq!(rack.network().param(Network::PARAM_ATTENUVERSION), Some(1.0));

        assert!(matches!(
            rack.network_mut().set_param(999, 0.0),
            Err(ModuleError::InvalidParameter { .. })
        ));
        assert!(rack
            .network_mut()
            .set_param(Network::PARAM_VALUE, f32::NAN)
            .is_err());
    }

    #[test]
    fn test_expander_values_arrive_one_step_later() {
        let mut rack = Rack::new(44100.0);
        rack.attach_expander(Side::Right);
        if let Some(expander) = rack.expander_mut() {
            expander.frame.inputs[NetworkExpander::INPUT_CV + 2].connect(1);
            expander.frame.inputs[NetworkExpander::INPUT_CV + 2].set_voltage(8.0);
        }

        rack.step();
        let value = |rack: &Rack| rack.network().module.node(2).map(|n| n.held_value());
        assert_eq!(value(&rack), Some(0.5));

        rack.step();
        assert_eq!(value(&rack), Some(0.8));
    }

    #[test]
    fn test_detached_expander_stops_overriding() {
        let mut rack = Rack::new(44100.0);
        rack.attach_expander(Side::Left);
        if let Some(expander) = rack.expander_mut() {
            expander.frame.inputs[NetworkExpander::INPUT_CV].connect(1);
            expander.frame.inputs[NetworkExpander::INPUT_CV].set_voltage(2.0);
        }
        rack.run(2);
        assert_eq!(rack.network().module.node(0).map(|n| n.held_value()), Some(0.2));

        rack.detach_expander();
        rack.step();
        assert_eq!(rack.network().module.node(0).map(|n| n.held_value()), Some(0.5));
    }

    #[test]
    fn test_step_routes_trigger() {
        let mut rack = Rack::new(48000.0);
        let trig = Network::INPUT_TRIG;
        rack.network_mut().frame.inputs[trig].connect(1);
        rack.network_mut().frame.inputs[trig].set_voltage(10.0);
        rack.step();
        assert_eq!(
            rack.network().module.node(0).map(|n| n.state()),
            Some(Destination::Bus)
        );
        assert_eq!(
            rack.network().frame.outputs[Network::OUTPUT_GATE].voltage_at(0),
            10.0
        );
    }
}
