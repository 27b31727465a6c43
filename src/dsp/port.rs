//! Port definitions for DSP modules.
//!
//! Ports are the jacks on a module where cables carry signals in and out.

use super::SignalType;

/// Direction of a port on a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// Returns a human-readable name for the port direction.
    pub fn name(&self) -> &'static str {
        match self {
            PortDirection::Input => "Input",
            PortDirection::Output => "Output",
        }
    }
}

/// Definition of a port on a DSP module.
///
/// Each port has a unique ID within the module, a display name,
/// a direction (input/output), and a signal type.
#[derive(Clone, Debug)]
pub struct PortDefinition {
    /// Unique identifier for this port within the module.
    pub id: String,
    /// Human-readable name displayed in the UI.
    pub name: String,
    pub direction: PortDirection,
    pub signal_type: SignalType,
}

impl PortDefinition {
    /// Creates a new input port definition.
    pub fn input(id: impl Into<String>, name: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Input,
            signal_type,
        }
    }

    /// Creates a new output port definition.
    pub fn output(id: impl Into<String>, name: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Output,
            signal_type,
        }
    }

    /// Returns true if this is an input port.
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Returns true if this is an output port.
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}
