//! The core DspModule trait and supporting types.
//!
//! This module defines the interface that every module in the crate
//! implements, so a host can step them, persist them and recognize
//! neighbors by identity.

use super::context::ProcessContext;
use super::parameter::ParameterDefinition;
use super::port::{PortDefinition, PortDirection};
use super::signal::PortFrame;
use std::fmt;

/// Category of a DSP module, used for organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Modules that route triggers and voices.
    Routing,
    /// Companion modules that feed data to an adjacent module.
    Expander,
}

impl ModuleCategory {
    /// Returns a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Routing => "Routing",
            ModuleCategory::Expander => "Expander",
        }
    }
}

/// Static information about a DSP module.
#[derive(Clone, Debug)]
pub struct ModuleInfo {
    /// Unique identifier for the module type (e.g., "route.network").
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    pub category: ModuleCategory,
    /// A brief description of what the module does.
    pub description: &'static str,
}

/// Errors that can occur during module operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// Failed to deserialize module state.
    DeserializationFailed(String),
    /// Invalid parameter value.
    InvalidParameter { id: String, reason: String },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::DeserializationFailed(msg) => {
                write!(f, "Failed to deserialize module state: {}", msg)
            }
            ModuleError::InvalidParameter { id, reason } => {
                write!(f, "Invalid parameter '{}': {}", id, reason)
            }
        }
    }
}

impl std::error::Error for ModuleError {}

/// The core trait that all modules implement.
///
/// Modules are stepped once per sample. Each step they read their input
/// ports and the current parameter values and write their output ports.
///
/// # Real-time Constraints
///
/// `process` runs inside the audio callback and must not allocate, lock,
/// log or block.
pub trait DspModule: Send + 'static {
    /// Returns static information about this module.
    fn info(&self) -> &ModuleInfo;

    /// Returns the port definitions for this module.
    ///
    /// Inputs and outputs are indexed separately, each in declaration order.
    fn ports(&self) -> &[PortDefinition];

    /// Returns the parameter definitions for this module.
    ///
    /// The order of parameters determines their indices in the `params` slice.
    fn parameters(&self) -> &[ParameterDefinition];

    /// Prepares the module for processing at the given sample rate.
    fn prepare(&mut self, sample_rate: f32);

    /// Processes one sample period.
    fn process(&mut self, io: &mut PortFrame, params: &[f32], context: &ProcessContext);

    /// Resets the module's runtime state.
    fn reset(&mut self);

    /// Serializes the module's internal state for saving.
    ///
    /// Returns `None` if the module has no state beyond its parameters.
    fn serialize_state(&self) -> Option<Vec<u8>> {
        None
    }

    /// Restores the module's internal state from saved data.
    fn deserialize_state(&mut self, _data: &[u8]) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Builds an empty port frame matching this module's port layout.
    fn port_frame(&self) -> PortFrame {
        let ports = self.ports();
        let inputs = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
            .count();
        PortFrame::new(inputs, ports.len() - inputs)
    }

    /// Returns the default value of every parameter, in index order.
    fn default_params(&self) -> Vec<f32> {
        self.parameters().iter().map(|p| p.default).collect()
    }
}
