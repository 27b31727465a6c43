//! Engine module
//!
//! The routing core: node state machines, the shared polyphonic bus, the
//! expander message bridge and a small synchronous host that steps them.

pub mod destination;
pub mod expander_bridge;
pub mod node;
pub mod output_router;
pub mod rack;

pub use destination::Destination;
pub use expander_bridge::{ExpanderBridge, ExpanderMessage, MESSAGE_LEN, NO_OVERRIDE};
pub use node::{Node, NodeEvent, NodeId, NodeInputs};
pub use output_router::{AllocationPolicy, BusOutputs, GateMode, OutputRouter};
pub use rack::{Rack, Side};

/// Number of nodes in a network.
pub const NODE_COUNT: usize = 16;

/// Trigger inputs per node.
pub const NODE_INPUTS: usize = 2;

/// Local trigger outputs per node.
pub const NODE_OUTPUTS: usize = 4;

/// Width of a local trigger pulse, in seconds.
pub const TRIGGER_PULSE: f32 = 1e-3;

/// Width of a bus retrigger pulse, in seconds.
pub const RETRIGGER_PULSE: f32 = 1e-3;

/// Edges arriving this soon after a fire are ignored, in seconds.
pub const SUPPRESS_WINDOW: f32 = 1e-3;
