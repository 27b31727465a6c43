//! Modules module
//!
//! The user-facing modules: the routing network and its expander.

pub mod network;
pub mod network_expander;

// Re-export commonly used types
pub use network::Network;
pub use network_expander::NetworkExpander;
