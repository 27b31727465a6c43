//! DSP module
//!
//! Core traits and per-sample primitives: the DspModule contract, ports,
//! parameters, polyphonic signals, pulse timers and edge detectors.

pub mod context;
pub mod edge_detector;
pub mod module_trait;
pub mod parameter;
pub mod port;
pub mod pulse_timer;
pub mod signal;
pub mod smoothed_value;

pub use context::ProcessContext;
pub use edge_detector::{EdgeDetector, PolyEdgeDetector};
pub use module_trait::{DspModule, ModuleCategory, ModuleError, ModuleInfo};
pub use parameter::{ParameterDefinition, ParameterDisplay};
pub use port::{PortDefinition, PortDirection};
pub use pulse_timer::PulseTimer;
pub use signal::{PolySignal, PortFrame, SignalType, MAX_CHANNELS, UNPATCHED};
pub use smoothed_value::SmoothedValue;
