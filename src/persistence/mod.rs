//! Persistence module
//!
//! Network snapshot save/load using serde and JSON.

pub mod snapshot;

pub use snapshot::{load_from_file, save_to_file, NetworkSnapshot, SnapshotError};
