//! Network snapshot format.
//!
//! A flat JSON object holding the bus configuration and each node's routing
//! position. Every key is optional and read independently: a missing key, or
//! one holding a value of the wrong type, leaves the restored module's value
//! untouched instead of rejecting the whole document. Legacy spellings are
//! accepted as aliases; a document carrying both spellings of one key is
//! rejected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Persisted network state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    #[serde(
        default,
        alias = "channels",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_integer"
    )]
    pub channel_count: Option<i64>,
    /// Allocation policy index: 0 = Rotate, 1 = Reset, 2 = Fixed.
    #[serde(
        default,
        alias = "polyMode",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_integer"
    )]
    pub allocation_policy: Option<i64>,
    /// One routing state per node: -1 for the bus, 0..=3 for a local output.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_integer_list"
    )]
    pub node_states: Option<Vec<i64>>,
}

impl NetworkSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SnapshotError> {
        // A derived struct would also accept a positional array
        if !value.is_object() {
            return Err(SnapshotError::NotAnObject);
        }
        Ok(Self::deserialize(value)?)
    }
}

/// An integer field whose wrong-typed value reads as absent.
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = as_integer(&value);
    if parsed.is_none() {
        warn!(%value, "ignoring non-integer value");
    }
    Ok(parsed)
}

/// An integer array that reads as absent if any entry is not an integer.
fn lenient_integer_list<'de, D>(deserializer: D) -> Result<Option<Vec<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = value
        .as_array()
        .and_then(|items| items.iter().map(as_integer).collect::<Option<Vec<_>>>());
    if parsed.is_none() {
        warn!(%value, "ignoring malformed node states");
    }
    Ok(parsed)
}

/// Accepts integers and integral floats.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Error type for snapshot operations.
#[derive(Debug)]
pub enum SnapshotError {
    /// File I/O error.
    Io(std::io::Error),
    /// JSON serialization/deserialization error.
    Serialization(serde_json::Error),
    /// The document root is not a JSON object.
    NotAnObject,
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "File error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::NotAnObject => write!(f, "Snapshot root must be a JSON object"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::NotAnObject => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

/// Save a snapshot to a JSON file.
pub fn save_to_file(snapshot: &NetworkSnapshot, path: &std::path::Path) -> Result<(), SnapshotError> {
    let json = snapshot.to_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a snapshot from a JSON file.
pub fn load_from_file(path: &std::path::Path) -> Result<NetworkSnapshot, SnapshotError> {
    let json = std::fs::read_to_string(path)?;
    NetworkSnapshot::from_json(&json)
}
