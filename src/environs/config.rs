//! # Configuration snapshots and their validated form.
//!
//! [`ConfigSnapshot`] is the raw key/value mapping the store delivers: an
//! immutable point-in-time JSON object, not yet trusted. [`EnvironConfig`] is
//! the validated view: parsing requires a non-empty string under the
//! `"type"` key, which names the provider that can open the environment.
//! Everything else is carried through as opaque attributes for the provider
//! to interpret.
//!
//! ## Example
//! ```rust
//! use provisor::environs::{ConfigSnapshot, EnvironConfig};
//!
//! let snapshot = ConfigSnapshot::from_value(serde_json::json!({
//!     "type": "dummy",
//!     "region": "eu-west-1",
//! })).unwrap();
//!
//! let cfg = EnvironConfig::parse(&snapshot).unwrap();
//! assert_eq!(cfg.kind(), "dummy");
//! assert_eq!(cfg.get("region").and_then(|v| v.as_str()), Some("eu-west-1"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Immutable point-in-time value of the watched environment configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSnapshot {
    attrs: Map<String, Value>,
}

impl ConfigSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(attrs) => Ok(Self { attrs }),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Returns the value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Builder-style insertion, for tests and demos.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// The full attribute map.
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

impl From<Map<String, Value>> for ConfigSnapshot {
    fn from(attrs: Map<String, Value>) -> Self {
        Self { attrs }
    }
}

/// Validated environment configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironConfig {
    kind: String,
    attrs: Map<String, Value>,
}

impl EnvironConfig {
    /// Validates a snapshot into a configuration.
    ///
    /// Requires a non-empty string under `"type"`; all attributes (including
    /// `"type"` itself) are carried through unchanged.
    pub fn parse(snapshot: &ConfigSnapshot) -> Result<Self, ConfigError> {
        let kind = snapshot
            .get("type")
            .ok_or(ConfigError::MissingType)?
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::InvalidType)?;
        Ok(Self {
            kind: kind.to_owned(),
            attrs: snapshot.attrs().clone(),
        })
    }

    /// The provider type named by the configuration.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the attribute under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// True if `key` holds boolean `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.attrs.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The full attribute map.
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
}
