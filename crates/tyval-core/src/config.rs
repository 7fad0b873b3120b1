//! # Engine Configuration
//!
//! Policy switches shared by the value engine and the compiler. Every field
//! has a default, so an empty YAML or JSON document is a valid
//! configuration.
//!
//! ```yaml
//! unknown_kinds: reject
//! defaulted_properties: required
//! allow_nan: false
//! allow_null_void: false
//! exact_optional_properties: false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do with a custom kind that has no registered predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKindPolicy {
    /// Refuse to build a scope or program over the schema.
    #[default]
    Error,
    /// The kind never validates.
    Reject,
    /// The kind always validates.
    Accept,
}

/// Whether a declared default relaxes a property's required-ness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultedPropertyPolicy {
    /// A property is required unless marked optional, default or not.
    #[default]
    Required,
    /// A property carrying a default is treated as optional.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub unknown_kinds: UnknownKindPolicy,
    pub defaulted_properties: DefaultedPropertyPolicy,
    /// Whether NaN and infinities satisfy `Number`.
    pub allow_nan: bool,
    /// Whether `null` satisfies `Undefined`.
    pub allow_null_void: bool,
    /// Whether an optional property present with an undefined value must
    /// still satisfy its schema.
    pub exact_optional_properties: bool,
}

/// Error loading an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum EngineConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config extension for '{path}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },
}

impl EngineConfig {
    /// Load a configuration file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EngineConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            _ => {
                return Err(EngineConfigError::UnsupportedFormat {
                    path: path.display().to_string(),
                })
            }
        };
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, EngineConfigError> {
        // An empty YAML document deserializes as unit, not as a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, EngineConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}
