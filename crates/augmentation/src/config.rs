//! Augmentation configuration: the closed grammar pipelines compile from.
//!
//! A configuration is a JSON-like mapping whose key order is the pipeline
//! order. Each key names a registered transform and maps to either the
//! `"no_params"` sentinel or a mapping of keyword parameters. The reserved
//! key `random_choice` maps to a list of single-entry mappings, one of which
//! is picked at random on every call.
//!
//! ```ignore
//! use augmentation::AugmentConfig;
//! use serde_json::json;
//!
//! let config = AugmentConfig::from_value(&json!({
//!     "resize": {"size": [256, 256]},
//!     "random_choice": [
//!         {"random_horizonflip": {"p": 1.0}},
//!         {"random_invert": "no_params"}
//!     ],
//!     "to_tensor": "no_params"
//! }))?;
//! assert_eq!(config.len(), 3);
//! ```

use crate::error::AugmentError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Parameter sentinel meaning "call the factory with no arguments".
pub const NO_PARAMS: &str = "no_params";

/// Reserved key introducing a choice group.
pub const RANDOM_CHOICE: &str = "random_choice";

/// Keyword parameters of one step.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// The `"no_params"` sentinel
    #[default]
    None,
    Map(Map<String, Value>),
}

impl Params {
    /// Accepts the sentinel or a mapping; anything else is rejected,
    /// naming the step.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, AugmentError> {
        match value {
            Value::String(s) if s == NO_PARAMS => Ok(Params::None),
            Value::Object(map) => Ok(Params::Map(map.clone())),
            other => Err(AugmentError::InvalidParams {
                name: name.to_string(),
                found: other.to_string(),
            }),
        }
    }

    /// Deserializes the parameters into a factory's typed schema. The
    /// sentinel parses like an empty mapping so schema defaults apply.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, AugmentError> {
        let value = match self {
            Params::None => Value::Object(Map::new()),
            Params::Map(map) => Value::Object(map.clone()),
        };
        serde_json::from_value(value).map_err(|source| AugmentError::BadParams {
            name: name.to_string(),
            source,
        })
    }
}

/// A named step with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
    pub name: String,
    pub params: Params,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// One top-level entry of a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum StepConfig {
    Plain(StepSpec),
    /// Candidates of a `random_choice` group, in listed order
    Choice(Vec<StepSpec>),
}

// ============================================================================
// AugmentConfig
// ============================================================================

/// A validated augmentation configuration.
///
/// Also deserializable with serde, so it can sit inside a larger config
/// document.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct AugmentConfig {
    steps: Vec<StepConfig>,
}

impl AugmentConfig {
    pub fn new(steps: Vec<StepConfig>) -> Self {
        Self { steps }
    }

    pub fn from_value(value: &Value) -> Result<Self, AugmentError> {
        let entries = value.as_object().ok_or_else(|| AugmentError::InvalidConfig {
            reason: format!("expected a mapping of transform names, got {value}"),
        })?;

        let steps = entries
            .iter()
            .map(|(name, params)| {
                if name == RANDOM_CHOICE {
                    parse_choice(params).map(StepConfig::Choice)
                } else {
                    Params::from_value(name, params).map(|p| StepConfig::Plain(StepSpec::new(name, p)))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Augmentation config is not valid JSON")?;
        Ok(Self::from_value(&value)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read augmentation config {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    /// Number of compiled positions; a choice group counts once.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl TryFrom<Value> for AugmentConfig {
    type Error = AugmentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn parse_choice(value: &Value) -> Result<Vec<StepSpec>, AugmentError> {
    let entries = value.as_array().ok_or_else(|| AugmentError::InvalidConfig {
        reason: format!("{RANDOM_CHOICE} must be a list of single-entry mappings, got {value}"),
    })?;
    if entries.is_empty() {
        return Err(AugmentError::InvalidConfig {
            reason: format!("{RANDOM_CHOICE} needs at least one candidate"),
        });
    }

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let (name, params) = match entry.as_object() {
                Some(map) if map.len() == 1 => map.iter().next().ok_or_else(|| malformed(position, entry))?,
                _ => return Err(malformed(position, entry)),
            };
            if name == RANDOM_CHOICE {
                return Err(AugmentError::NestedChoice { position });
            }
            Ok(StepSpec::new(name, Params::from_value(name, params)?))
        })
        .collect()
}

fn malformed(position: usize, entry: &Value) -> AugmentError {
    AugmentError::MalformedChoice {
        position,
        found: entry.to_string(),
    }
}

// ============================================================================
// ClassWiseConfig
// ============================================================================

/// A base pipeline plus optional per-class step selections.
///
/// Each `class_aug` value is either a space-separated string of indices
/// (`"0 2"`) or a list of integers (`[0, 2]`) into the compiled base
/// pipeline.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ClassWiseConfig {
    pub augment: AugmentConfig,
    #[serde(default)]
    pub class_aug: Option<Map<String, Value>>,
}
