//! Error kinds raised while building or running augmentation pipelines.
//!
//! Construction and application paths return `anyhow::Result`, like the
//! `Transform` trait does. The variants below are the named failures that
//! callers may want to tell apart; recover them with
//! `err.downcast_ref::<AugmentError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AugmentError {
    /// A factory is already registered under this name
    #[error("An entry is already registered under the name '{name}'")]
    DuplicateName { name: String },

    /// No factory is registered under this name
    #[error("Unknown transform '{name}'")]
    UnknownName { name: String },

    /// Parameters were neither a mapping nor the `no_params` sentinel
    #[error("Parameters of '{name}' must be a mapping or \"no_params\" (got {found})")]
    InvalidParams { name: String, found: String },

    /// The parameter mapping did not match the factory's schema
    #[error("Invalid parameters for '{name}': {source}")]
    BadParams {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// An entry under `random_choice` is not a single-key mapping
    #[error("random_choice entry #{position} must be a mapping with exactly one transform (got {found})")]
    MalformedChoice { position: usize, found: String },

    /// `random_choice` listed inside another `random_choice`
    #[error("random_choice entry #{position} nests another random_choice")]
    NestedChoice { position: usize },

    /// Structural problem with a configuration document
    #[error("Invalid augmentation config: {reason}")]
    InvalidConfig { reason: String },

    /// A class-wise step index does not address the default pipeline
    #[error("Class '{class}' references step {index} but the default pipeline has {len} steps")]
    ClassIndexOutOfRange {
        class: String,
        index: usize,
        len: usize,
    },

    /// A class-wise step index could not be read as an integer
    #[error("Class '{class}' has an invalid step index {token:?}")]
    InvalidClassIndex { class: String, token: String },

    /// A transform parameter is outside its accepted domain
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// The noise directory holds no `.jpg` files
    #[error("No .jpg noise images found in {}", dir.display())]
    EmptyNoisePool { dir: PathBuf },

    /// A noise image could not be listed or decoded
    #[error("Failed to read noise image {}", path.display())]
    NoiseImage {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A step received the wrong kind of data (image vs tensor)
    #[error("'{transform}' expects {expected} input")]
    UnexpectedInput {
        transform: &'static str,
        expected: &'static str,
    },
}

impl AugmentError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a noise image error with its source
    pub fn noise_image<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::NoiseImage {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Validates that `p` is a probability, naming the parameter on failure.
pub(crate) fn check_probability(parameter: &str, p: f64) -> Result<(), AugmentError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(AugmentError::invalid_parameter(parameter, p))
    }
}
