//! Name → factory lookup used to build transforms from configuration.
//!
//! Registries are plain values populated explicitly: start from
//! [`TransformRegistry::with_builtins`] (or an empty [`TransformRegistry::new`])
//! and [`register`](TransformRegistry::register) custom factories before
//! compiling. [`default_registry`] is a shared, read-only builtin registry.

mod builtins;

use crate::config::{Params, RANDOM_CHOICE};
use crate::error::AugmentError;
use crate::transforms::BoxedTransform;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Builds a transform from its keyword parameters.
///
/// Factories own their parameter validation; errors they return reach the
/// caller of [`TransformRegistry::resolve`] untouched.
pub type Factory = Box<dyn Fn(&Params) -> Result<BoxedTransform> + Send + Sync>;

#[derive(Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, Factory>,
}

impl TransformRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in transform.
    pub fn with_builtins() -> Self {
        let factories: BTreeMap<String, Factory> = builtins::BUILTINS
            .iter()
            .map(|&(name, factory)| (name.to_string(), Box::new(factory) as Factory))
            .collect();
        debug!(count = factories.len(), "Registered built-in transforms");
        Self { factories }
    }

    /// Adds a factory under `name`.
    ///
    /// Fails if the name is taken (the existing factory stays in place) or
    /// is the reserved `random_choice` keyword.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), AugmentError>
    where
        F: Fn(&Params) -> Result<BoxedTransform> + Send + Sync + 'static,
    {
        let name = name.into();
        if name == RANDOM_CHOICE {
            return Err(AugmentError::InvalidConfig {
                reason: format!("'{RANDOM_CHOICE}' is reserved and cannot be registered"),
            });
        }
        if self.factories.contains_key(&name) {
            return Err(AugmentError::DuplicateName { name });
        }
        trace!(%name, "Registered transform");
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Builds the transform registered under `name`.
    pub fn resolve(&self, name: &str, params: &Params) -> Result<BoxedTransform> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AugmentError::UnknownName {
                name: name.to_string(),
            })?;
        trace!(name, ?params, "Resolving transform");
        factory(params)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn list_names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Process-wide builtin registry, built on first use.
pub fn default_registry() -> &'static TransformRegistry {
    static REGISTRY: OnceLock<TransformRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TransformRegistry::with_builtins)
}
