//! Turns an [`AugmentConfig`] into a runnable [`Compose`] pipeline.

use crate::config::{AugmentConfig, StepConfig, StepSpec, RANDOM_CHOICE};
use crate::registry::{default_registry, TransformRegistry};
use crate::transforms::{Compose, RandomChoice, SharedTransform, Step};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Compiles `config` against `registry`.
///
/// Steps keep configuration order. A `random_choice` group becomes one step
/// that runs a single uniformly drawn candidate per call. The first failing
/// entry aborts compilation.
pub fn compile(config: &AugmentConfig, registry: &TransformRegistry) -> Result<Compose> {
    let steps = config
        .steps()
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            compile_entry(entry, registry)
                .with_context(|| format!("Failed to compile augmentation step {position}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let pipeline = Compose::new(steps);
    debug!(steps = ?pipeline.step_names(), "Compiled augmentation pipeline");
    Ok(pipeline)
}

/// Parses and compiles a configuration against the builtin registry.
///
/// # Example
/// ```ignore
/// let pipeline = create_aug_transforms(&json!({
///     "pad2square": {"mode": "average"},
///     "resize": {"size": [224, 224]},
///     "to_tensor": "no_params",
/// }))?;
/// let tensor = pipeline.apply(image.into())?.into_tensor()?;
/// ```
pub fn create_aug_transforms(config: &Value) -> Result<Compose> {
    compile(&AugmentConfig::from_value(config)?, default_registry())
}

fn compile_entry(entry: &StepConfig, registry: &TransformRegistry) -> Result<Step> {
    match entry {
        StepConfig::Plain(spec) => Ok(Step::new(&spec.name, resolve(spec, registry)?)),
        StepConfig::Choice(candidates) => {
            let transforms = candidates
                .iter()
                .map(|spec| resolve(spec, registry))
                .collect::<Result<Vec<_>>>()?;
            let kinds = candidates.iter().map(|spec| spec.name.clone()).collect();
            Ok(Step::with_kinds(
                RANDOM_CHOICE,
                kinds,
                Arc::new(RandomChoice::new(transforms)?),
            ))
        }
    }
}

fn resolve(spec: &StepSpec, registry: &TransformRegistry) -> Result<SharedTransform> {
    registry
        .resolve(&spec.name, &spec.params)
        .map(SharedTransform::from)
}
