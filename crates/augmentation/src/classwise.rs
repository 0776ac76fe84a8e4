//! Per-class augmentation: route an image through a class-specific subset
//! of the default pipeline.
//!
//! [`ClassWiseTransforms`] holds the compiled default pipeline and one
//! sub-pipeline per mapped class. A [`ClassWiseAugmenter`] policy decides,
//! from a sample's label, which of them runs.
//!
//! ```ignore
//! let config: ClassWiseConfig = serde_json::from_value(json!({
//!     "augment": {"random_horizonflip": "no_params", "random_cutout": "no_params", "to_tensor": "no_params"},
//!     "class_aug": {"scratch": "1 2"},
//! }))?;
//! let augmenter = SingleLabelAugmenter::new(ClassWiseTransforms::from_config(&config)?);
//! let classes = vec!["ok".to_string(), "scratch".to_string()];
//! let tensor = augmenter.apply(image.into(), &1, &classes)?;
//! ```

use crate::compiler::compile;
use crate::config::ClassWiseConfig;
use crate::error::AugmentError;
use crate::pixels::Pixels;
use crate::registry::{default_registry, TransformRegistry};
use crate::transforms::{Compose, Transform};
use anyhow::{ensure, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// The default pipeline plus class-specific sub-pipelines built from it.
#[derive(Debug, Clone)]
pub struct ClassWiseTransforms {
    base: Compose,
    classes: BTreeMap<String, Compose>,
}

impl ClassWiseTransforms {
    /// Builds sub-pipelines from `mapping`, whose values are step indices
    /// into `base` as a space-separated string or an integer list. Indices
    /// may repeat or reorder steps; a choice group is a single index.
    pub fn new(base: Compose, mapping: Option<&Map<String, Value>>) -> Result<Self, AugmentError> {
        let classes = mapping
            .into_iter()
            .flatten()
            .map(|(class, spec)| {
                let indices = parse_indices(class, spec)?;
                let pipeline = base.select(&indices).map_err(|e| match e {
                    AugmentError::ClassIndexOutOfRange { index, len, .. } => {
                        AugmentError::ClassIndexOutOfRange {
                            class: class.clone(),
                            index,
                            len,
                        }
                    }
                    other => other,
                })?;
                Ok((class.clone(), pipeline))
            })
            .collect::<Result<BTreeMap<_, _>, AugmentError>>()?;

        if !classes.is_empty() {
            debug!(classes = ?classes.keys().collect::<Vec<_>>(), "Built class-wise pipelines");
        }
        Ok(Self { base, classes })
    }

    /// Compiles `config` against the builtin registry.
    pub fn from_config(config: &ClassWiseConfig) -> Result<Self> {
        Self::from_config_with(config, default_registry())
    }

    pub fn from_config_with(config: &ClassWiseConfig, registry: &TransformRegistry) -> Result<Self> {
        let base = compile(&config.augment, registry)?;
        Ok(Self::new(base, config.class_aug.as_ref())?)
    }

    pub fn default_pipeline(&self) -> &Compose {
        &self.base
    }

    pub fn class_pipeline(&self, class: &str) -> Option<&Compose> {
        self.classes.get(class)
    }

    /// Mapped class names, sorted.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// The class pipeline when `class` is mapped, the default otherwise.
    pub fn pipeline_for(&self, class: Option<&str>) -> &Compose {
        class
            .and_then(|c| self.classes.get(c))
            .unwrap_or(&self.base)
    }
}

fn parse_indices(class: &str, spec: &Value) -> Result<Vec<usize>, AugmentError> {
    let invalid = |token: String| AugmentError::InvalidClassIndex {
        class: class.to_string(),
        token,
    };
    match spec {
        Value::String(s) => s
            .split_whitespace()
            .map(|token| token.parse().map_err(|_| invalid(token.to_string())))
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| invalid(item.to_string()))
            })
            .collect(),
        other => Err(invalid(other.to_string())),
    }
}

/// Name of the class at `label`, failing when the label has no entry.
fn class_name(label: usize, class_indices: &[String]) -> Result<&str> {
    ensure!(
        label < class_indices.len(),
        "Label {} has no entry in class_indices (len {})",
        label,
        class_indices.len()
    );
    Ok(&class_indices[label])
}

// ============================================================================
// Dispatch policies
// ============================================================================

/// A rule picking the pipeline for a sample's label.
///
/// `class_indices[i]` is the name of class `i`; names are the keys of the
/// class-wise mapping. Implementors supply [`select`](Self::select);
/// [`apply`](Self::apply) runs the selected pipeline.
pub trait ClassWiseAugmenter: Send + Sync {
    type Label: ?Sized;

    fn transforms(&self) -> &ClassWiseTransforms;

    fn select(&self, label: &Self::Label, class_indices: &[String]) -> Result<&Compose>;

    fn apply(&self, image: Pixels, label: &Self::Label, class_indices: &[String]) -> Result<Pixels> {
        self.select(label, class_indices)?.apply(image)
    }
}

/// Multi-class policy: one label index per sample.
#[derive(Debug, Clone)]
pub struct SingleLabelAugmenter {
    transforms: ClassWiseTransforms,
}

impl SingleLabelAugmenter {
    pub fn new(transforms: ClassWiseTransforms) -> Self {
        Self { transforms }
    }
}

impl ClassWiseAugmenter for SingleLabelAugmenter {
    type Label = usize;

    fn transforms(&self) -> &ClassWiseTransforms {
        &self.transforms
    }

    fn select(&self, label: &usize, class_indices: &[String]) -> Result<&Compose> {
        let class = class_name(*label, class_indices)?;
        Ok(self.transforms.pipeline_for(Some(class)))
    }
}

/// Multi-label and binary policy: a set of positive label indices.
///
/// The first positive label, in the order given, whose class is mapped
/// decides the pipeline; with none mapped the default runs.
#[derive(Debug, Clone)]
pub struct MultiLabelAugmenter {
    transforms: ClassWiseTransforms,
}

impl MultiLabelAugmenter {
    pub fn new(transforms: ClassWiseTransforms) -> Self {
        Self { transforms }
    }
}

impl ClassWiseAugmenter for MultiLabelAugmenter {
    type Label = [usize];

    fn transforms(&self) -> &ClassWiseTransforms {
        &self.transforms
    }

    fn select(&self, labels: &[usize], class_indices: &[String]) -> Result<&Compose> {
        for &label in labels {
            let class = class_name(label, class_indices)?;
            if let Some(pipeline) = self.transforms.class_pipeline(class) {
                return Ok(pipeline);
            }
        }
        Ok(self.transforms.default_pipeline())
    }
}
