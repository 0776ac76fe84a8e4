//! Configuration-driven image augmentation pipelines.
//!
//! A pipeline is described as an ordered JSON mapping of transform names to
//! parameters, compiled against a [`TransformRegistry`], and applied one
//! image at a time:
//!
//! ```ignore
//! use augmentation::{create_aug_transforms, Pixels, Transform};
//! use serde_json::json;
//!
//! let pipeline = create_aug_transforms(&json!({
//!     "pad2square": {"pad_value": 114},
//!     "resize": {"size": [224, 224]},
//!     "random_choice": [
//!         {"random_cutout": {"length": 48}},
//!         {"random_gaussianblur": "no_params"},
//!     ],
//!     "to_tensor": "no_params",
//!     "normalize": "no_params",
//! }))?;
//!
//! augmentation::rng::init_worker_rng(worker_id, epoch, 42);
//! let tensor = pipeline.apply(Pixels::from(image))?.into_tensor()?;
//! ```

pub mod classwise;
pub mod compiler;
pub mod config;
pub mod error;
pub mod introspect;
pub mod pixels;
pub mod registry;
pub mod rng;
pub mod transforms;

pub use classwise::{ClassWiseAugmenter, ClassWiseTransforms, MultiLabelAugmenter, SingleLabelAugmenter};
pub use compiler::{compile, create_aug_transforms};
pub use config::{AugmentConfig, ClassWiseConfig, Params, StepConfig, StepSpec, NO_PARAMS, RANDOM_CHOICE};
pub use error::AugmentError;
pub use introspect::{is_spatial, list_augments, SPATIAL_TRANSFORMS};
pub use pixels::{Pixels, Tensor};
pub use registry::{default_registry, Factory, TransformRegistry};
pub use transforms::{Compose, Step, Transform};
