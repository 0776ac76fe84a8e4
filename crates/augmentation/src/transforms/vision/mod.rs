//! Vision transforms for image augmentation.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Spatial transformations (resize, crop, rotate, pad)
//! ├── photometric.rs   → Color and appearance (jitter, blur, equalize)
//! ├── augmentation.rs  → Patch augmentations (cutout, noise patches)
//! ├── autoaugment.rs   → RandAugment
//! ├── conversion.rs    → Format conversions (image → tensor, normalize)
//! └── ops.rs           → Pixel kernels shared by the above
//! ```
//!
//! All transforms are re-exported at the module level:
//!
//! ```ignore
//! use augmentation::transforms::Transform;
//! use augmentation::transforms::vision::{Normalize, Resize, SizeParam, ToTensor};
//!
//! let pipeline = Resize::new(SizeParam::Scalar(256))?
//!     .then(ToTensor)
//!     .then(Normalize::imagenet());
//! ```

pub mod augmentation;
pub mod autoaugment;
pub mod conversion;
pub mod geometric;
pub mod ops;
pub mod photometric;

pub use augmentation::{CutAddNoise, Cutout, NoisePool};
pub use autoaugment::{RandAugment, RandOp};
pub use conversion::{Normalize, ToTensor, ToTensorNoDiv};
pub use geometric::{
    CenterCrop, Degrees, PadMode, PadToSquare, PadValue, RandomAffine, RandomCrop,
    RandomHorizontalFlip, RandomResizedCrop, RandomRotation, RandomVerticalFlip, Resize,
    SizeParam,
};
pub use photometric::{ColorJitter, ColorOp, RandomColorJitter, RandomColorOp, RandomGaussianBlur};
