use crate::error::AugmentError;
use crate::rng::{worker_gen_bool, worker_gen_index};
use crate::transforms::vision::ops::{self, Affine};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::DynamicImage;

/// Operations RandAugment draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandOp {
    Identity,
    ShearX,
    ShearY,
    TranslateX,
    TranslateY,
    Rotate,
    Brightness,
    Color,
    Contrast,
    Sharpness,
    Posterize,
    Solarize,
    AutoContrast,
    Equalize,
}

impl RandOp {
    pub const ALL: [RandOp; 14] = [
        RandOp::Identity,
        RandOp::ShearX,
        RandOp::ShearY,
        RandOp::TranslateX,
        RandOp::TranslateY,
        RandOp::Rotate,
        RandOp::Brightness,
        RandOp::Color,
        RandOp::Contrast,
        RandOp::Sharpness,
        RandOp::Posterize,
        RandOp::Solarize,
        RandOp::AutoContrast,
        RandOp::Equalize,
    ];

    /// Strength of the op at `bin` out of `bins`, and whether its sign may flip.
    fn magnitude(self, bin: u32, bins: u32, width: u32, height: u32) -> (f32, bool) {
        let linspace = |start: f32, end: f32| {
            if bins <= 1 {
                start
            } else {
                start + (end - start) * bin as f32 / (bins - 1) as f32
            }
        };
        match self {
            RandOp::Identity | RandOp::AutoContrast | RandOp::Equalize => (0.0, false),
            RandOp::ShearX | RandOp::ShearY => (linspace(0.0, 0.3), true),
            RandOp::TranslateX => (linspace(0.0, 150.0 / 331.0 * width as f32), true),
            RandOp::TranslateY => (linspace(0.0, 150.0 / 331.0 * height as f32), true),
            RandOp::Rotate => (linspace(0.0, 30.0), true),
            RandOp::Brightness | RandOp::Color | RandOp::Contrast | RandOp::Sharpness => {
                (linspace(0.0, 0.9), true)
            }
            RandOp::Posterize => {
                let step = (bins.max(2) - 1) as f32 / 4.0;
                (8.0 - (bin as f32 / step).round(), false)
            }
            RandOp::Solarize => (linspace(255.0, 0.0), false),
        }
    }

    fn run(self, img: DynamicImage, magnitude: f32) -> Result<DynamicImage> {
        Ok(match self {
            RandOp::Identity => img,
            // Shear about the origin
            RandOp::ShearX => warp(
                &img,
                Affine {
                    shear: (magnitude.atan().to_degrees(), 0.0),
                    ..Affine::default()
                },
                Some((0.0, 0.0)),
            )?,
            RandOp::ShearY => warp(
                &img,
                Affine {
                    shear: (0.0, magnitude.atan().to_degrees()),
                    ..Affine::default()
                },
                Some((0.0, 0.0)),
            )?,
            RandOp::TranslateX => warp(
                &img,
                Affine {
                    translate: (magnitude.trunc(), 0.0),
                    ..Affine::default()
                },
                None,
            )?,
            RandOp::TranslateY => warp(
                &img,
                Affine {
                    translate: (0.0, magnitude.trunc()),
                    ..Affine::default()
                },
                None,
            )?,
            RandOp::Rotate => warp(
                &img,
                Affine {
                    angle: magnitude,
                    ..Affine::default()
                },
                None,
            )?,
            RandOp::Brightness => ops::map_rgb(img, |rgb| ops::adjust_brightness(rgb, 1.0 + magnitude)),
            RandOp::Color => ops::map_rgb(img, |rgb| ops::adjust_saturation(rgb, 1.0 + magnitude)),
            RandOp::Contrast => ops::map_rgb(img, |rgb| ops::adjust_contrast(rgb, 1.0 + magnitude)),
            RandOp::Sharpness => ops::map_rgb(img, |rgb| ops::adjust_sharpness(rgb, 1.0 + magnitude)),
            RandOp::Posterize => ops::map_rgb(img, |rgb| ops::posterize(rgb, magnitude as u8)),
            RandOp::Solarize => ops::map_rgb(img, |rgb| ops::solarize(rgb, magnitude)),
            RandOp::AutoContrast => ops::map_rgb(img, ops::autocontrast),
            RandOp::Equalize => ops::map_rgb(img, ops::equalize),
        })
    }
}

fn warp(img: &DynamicImage, affine: Affine, center: Option<(f32, f32)>) -> Result<DynamicImage> {
    ops::warp_affine(img, &affine, center, 0)
}

// ============================================================================
// RandAugment
// ============================================================================

/// RandAugment: applies `num_ops` operations drawn uniformly (with
/// replacement) at a shared `magnitude` bin.
///
/// Signed operations flip direction with probability 0.5.
///
/// # Example
/// ```ignore
/// let augment = RandAugment::new(2, 9, 31)?;
/// let augmented = augment.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandAugment {
    num_ops: u32,
    magnitude: u32,
    num_magnitude_bins: u32,
}

impl RandAugment {
    pub fn new(num_ops: u32, magnitude: u32, num_magnitude_bins: u32) -> Result<Self> {
        ensure!(
            num_magnitude_bins >= 1,
            AugmentError::invalid_parameter("num_magnitude_bins", num_magnitude_bins)
        );
        ensure!(
            magnitude < num_magnitude_bins,
            AugmentError::invalid_parameter("magnitude", magnitude)
        );
        Ok(Self {
            num_ops,
            magnitude,
            num_magnitude_bins,
        })
    }
}

impl Default for RandAugment {
    fn default() -> Self {
        Self {
            num_ops: 2,
            magnitude: 9,
            num_magnitude_bins: 31,
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for RandAugment {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        (0..self.num_ops).try_fold(img, |img, _| {
            let op = RandOp::ALL[worker_gen_index(RandOp::ALL.len())];
            let (magnitude, signed) =
                op.magnitude(self.magnitude, self.num_magnitude_bins, img.width(), img.height());
            let magnitude = if signed && worker_gen_bool(0.5) {
                -magnitude
            } else {
                magnitude
            };
            op.run(img, magnitude)
        })
    }
}
