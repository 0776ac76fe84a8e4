use crate::error::{check_probability, AugmentError};
use crate::rng::{with_rng, worker_gen_bool, worker_gen_uniform};
use crate::transforms::vision::ops;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::DynamicImage;
use rand::seq::SliceRandom;

// ============================================================================
// ColorJitter
// ============================================================================

/// Randomly changes brightness, contrast, saturation and hue.
///
/// Each non-zero factor `f` draws a multiplier from `[max(0, 1 - f), 1 + f]`
/// (hue draws a shift from `[-f, f]` turns, `f <= 0.5`). The four
/// adjustments run in a fresh random order on every call.
///
/// # Example
/// ```ignore
/// let jitter = ColorJitter::new(0.1, 0.1, 0.1, 0.05)?;
/// let augmented = jitter.apply(image)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ColorJitter {
    brightness: Option<(f32, f32)>,
    contrast: Option<(f32, f32)>,
    saturation: Option<(f32, f32)>,
    hue: Option<(f32, f32)>,
}

impl ColorJitter {
    pub fn new(brightness: f32, contrast: f32, saturation: f32, hue: f32) -> Result<Self> {
        Ok(Self {
            brightness: Self::factor_range("brightness", brightness)?,
            contrast: Self::factor_range("contrast", contrast)?,
            saturation: Self::factor_range("saturation", saturation)?,
            hue: Self::hue_range(hue)?,
        })
    }

    fn factor_range(parameter: &str, value: f32) -> Result<Option<(f32, f32)>, AugmentError> {
        if !(value >= 0.0) {
            return Err(AugmentError::invalid_parameter(parameter, value));
        }
        Ok((value > 0.0).then(|| ((1.0 - value).max(0.0), 1.0 + value)))
    }

    fn hue_range(value: f32) -> Result<Option<(f32, f32)>, AugmentError> {
        if !(0.0..=0.5).contains(&value) {
            return Err(AugmentError::invalid_parameter("hue", value));
        }
        Ok((value > 0.0).then_some((-value, value)))
    }
}

impl Transform<DynamicImage, DynamicImage> for ColorJitter {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let mut order = [0usize, 1, 2, 3];
        with_rng(|rng| order.shuffle(rng));

        let draw = |range: Option<(f32, f32)>| range.map(|(lo, hi)| worker_gen_uniform(lo, hi));
        let brightness = draw(self.brightness);
        let contrast = draw(self.contrast);
        let saturation = draw(self.saturation);
        let hue = draw(self.hue);

        Ok(ops::map_rgb(img, |rgb| {
            let mut out = rgb.clone();
            for op in order {
                let adjusted = match (op, brightness, contrast, saturation, hue) {
                    (0, Some(f), ..) => ops::adjust_brightness(&out, f),
                    (1, _, Some(f), ..) => ops::adjust_contrast(&out, f),
                    (2, _, _, Some(f), _) => ops::adjust_saturation(&out, f),
                    (3, .., Some(f)) => ops::adjust_hue(&out, f),
                    _ => continue,
                };
                out = adjusted;
            }
            out
        }))
    }
}

/// [`ColorJitter`] applied with probability `prob`.
#[derive(Debug, Clone)]
pub struct RandomColorJitter {
    prob: f64,
    jitter: ColorJitter,
}

impl RandomColorJitter {
    pub fn new(prob: f64, jitter: ColorJitter) -> Result<Self> {
        check_probability("prob", prob)?;
        Ok(Self { prob, jitter })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomColorJitter {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if worker_gen_bool(self.prob) {
            self.jitter.apply(img)
        } else {
            Ok(img)
        }
    }
}

// ============================================================================
// Probability-gated colour operations
// ============================================================================

/// The fixed colour operations that only need a probability gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorOp {
    /// Gray output with the input's channel count
    Grayscale,
    Invert,
    Autocontrast,
    Equalize,
    Sharpness(f32),
}

impl ColorOp {
    fn run(self, img: DynamicImage) -> DynamicImage {
        match self {
            ColorOp::Grayscale => ops::map_rgb(img, ops::grayscale),
            ColorOp::Invert => ops::map_rgb(img, ops::invert),
            ColorOp::Autocontrast => ops::map_rgb(img, ops::autocontrast),
            ColorOp::Equalize => ops::map_rgb(img, ops::equalize),
            ColorOp::Sharpness(f) => ops::map_rgb(img, |rgb| ops::adjust_sharpness(rgb, f)),
        }
    }
}

/// Applies a [`ColorOp`] with probability `p`.
///
/// # Example
/// ```ignore
/// let invert = RandomColorOp::new(ColorOp::Invert, 0.5)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomColorOp {
    op: ColorOp,
    p: f64,
}

impl RandomColorOp {
    pub fn new(op: ColorOp, p: f64) -> Result<Self> {
        check_probability("p", p)?;
        if let ColorOp::Sharpness(f) = op {
            ensure!(f >= 0.0, AugmentError::invalid_parameter("sharpness_factor", f));
        }
        Ok(Self { op, p })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomColorOp {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(if worker_gen_bool(self.p) {
            self.op.run(img)
        } else {
            img
        })
    }
}

// ============================================================================
// RandomGaussianBlur
// ============================================================================

/// Gaussian blur applied with probability `prob`; sigma is drawn per call.
#[derive(Debug, Clone)]
pub struct RandomGaussianBlur {
    prob: f64,
    kernel_size: usize,
    sigma: (f32, f32),
}

impl RandomGaussianBlur {
    pub fn new(prob: f64, kernel_size: usize, sigma: (f32, f32)) -> Result<Self> {
        check_probability("prob", prob)?;
        ensure!(
            kernel_size > 0 && kernel_size % 2 == 1,
            AugmentError::invalid_parameter("kernel_size", kernel_size)
        );
        ensure!(
            0.0 < sigma.0 && sigma.0 <= sigma.1,
            AugmentError::invalid_parameter("sigma", format!("{sigma:?}"))
        );
        Ok(Self {
            prob,
            kernel_size,
            sigma,
        })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomGaussianBlur {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if !worker_gen_bool(self.prob) {
            return Ok(img);
        }
        let sigma = worker_gen_uniform(self.sigma.0, self.sigma.1);
        Ok(ops::map_rgb(img, |rgb| {
            ops::gaussian_blur(rgb, self.kernel_size, sigma)
        }))
    }
}
