use crate::error::{check_probability, AugmentError};
use crate::rng::{worker_gen_bool, worker_gen_range, worker_gen_uniform};
use crate::transforms::vision::ops::{self, Affine};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use serde::Deserialize;

/// Image size as written in configs.
///
/// A scalar means a square for crops and the shorter edge for [`Resize`];
/// a pair is `[height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeParam {
    Scalar(u32),
    HeightWidth([u32; 2]),
}

impl SizeParam {
    /// `(height, width)`, treating a scalar as a square.
    pub fn square_or_pair(self) -> (u32, u32) {
        match self {
            SizeParam::Scalar(s) => (s, s),
            SizeParam::HeightWidth([h, w]) => (h, w),
        }
    }

    fn validate(self, parameter: &str) -> Result<Self, AugmentError> {
        let (h, w) = self.square_or_pair();
        if h == 0 || w == 0 {
            return Err(AugmentError::invalid_parameter(parameter, format!("{self:?}")));
        }
        Ok(self)
    }
}

/// Rotation or shear range in degrees; a scalar `d` means `[-d, d]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Degrees {
    Symmetric(f32),
    Range([f32; 2]),
}

impl Degrees {
    pub fn to_range(self, parameter: &str) -> Result<(f32, f32), AugmentError> {
        match self {
            Degrees::Symmetric(d) if d >= 0.0 => Ok((-d, d)),
            Degrees::Range([lo, hi]) if lo <= hi => Ok((lo, hi)),
            other => Err(AugmentError::invalid_parameter(parameter, format!("{other:?}"))),
        }
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes with bilinear filtering.
///
/// `SizeParam::Scalar(s)` matches the shorter edge to `s` and keeps the
/// aspect ratio; `SizeParam::HeightWidth` resizes to exactly that shape.
///
/// # Examples
/// ``` ignore
/// let resize = Resize::new(SizeParam::Scalar(256))?;
/// let resized = resize.apply(img)?;
/// ```
#[derive(Debug, Clone)]
pub struct Resize {
    size: SizeParam,
}

impl Resize {
    /// Creates a new Resize transform.
    pub fn new(size: SizeParam) -> Result<Self> {
        Ok(Self {
            size: size.validate("size")?,
        })
    }

    fn target(&self, width: u32, height: u32) -> (u32, u32) {
        match self.size {
            SizeParam::HeightWidth([h, w]) => (w, h),
            SizeParam::Scalar(s) if width <= height => {
                (s, (s as u64 * height as u64 / width.max(1) as u64) as u32)
            }
            SizeParam::Scalar(s) => ((s as u64 * width as u64 / height.max(1) as u64) as u32, s),
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for Resize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        let (w, h) = self.target(width, height);
        if (w, h) == (width, height) {
            return Ok(img);
        }
        Ok(img.resize_exact(w, h, FilterType::Triangle))
    }
}

// ============================================================================
// CenterCrop
// ============================================================================

/// Crops the center region; crops larger than the image are zero-padded.
#[derive(Debug, Clone)]
pub struct CenterCrop {
    height: u32,
    width: u32,
}

impl CenterCrop {
    pub fn new(size: SizeParam) -> Result<Self> {
        let (height, width) = size.validate("size")?.square_or_pair();
        Ok(Self { height, width })
    }
}

impl Transform<DynamicImage, DynamicImage> for CenterCrop {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        let top = ((height as f64 - self.height as f64) / 2.0).round() as i64;
        let left = ((width as f64 - self.width as f64) / 2.0).round() as i64;
        Ok(ops::crop_padded(&img, top, left, self.height, self.width))
    }
}

// ============================================================================
// RandomCrop
// ============================================================================

/// Crops a random `size` window, optionally after padding.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    height: u32,
    width: u32,
    padding: u32,
    pad_if_needed: bool,
    fill: u8,
}

impl RandomCrop {
    pub fn new(size: SizeParam) -> Result<Self> {
        let (height, width) = size.validate("size")?.square_or_pair();
        Ok(Self {
            height,
            width,
            padding: 0,
            pad_if_needed: false,
            fill: 0,
        })
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_pad_if_needed(mut self, pad_if_needed: bool) -> Self {
        self.pad_if_needed = pad_if_needed;
        self
    }

    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomCrop {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let fill = [self.fill; 3];
        let mut img = ops::pad(&img, self.padding, self.padding, fill);
        if self.pad_if_needed {
            let pad_x = self.width.saturating_sub(img.width());
            let pad_y = self.height.saturating_sub(img.height());
            img = ops::pad(&img, pad_x, pad_y, fill);
        }

        let (width, height) = img.dimensions();
        ensure!(
            width >= self.width && height >= self.height,
            "Required crop size {}x{} is larger than input image {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        let top = worker_gen_range(0, height - self.height + 1);
        let left = worker_gen_range(0, width - self.width + 1);
        Ok(img.crop_imm(left, top, self.width, self.height))
    }
}

// ============================================================================
// RandomResizedCrop
// ============================================================================

/// Crops a random area/aspect window and resizes it to `size`.
#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    height: u32,
    width: u32,
    scale: (f32, f32),
    ratio: (f32, f32),
}

impl RandomResizedCrop {
    pub fn new(size: SizeParam, scale: [f32; 2], ratio: [f32; 2]) -> Result<Self> {
        let (height, width) = size.validate("size")?.square_or_pair();
        ensure!(
            0.0 < scale[0] && scale[0] <= scale[1],
            AugmentError::invalid_parameter("scale", format!("{scale:?}"))
        );
        ensure!(
            0.0 < ratio[0] && ratio[0] <= ratio[1],
            AugmentError::invalid_parameter("ratio", format!("{ratio:?}"))
        );
        Ok(Self {
            height,
            width,
            scale: (scale[0], scale[1]),
            ratio: (ratio[0], ratio[1]),
        })
    }

    /// Returns `(top, left, height, width)` of the crop window.
    fn window(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let area = width as f32 * height as f32;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..10 {
            let target_area = area * worker_gen_uniform(self.scale.0, self.scale.1);
            let aspect = worker_gen_uniform(log_ratio.0, log_ratio.1).exp();
            let w = (target_area * aspect).sqrt().round() as u32;
            let h = (target_area / aspect).sqrt().round() as u32;
            if 0 < w && w <= width && 0 < h && h <= height {
                let top = worker_gen_range(0, height - h + 1);
                let left = worker_gen_range(0, width - w + 1);
                return (top, left, h, w);
            }
        }

        // Fallback to a central crop
        let in_ratio = width as f32 / height.max(1) as f32;
        let (w, h) = if in_ratio < self.ratio.0 {
            (width, ((width as f32 / self.ratio.0).round() as u32).clamp(1, height))
        } else if in_ratio > self.ratio.1 {
            (((height as f32 * self.ratio.1).round() as u32).clamp(1, width), height)
        } else {
            (width, height)
        };
        ((height - h) / 2, (width - w) / 2, h, w)
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomResizedCrop {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );
        let (top, left, h, w) = self.window(width, height);
        Ok(img
            .crop_imm(left, top, w, h)
            .resize_exact(self.width, self.height, FilterType::Triangle))
    }
}

// ============================================================================
// RandomRotation / RandomAffine
// ============================================================================

/// Rotates by an angle drawn uniformly from `degrees`, keeping the canvas size.
#[derive(Debug, Clone)]
pub struct RandomRotation {
    degrees: (f32, f32),
    fill: u8,
}

impl RandomRotation {
    pub fn new(degrees: Degrees) -> Result<Self> {
        Ok(Self {
            degrees: degrees.to_range("degrees")?,
            fill: 0,
        })
    }

    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomRotation {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let angle = worker_gen_uniform(self.degrees.0, self.degrees.1);
        if angle == 0.0 {
            return Ok(img);
        }
        let affine = Affine {
            angle,
            ..Affine::default()
        };
        ops::warp_affine(&img, &affine, None, self.fill)
    }
}

/// Random rotation, translation, scale and shear in one warp.
#[derive(Debug, Clone)]
pub struct RandomAffine {
    degrees: (f32, f32),
    translate: Option<(f32, f32)>,
    scale: Option<(f32, f32)>,
    shear_x: Option<(f32, f32)>,
    shear_y: Option<(f32, f32)>,
    fill: u8,
    center: Option<(f32, f32)>,
}

impl RandomAffine {
    pub fn new(degrees: Degrees) -> Result<Self> {
        Ok(Self {
            degrees: degrees.to_range("degrees")?,
            translate: None,
            scale: None,
            shear_x: None,
            shear_y: None,
            fill: 0,
            center: None,
        })
    }

    /// Maximum absolute translation as fractions of width and height.
    pub fn with_translate(mut self, translate: [f32; 2]) -> Result<Self> {
        ensure!(
            translate.iter().all(|t| (0.0..=1.0).contains(t)),
            AugmentError::invalid_parameter("translate", format!("{translate:?}"))
        );
        self.translate = Some((translate[0], translate[1]));
        Ok(self)
    }

    pub fn with_scale(mut self, scale: [f32; 2]) -> Result<Self> {
        ensure!(
            0.0 < scale[0] && scale[0] <= scale[1],
            AugmentError::invalid_parameter("scale", format!("{scale:?}"))
        );
        self.scale = Some((scale[0], scale[1]));
        Ok(self)
    }

    pub fn with_shear(mut self, shear_x: Degrees, shear_y: Option<Degrees>) -> Result<Self> {
        self.shear_x = Some(shear_x.to_range("shear")?);
        self.shear_y = shear_y.map(|s| s.to_range("shear")).transpose()?;
        Ok(self)
    }

    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_center(mut self, center: [f32; 2]) -> Self {
        self.center = Some((center[0], center[1]));
        self
    }

    fn sample(&self, width: u32, height: u32) -> Affine {
        let uniform = |range: Option<(f32, f32)>, default: f32| {
            range.map_or(default, |(lo, hi)| worker_gen_uniform(lo, hi))
        };
        let translate = self.translate.map_or((0.0, 0.0), |(fx, fy)| {
            let max_dx = fx * width as f32;
            let max_dy = fy * height as f32;
            (
                worker_gen_uniform(-max_dx, max_dx).round(),
                worker_gen_uniform(-max_dy, max_dy).round(),
            )
        });
        Affine {
            angle: worker_gen_uniform(self.degrees.0, self.degrees.1),
            translate,
            scale: uniform(self.scale, 1.0),
            shear: (uniform(self.shear_x, 0.0), uniform(self.shear_y, 0.0)),
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomAffine {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let affine = self.sample(img.width(), img.height());
        ops::warp_affine(&img, &affine, self.center, self.fill)
    }
}

// ============================================================================
// RandomHorizontalFlip / RandomVerticalFlip
// ============================================================================

/// Randomly flips images horizontally.
///
/// # Example
/// ```ignore
/// let flip = RandomHorizontalFlip::new(0.5)?; // 50% flip chance
/// let augmented = flip.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> Result<Self> {
        check_probability("p", p)?;
        Ok(Self { p })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomHorizontalFlip {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(if worker_gen_bool(self.p) { img.fliph() } else { img })
    }
}

/// Randomly flips images upside down.
#[derive(Debug, Clone)]
pub struct RandomVerticalFlip {
    p: f64,
}

impl RandomVerticalFlip {
    pub fn new(p: f64) -> Result<Self> {
        check_probability("p", p)?;
        Ok(Self { p })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomVerticalFlip {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(if worker_gen_bool(self.p) { img.flipv() } else { img })
    }
}

// ============================================================================
// PadToSquare
// ============================================================================

/// Where [`PadToSquare`] places the source image on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMode {
    /// All padding on one side: the image sits flush at the far corner
    Edge,
    /// Padding split evenly: the image is centered
    Average,
}

impl std::str::FromStr for PadMode {
    type Err = AugmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edge" => Ok(PadMode::Edge),
            "average" => Ok(PadMode::Average),
            other => Err(AugmentError::invalid_parameter("mode", other)),
        }
    }
}

/// Fill colour for [`PadToSquare`]: one value for all channels or an RGB triple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PadValue {
    Scalar(u8),
    Channels(Vec<u8>),
}

impl PadValue {
    pub fn to_rgb(&self) -> Result<[u8; 3], AugmentError> {
        match self {
            PadValue::Scalar(v) => Ok([*v; 3]),
            PadValue::Channels(c) => <[u8; 3]>::try_from(c.as_slice())
                .map_err(|_| AugmentError::invalid_parameter("pad_value", format!("{c:?}"))),
        }
    }
}

/// Pads the shorter side so the output is a `max(w, h)` square RGB image.
#[derive(Debug, Clone)]
pub struct PadToSquare {
    fill: [u8; 3],
    mode: PadMode,
}

impl PadToSquare {
    pub fn new(fill: [u8; 3], mode: PadMode) -> Self {
        Self { fill, mode }
    }

    /// Builds from raw config values, rejecting a malformed fill or mode.
    pub fn from_config(pad_value: &PadValue, mode: &str) -> Result<Self> {
        Ok(Self::new(pad_value.to_rgb()?, mode.parse()?))
    }

    /// Top-left position of the source on the square canvas.
    pub fn offset(&self, width: u32, height: u32) -> (u32, u32) {
        let side = width.max(height);
        match self.mode {
            PadMode::Average => ((side - width) / 2, (side - height) / 2),
            PadMode::Edge => (side - width, side - height),
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for PadToSquare {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        let side = width.max(height);
        let mut canvas = RgbImage::from_pixel(side, side, image::Rgb(self.fill));
        let (x, y) = self.offset(width, height);
        image::imageops::replace(&mut canvas, &img.to_rgb8(), x as i64, y as i64);
        Ok(DynamicImage::ImageRgb8(canvas))
    }
}
