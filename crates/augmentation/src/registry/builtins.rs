//! Built-in transform factories and their parameter schemas.
//!
//! Every schema rejects unknown keys. Fields without a default are required.

use crate::config::Params;
use crate::transforms::vision::{
    CenterCrop, ColorJitter, ColorOp, CutAddNoise, Cutout, Degrees, Normalize, PadToSquare,
    PadValue, RandAugment, RandomAffine, RandomColorJitter, RandomColorOp, RandomCrop,
    RandomGaussianBlur, RandomHorizontalFlip, RandomResizedCrop, RandomRotation,
    RandomVerticalFlip, Resize, SizeParam, ToTensor, ToTensorNoDiv,
};
use crate::transforms::{BoxedTransform, IntoTensor, OnImage, OnTensor, Transform};
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

type BuiltinFactory = fn(&Params) -> Result<BoxedTransform>;

pub(super) const BUILTINS: &[(&str, BuiltinFactory)] = &[
    ("center_crop", center_crop),
    ("centercrop_resize", centercrop_resize),
    ("color_jitter", color_jitter),
    ("normalize", normalize),
    ("pad2square", pad2square),
    ("random_adjustsharpness", random_adjustsharpness),
    ("random_affine", random_affine),
    ("random_augment", random_augment),
    ("random_autocontrast", random_autocontrast),
    ("random_color_jitter", random_color_jitter),
    ("random_crop", random_crop),
    ("random_crop_and_resize", random_crop_and_resize),
    ("random_cutaddnoise", random_cutaddnoise),
    ("random_cutout", random_cutout),
    ("random_equalize", random_equalize),
    ("random_gaussianblur", random_gaussianblur),
    ("random_grayscale", random_grayscale),
    ("random_horizonflip", random_horizonflip),
    ("random_invert", random_invert),
    ("random_rotate", random_rotate),
    ("random_verticalflip", random_verticalflip),
    ("resize", resize),
    ("to_tensor", to_tensor),
    ("to_tensor_without_div", to_tensor_without_div),
];

fn image_step<T>(transform: T) -> Result<BoxedTransform>
where
    T: Transform<image::DynamicImage, image::DynamicImage> + 'static,
{
    Ok(Box::new(OnImage(transform)))
}

const fn half() -> f64 {
    0.5
}

const fn default_n_holes() -> u32 {
    1
}

const fn default_length() -> u32 {
    200
}

// ============================================================================
// Geometric
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SizeOnly {
    size: SizeParam,
}

fn center_crop(params: &Params) -> Result<BoxedTransform> {
    let p: SizeOnly = params.parse("center_crop")?;
    image_step(CenterCrop::new(p.size)?)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ResizeParams {
    #[serde(default = "default_resize")]
    size: SizeParam,
}

const fn default_resize() -> SizeParam {
    SizeParam::Scalar(224)
}

fn resize(params: &Params) -> Result<BoxedTransform> {
    let p: ResizeParams = params.parse("resize")?;
    image_step(Resize::new(p.size)?)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CenterCropResizeParams {
    center_size: SizeParam,
    re_size: SizeParam,
}

fn centercrop_resize(params: &Params) -> Result<BoxedTransform> {
    let p: CenterCropResizeParams = params.parse("centercrop_resize")?;
    image_step(CenterCrop::new(p.center_size)?.then(Resize::new(p.re_size)?))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RandomCropParams {
    size: SizeParam,
    #[serde(default)]
    padding: Option<u32>,
    #[serde(default)]
    pad_if_needed: bool,
    #[serde(default)]
    fill: u8,
}

fn random_crop(params: &Params) -> Result<BoxedTransform> {
    let p: RandomCropParams = params.parse("random_crop")?;
    let crop = RandomCrop::new(p.size)?
        .with_padding(p.padding.unwrap_or(0))
        .with_pad_if_needed(p.pad_if_needed)
        .with_fill(p.fill);
    image_step(crop)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RandomResizedCropParams {
    size: SizeParam,
    #[serde(default = "default_crop_scale")]
    scale: [f32; 2],
    #[serde(default = "default_crop_ratio")]
    ratio: [f32; 2],
}

const fn default_crop_scale() -> [f32; 2] {
    [0.08, 1.0]
}

fn default_crop_ratio() -> [f32; 2] {
    [3.0 / 4.0, 4.0 / 3.0]
}

fn random_crop_and_resize(params: &Params) -> Result<BoxedTransform> {
    let p: RandomResizedCropParams = params.parse("random_crop_and_resize")?;
    image_step(RandomResizedCrop::new(p.size, p.scale, p.ratio)?)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RotateParams {
    degrees: Degrees,
    #[serde(default)]
    fill: u8,
}

fn random_rotate(params: &Params) -> Result<BoxedTransform> {
    let p: RotateParams = params.parse("random_rotate")?;
    image_step(RandomRotation::new(p.degrees)?.with_fill(p.fill))
}

/// Shear as a single range along x, or `[x_lo, x_hi, y_lo, y_hi]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ShearParam {
    XY([f32; 4]),
    X(Degrees),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AffineParams {
    #[serde(default = "default_affine_degrees")]
    degrees: Degrees,
    #[serde(default)]
    translate: Option<[f32; 2]>,
    #[serde(default)]
    scale: Option<[f32; 2]>,
    #[serde(default)]
    shear: Option<ShearParam>,
    #[serde(default)]
    fill: u8,
    #[serde(default)]
    center: Option<[f32; 2]>,
}

const fn default_affine_degrees() -> Degrees {
    Degrees::Symmetric(0.0)
}

fn random_affine(params: &Params) -> Result<BoxedTransform> {
    let p: AffineParams = params.parse("random_affine")?;
    let mut affine = RandomAffine::new(p.degrees)?.with_fill(p.fill);
    if let Some(translate) = p.translate {
        affine = affine.with_translate(translate)?;
    }
    if let Some(scale) = p.scale {
        affine = affine.with_scale(scale)?;
    }
    affine = match p.shear {
        Some(ShearParam::X(x)) => affine.with_shear(x, None)?,
        Some(ShearParam::XY([x0, x1, y0, y1])) => {
            affine.with_shear(Degrees::Range([x0, x1]), Some(Degrees::Range([y0, y1])))?
        }
        None => affine,
    };
    if let Some(center) = p.center {
        affine = affine.with_center(center);
    }
    image_step(affine)
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProbParams {
    p: f64,
}

impl Default for ProbParams {
    fn default() -> Self {
        Self { p: half() }
    }
}

fn random_horizonflip(params: &Params) -> Result<BoxedTransform> {
    let p: ProbParams = params.parse("random_horizonflip")?;
    image_step(RandomHorizontalFlip::new(p.p)?)
}

fn random_verticalflip(params: &Params) -> Result<BoxedTransform> {
    let p: ProbParams = params.parse("random_verticalflip")?;
    image_step(RandomVerticalFlip::new(p.p)?)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PadSquareParams {
    #[serde(default = "default_pad_value")]
    pad_value: PadValue,
    #[serde(default = "default_pad_mode")]
    mode: String,
}

const fn default_pad_value() -> PadValue {
    PadValue::Scalar(0)
}

fn default_pad_mode() -> String {
    "average".to_string()
}

fn pad2square(params: &Params) -> Result<BoxedTransform> {
    let p: PadSquareParams = params.parse("pad2square")?;
    image_step(PadToSquare::from_config(&p.pad_value, &p.mode)?)
}

// ============================================================================
// Photometric
// ============================================================================

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct JitterParams {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
}

impl Default for JitterParams {
    fn default() -> Self {
        Self {
            brightness: 0.1,
            contrast: 0.1,
            saturation: 0.1,
            hue: 0.1,
        }
    }
}

fn color_jitter(params: &Params) -> Result<BoxedTransform> {
    let p: JitterParams = params.parse("color_jitter")?;
    image_step(ColorJitter::new(p.brightness, p.contrast, p.saturation, p.hue)?)
}

/// Factors default to zero (no change) like a bare `ColorJitter()`.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GatedJitterParams {
    prob: f64,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
}

impl Default for GatedJitterParams {
    fn default() -> Self {
        Self {
            prob: half(),
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            hue: 0.0,
        }
    }
}

fn random_color_jitter(params: &Params) -> Result<BoxedTransform> {
    let p: GatedJitterParams = params.parse("random_color_jitter")?;
    let jitter = ColorJitter::new(p.brightness, p.contrast, p.saturation, p.hue)?;
    image_step(RandomColorJitter::new(p.prob, jitter)?)
}

fn gated_color_op(name: &str, op: ColorOp, params: &Params) -> Result<BoxedTransform> {
    let p: ProbParams = params.parse(name)?;
    image_step(RandomColorOp::new(op, p.p)?)
}

fn random_grayscale(params: &Params) -> Result<BoxedTransform> {
    gated_color_op("random_grayscale", ColorOp::Grayscale, params)
}

fn random_invert(params: &Params) -> Result<BoxedTransform> {
    gated_color_op("random_invert", ColorOp::Invert, params)
}

fn random_autocontrast(params: &Params) -> Result<BoxedTransform> {
    gated_color_op("random_autocontrast", ColorOp::Autocontrast, params)
}

fn random_equalize(params: &Params) -> Result<BoxedTransform> {
    gated_color_op("random_equalize", ColorOp::Equalize, params)
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SharpnessParams {
    sharpness_factor: f32,
    p: f64,
}

impl Default for SharpnessParams {
    fn default() -> Self {
        Self {
            sharpness_factor: 2.0,
            p: half(),
        }
    }
}

fn random_adjustsharpness(params: &Params) -> Result<BoxedTransform> {
    let p: SharpnessParams = params.parse("random_adjustsharpness")?;
    image_step(RandomColorOp::new(ColorOp::Sharpness(p.sharpness_factor), p.p)?)
}

/// Fixed sigma or a `[min, max]` range sampled per call.
#[derive(Deserialize)]
#[serde(untagged)]
enum SigmaParam {
    Fixed(f32),
    Range([f32; 2]),
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BlurParams {
    prob: f64,
    kernel_size: usize,
    sigma: SigmaParam,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            prob: half(),
            kernel_size: 3,
            sigma: SigmaParam::Range([0.1, 2.0]),
        }
    }
}

fn random_gaussianblur(params: &Params) -> Result<BoxedTransform> {
    let p: BlurParams = params.parse("random_gaussianblur")?;
    let sigma = match p.sigma {
        SigmaParam::Fixed(s) => (s, s),
        SigmaParam::Range([lo, hi]) => (lo, hi),
    };
    image_step(RandomGaussianBlur::new(p.prob, p.kernel_size, sigma)?)
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RandAugmentParams {
    num_ops: u32,
    magnitude: u32,
    num_magnitude_bins: u32,
}

impl Default for RandAugmentParams {
    fn default() -> Self {
        Self {
            num_ops: 2,
            magnitude: 9,
            num_magnitude_bins: 31,
        }
    }
}

fn random_augment(params: &Params) -> Result<BoxedTransform> {
    let p: RandAugmentParams = params.parse("random_augment")?;
    image_step(RandAugment::new(p.num_ops, p.magnitude, p.num_magnitude_bins)?)
}

// ============================================================================
// Patch augmentations
// ============================================================================

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CutoutParams {
    n_holes: u32,
    length: u32,
    ratio: f32,
    h_range: Option<[u32; 2]>,
    w_range: Option<[u32; 2]>,
    prob: f64,
}

impl Default for CutoutParams {
    fn default() -> Self {
        Self {
            n_holes: default_n_holes(),
            length: default_length(),
            ratio: 0.2,
            h_range: None,
            w_range: None,
            prob: half(),
        }
    }
}

fn random_cutout(params: &Params) -> Result<BoxedTransform> {
    let p: CutoutParams = params.parse("random_cutout")?;
    image_step(Cutout::new(
        p.n_holes, p.length, p.ratio, p.h_range, p.w_range, p.prob,
    )?)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CutAddNoiseParams {
    noisy_src: PathBuf,
    #[serde(default = "default_n_holes")]
    n_holes: u32,
    #[serde(default = "default_length")]
    length: u32,
    #[serde(default)]
    h_range: Option<[u32; 2]>,
    #[serde(default)]
    w_range: Option<[u32; 2]>,
    #[serde(default = "half")]
    prob: f64,
}

fn random_cutaddnoise(params: &Params) -> Result<BoxedTransform> {
    let p: CutAddNoiseParams = params.parse("random_cutaddnoise")?;
    image_step(CutAddNoise::new(
        p.n_holes,
        p.length,
        &p.noisy_src,
        p.h_range,
        p.w_range,
        p.prob,
    )?)
}

// ============================================================================
// Conversion
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

fn to_tensor(params: &Params) -> Result<BoxedTransform> {
    let _: NoParams = params.parse("to_tensor")?;
    Ok(Box::new(IntoTensor(ToTensor)))
}

fn to_tensor_without_div(params: &Params) -> Result<BoxedTransform> {
    let _: NoParams = params.parse("to_tensor_without_div")?;
    Ok(Box::new(IntoTensor(ToTensorNoDiv)))
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NormalizeParams {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

fn normalize(params: &Params) -> Result<BoxedTransform> {
    let p: NormalizeParams = params.parse("normalize")?;
    Ok(Box::new(OnTensor(Normalize::new(&p.mean, &p.std)?)))
}
