use crate::error::{check_probability, AugmentError};
use crate::rng::{worker_gen_bool, worker_gen_index, worker_gen_range, worker_gen_uniform};
use crate::transforms::vision::ops;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

// ============================================================================
// Hole sampling
// ============================================================================

/// Where holes may be centred and how large they are.
///
/// Ranges are half-open `[low, high)` in pixels; `None` means the full
/// image extent on that axis.
#[derive(Debug, Clone)]
struct HoleSampler {
    n_holes: u32,
    length: u32,
    h_range: Option<(u32, u32)>,
    w_range: Option<(u32, u32)>,
}

impl HoleSampler {
    fn new(
        n_holes: u32,
        length: u32,
        h_range: Option<[u32; 2]>,
        w_range: Option<[u32; 2]>,
    ) -> Result<Self> {
        ensure!(n_holes >= 1, AugmentError::invalid_parameter("n_holes", n_holes));
        ensure!(length >= 1, AugmentError::invalid_parameter("length", length));
        Ok(Self {
            n_holes,
            length,
            h_range: Self::check_range("h_range", h_range)?,
            w_range: Self::check_range("w_range", w_range)?,
        })
    }

    fn check_range(parameter: &str, range: Option<[u32; 2]>) -> Result<Option<(u32, u32)>> {
        match range {
            None => Ok(None),
            Some([low, high]) if low < high => Ok(Some((low, high))),
            Some(other) => Err(AugmentError::invalid_parameter(parameter, format!("{other:?}")).into()),
        }
    }

    /// Hole centres `(x, y)` for an image of `width` x `height`.
    fn centers(&self, width: u32, height: u32) -> Vec<(u32, u32)> {
        let (h_low, h_high) = self.h_range.unwrap_or((0, height));
        let (w_low, w_high) = self.w_range.unwrap_or((0, width));
        (0..self.n_holes)
            .map(|_| {
                let y = worker_gen_range(h_low, h_high);
                let x = worker_gen_range(w_low, w_high);
                (x, y)
            })
            .collect()
    }
}

/// Top-left coordinate of a hole of side `length` centred at `center`,
/// clamped to the image origin.
pub fn hole_origin(center: u32, length: u32) -> u32 {
    center.saturating_sub(length / 2)
}

// ============================================================================
// Cutout
// ============================================================================

/// Paints `n_holes` black rectangles onto the image with probability `prob`.
///
/// Each call draws one width multiplier `U ~ [1 - ratio, 1 + ratio]`; every
/// hole is `floor(length * U)` wide and `length` tall. Holes are placed
/// independently and may overlap or run past the image border.
///
/// # Example
/// ```ignore
/// let cutout = Cutout::new(2, 32, 0.2, None, None, 0.5)?;
/// let augmented = cutout.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct Cutout {
    holes: HoleSampler,
    ratio: f32,
    prob: f64,
}

impl Cutout {
    pub fn new(
        n_holes: u32,
        length: u32,
        ratio: f32,
        h_range: Option<[u32; 2]>,
        w_range: Option<[u32; 2]>,
        prob: f64,
    ) -> Result<Self> {
        ensure!(
            (0.0..1.0).contains(&ratio),
            AugmentError::invalid_parameter("ratio", ratio)
        );
        check_probability("prob", prob)?;
        Ok(Self {
            holes: HoleSampler::new(n_holes, length, h_range, w_range)?,
            ratio,
            prob,
        })
    }

    fn mask_width(&self) -> u32 {
        let jitter = worker_gen_uniform(1.0 - self.ratio, 1.0 + self.ratio);
        ((self.holes.length as f32 * jitter) as u32).max(1)
    }
}

impl Transform<DynamicImage, DynamicImage> for Cutout {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if !worker_gen_bool(self.prob) {
            return Ok(img);
        }
        let (width, height) = img.dimensions();
        let mask = RgbImage::new(self.mask_width(), self.holes.length);
        let length = self.holes.length;
        let centers = self.holes.centers(width, height);

        Ok(ops::map_rgb(img, |rgb| {
            let mut out = rgb.clone();
            for (x, y) in centers {
                let (x1, y1) = (hole_origin(x, length), hole_origin(y, length));
                imageops::replace(&mut out, &mask, x1 as i64, y1 as i64);
            }
            out
        }))
    }
}

// ============================================================================
// CutAddNoise
// ============================================================================

/// Sorted `.jpg` files directly inside a directory.
#[derive(Debug, Clone)]
pub struct NoisePool {
    paths: Vec<PathBuf>,
}

impl NoisePool {
    /// Lists `dir` once. Fails when the directory cannot be read or holds no
    /// file with a `jpg` extension.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self, AugmentError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| AugmentError::noise_image(dir, e))?;
            let is_jpg = entry.path().extension().is_some_and(|ext| ext == "jpg");
            if entry.file_type().is_file() && is_jpg {
                paths.push(entry.into_path());
            }
        }
        if paths.is_empty() {
            return Err(AugmentError::EmptyNoisePool {
                dir: dir.to_path_buf(),
            });
        }
        debug!(dir = %dir.display(), images = paths.len(), "Noise pool loaded");
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Decodes a random pool member as RGB.
    fn sample(&self) -> Result<RgbImage, AugmentError> {
        let path = &self.paths[worker_gen_index(self.paths.len())];
        let noise = image::open(path).map_err(|e| AugmentError::noise_image(path, e))?;
        Ok(noise.to_rgb8())
    }
}

/// Replaces `n_holes` square patches with the same region of a random noise
/// image, with probability `prob`.
///
/// The noise image is resized to the input's size once per call, so a patch
/// always comes from the matching location. Patches are clipped to the image.
///
/// # Example
/// ```ignore
/// let noise = CutAddNoise::new(1, 64, "data/noise", None, None, 0.5)?;
/// let augmented = noise.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct CutAddNoise {
    holes: HoleSampler,
    pool: NoisePool,
    prob: f64,
}

impl CutAddNoise {
    pub fn new(
        n_holes: u32,
        length: u32,
        noisy_src: impl AsRef<Path>,
        h_range: Option<[u32; 2]>,
        w_range: Option<[u32; 2]>,
        prob: f64,
    ) -> Result<Self> {
        check_probability("prob", prob)?;
        let holes = HoleSampler::new(n_holes, length, h_range, w_range)?;
        Ok(Self {
            holes,
            pool: NoisePool::scan(noisy_src)?,
            prob,
        })
    }

    pub fn pool(&self) -> &NoisePool {
        &self.pool
    }
}

impl Transform<DynamicImage, DynamicImage> for CutAddNoise {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        if !worker_gen_bool(self.prob) {
            return Ok(img);
        }
        let (width, height) = img.dimensions();
        let noise = imageops::resize(&self.pool.sample()?, width, height, FilterType::CatmullRom);
        let half = self.holes.length / 2;
        let centers = self.holes.centers(width, height);

        Ok(ops::map_rgb(img, |rgb| {
            let mut out = rgb.clone();
            for (x, y) in centers {
                let (x1, y1) = (x.saturating_sub(half), y.saturating_sub(half));
                let x2 = width.min(x.saturating_add(half));
                let y2 = height.min(y.saturating_add(half));
                if x2 <= x1 || y2 <= y1 {
                    continue;
                }
                let patch = imageops::crop_imm(&noise, x1, y1, x2 - x1, y2 - y1).to_image();
                imageops::replace(&mut out, &patch, x1 as i64, y1 as i64);
            }
            out
        }))
    }
}
