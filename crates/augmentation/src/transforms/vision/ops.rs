//! Functional image kernels shared by the transform structs.
//!
//! Colour kernels work on 8-bit RGB; [`map_rgb`] lifts them onto any
//! `DynamicImage` while keeping its layout (gray stays gray, alpha is kept).

use anyhow::{ensure, Context, Result};
use image::buffer::ConvertBuffer;
use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::separable_filter_equal;
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use imageproc::stats::histogram;

/// Runs an RGB kernel on any image layout.
pub fn map_rgb(img: DynamicImage, f: impl FnOnce(&RgbImage) -> RgbImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(f(&rgb)),
        DynamicImage::ImageLuma8(gray) => {
            let out = f(&gray.convert());
            DynamicImage::ImageLuma8(out.convert())
        }
        DynamicImage::ImageRgba8(mut rgba) => {
            let out = f(&rgba.convert());
            for (dst, src) in rgba.pixels_mut().zip(out.pixels()) {
                dst.0[..3].copy_from_slice(&src.0);
            }
            DynamicImage::ImageRgba8(rgba)
        }
        other => DynamicImage::ImageRgb8(f(&other.to_rgb8())),
    }
}

/// Applies a per-channel lookup table to every colour sample.
pub fn apply_lut(img: &RgbImage, luts: [&[u8; 256]; 3]) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = luts[c][px.0[c] as usize];
        }
    }
    out
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// ITU-R 601-2 luma, as used by PIL's `L` conversion.
#[inline]
pub fn luma(px: &Rgb<u8>) -> f32 {
    0.299 * px.0[0] as f32 + 0.587 * px.0[1] as f32 + 0.114 * px.0[2] as f32
}

/// Grayscale with the channel count preserved.
pub fn grayscale(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let l = clamp_u8(luma(px));
        *px = Rgb([l, l, l]);
    }
    out
}

/// `ratio * a + (1 - ratio) * b`, saturated to 8 bits.
pub fn blend(a: &RgbImage, b: &RgbImage, ratio: f32) -> RgbImage {
    let mut out = a.clone();
    for (dst, src) in out.pixels_mut().zip(b.pixels()) {
        for c in 0..3 {
            dst.0[c] = clamp_u8(ratio * dst.0[c] as f32 + (1.0 - ratio) * src.0[c] as f32);
        }
    }
    out
}

pub fn adjust_brightness(img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = clamp_u8(px.0[c] as f32 * factor);
        }
    }
    out
}

pub fn adjust_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let count = (img.width() as f32 * img.height() as f32).max(1.0);
    let mean = img.pixels().map(|p| luma(p).round()).sum::<f32>() / count;
    let mut out = img.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px.0[c] = clamp_u8(factor * px.0[c] as f32 + (1.0 - factor) * mean);
        }
    }
    out
}

pub fn adjust_saturation(img: &RgbImage, factor: f32) -> RgbImage {
    blend(img, &grayscale(img), factor)
}

/// Shifts hue by `shift` turns (`-0.5..=0.5`).
pub fn adjust_hue(img: &RgbImage, shift: f32) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let [r, g, b] = px.0.map(|v| v as f32 / 255.0);
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (r, g, b) = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
        *px = Rgb([clamp_u8(r * 255.0), clamp_u8(g * 255.0), clamp_u8(b * 255.0)]);
    }
    out
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta == 0.0 {
        return (0.0, s, max);
    }
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (h / 6.0, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h6 = h * 6.0;
    let sector = h6.floor() as i32 % 6;
    let f = h6 - h6.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Blends with a 3x3 smoothed copy; borders keep their original values.
pub fn adjust_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w <= 2 || h <= 2 {
        return img.clone();
    }
    let smooth: RgbImage = imageops::filter3x3(img, &[1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0]);
    let mut degenerate = img.clone();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            degenerate.put_pixel(x, y, *smooth.get_pixel(x, y));
        }
    }
    blend(img, &degenerate, factor)
}

pub fn invert(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    imageops::invert(&mut out);
    out
}

/// Keeps the `bits` most significant bits of every sample.
pub fn posterize(img: &RgbImage, bits: u8) -> RgbImage {
    let mask: u8 = if bits >= 8 { 0xFF } else { !(0xFFu8 >> bits) };
    let mut out = img.clone();
    for px in out.pixels_mut() {
        px.0 = px.0.map(|v| v & mask);
    }
    out
}

/// Inverts samples at or above `threshold`.
pub fn solarize(img: &RgbImage, threshold: f32) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        px.0 = px.0.map(|v| if v as f32 >= threshold { 255 - v } else { v });
    }
    out
}

/// Stretches each channel to the full `0..=255` range.
pub fn autocontrast(img: &RgbImage) -> RgbImage {
    let mut luts = [[0u8; 256]; 3];
    for (c, lut) in luts.iter_mut().enumerate() {
        let (lo, hi) = img
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p.0[c]), hi.max(p.0[c])));
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = if hi <= lo {
                v as u8
            } else {
                clamp_u8((v as f32 - lo as f32) * 255.0 / (hi - lo) as f32)
            };
        }
    }
    apply_lut(img, [&luts[0], &luts[1], &luts[2]])
}

/// Per-channel histogram equalization. Channels holding a single value are
/// left as they are.
pub fn equalize(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = img.clone();
    for c in 0..3 {
        let channel = GrayImage::from_fn(w, h, |x, y| Luma([img.get_pixel(x, y).0[c]]));
        let used = histogram(&channel).channels[0]
            .iter()
            .filter(|&&n| n > 0)
            .count();
        if used < 2 {
            continue;
        }
        let equalized = equalize_histogram(&channel);
        for (px, eq) in out.pixels_mut().zip(equalized.pixels()) {
            px.0[c] = eq.0[0];
        }
    }
    out
}

/// Normalized 1-D Gaussian kernel of odd length `size`.
pub fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - half;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable Gaussian blur with an explicit `kernel_size`; edge pixels are
/// replicated past the border.
pub fn gaussian_blur(img: &RgbImage, kernel_size: usize, sigma: f32) -> RgbImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    separable_filter_equal(img, &gaussian_kernel(kernel_size, sigma))
}

/// Affine parameters in the torchvision convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    /// Counter-clockwise rotation in degrees
    pub angle: f32,
    /// Translation in pixels
    pub translate: (f32, f32),
    pub scale: f32,
    /// Shear along x and y in degrees
    pub shear: (f32, f32),
}

impl Default for Affine {
    fn default() -> Self {
        Self {
            angle: 0.0,
            translate: (0.0, 0.0),
            scale: 1.0,
            shear: (0.0, 0.0),
        }
    }
}

impl Affine {
    /// Forward (input → output) projection about `center`.
    pub fn projection(&self, center: (f32, f32)) -> Result<Projection> {
        let (cx, cy) = center;
        let (tx, ty) = self.translate;
        let shear = Projection::from_matrix([
            1.0,
            self.shear.0.to_radians().tan(),
            0.0,
            self.shear.1.to_radians().tan(),
            1.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
        .with_context(|| format!("Degenerate shear {:?}", self.shear))?;

        Ok(Projection::translate(cx + tx, cy + ty)
            * Projection::rotate(-self.angle.to_radians())
            * shear
            * Projection::scale(self.scale, self.scale)
            * Projection::translate(-cx, -cy))
    }
}

/// Warps with bilinear sampling; uncovered pixels take `fill`.
pub fn warp_affine(img: &DynamicImage, affine: &Affine, center: Option<(f32, f32)>, fill: u8) -> Result<DynamicImage> {
    ensure!(affine.scale > 0.0, "Affine scale must be positive (got {})", affine.scale);
    let center = center.unwrap_or((img.width() as f32 * 0.5, img.height() as f32 * 0.5));
    let projection = affine.projection(center)?;
    Ok(match img {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(warp(
            gray,
            &projection,
            Interpolation::Bilinear,
            Luma([fill]),
        )),
        DynamicImage::ImageRgba8(rgba) => DynamicImage::ImageRgba8(warp(
            rgba,
            &projection,
            Interpolation::Bilinear,
            Rgba([fill, fill, fill, 255]),
        )),
        other => DynamicImage::ImageRgb8(warp(
            &other.to_rgb8(),
            &projection,
            Interpolation::Bilinear,
            Rgb([fill, fill, fill]),
        )),
    })
}

/// Pads left/right by `pad_x` and top/bottom by `pad_y` pixels of `fill`.
pub fn pad(img: &DynamicImage, pad_x: u32, pad_y: u32, fill: [u8; 3]) -> DynamicImage {
    if pad_x == 0 && pad_y == 0 {
        return img.clone();
    }
    let mut canvas = RgbImage::from_pixel(
        img.width() + 2 * pad_x,
        img.height() + 2 * pad_y,
        Rgb(fill),
    );
    imageops::replace(&mut canvas, &img.to_rgb8(), pad_x as i64, pad_y as i64);
    DynamicImage::ImageRgb8(canvas)
}

/// Crops `(height, width)` at `(top, left)`; regions outside the image are
/// zero-filled, so oversized crops pad like torchvision's `CenterCrop`.
pub fn crop_padded(img: &DynamicImage, top: i64, left: i64, height: u32, width: u32) -> DynamicImage {
    let inside = top >= 0
        && left >= 0
        && top + height as i64 <= img.height() as i64
        && left + width as i64 <= img.width() as i64;
    if inside {
        return img.crop_imm(left as u32, top as u32, width, height);
    }
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, &img.to_rgb8(), -left, -top);
    DynamicImage::ImageRgb8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 128])
        })
    }

    #[test]
    fn test_brightness_zero_is_black() {
        let out = adjust_brightness(&gradient(4, 4), 0.0);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_identity_factors() {
        let img = gradient(5, 5);
        assert_eq!(adjust_brightness(&img, 1.0), img);
        assert_eq!(adjust_contrast(&img, 1.0), img);
        assert_eq!(adjust_saturation(&img, 1.0), img);
        assert_eq!(adjust_sharpness(&img, 1.0), img);
    }

    #[test]
    fn test_hue_roundtrip_full_turn() {
        let img = gradient(6, 6);
        let shifted = adjust_hue(&img, 0.0);
        for (a, b) in img.pixels().zip(shifted.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let img = gradient(3, 3);
        assert_eq!(invert(&invert(&img)), img);
    }

    #[test]
    fn test_posterize_masks_low_bits() {
        let img = RgbImage::from_pixel(1, 1, Rgb([0xFF, 0x0F, 0x80]));
        assert_eq!(posterize(&img, 4).get_pixel(0, 0).0, [0xF0, 0x00, 0x80]);
    }

    #[test]
    fn test_autocontrast_stretches_range() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        img.put_pixel(1, 0, Rgb([150, 150, 150]));
        let out = autocontrast(&img);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_equalize_flat_image_unchanged() {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        assert_eq!(equalize(&img), img);
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        let k = gaussian_kernel(5, 1.0);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn test_equalize_spreads_two_levels() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([10, 10, 10]));
        img.put_pixel(1, 0, Rgb([20, 20, 20]));
        let out = equalize(&img);
        assert_eq!(out.get_pixel(1, 0).0, [255, 255, 255]);
        assert!(out.get_pixel(0, 0).0[0] > 10);
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let img = RgbImage::from_pixel(5, 4, Rgb([40, 80, 120]));
        let out = gaussian_blur(&img, 3, 1.5);
        assert_eq!(out.dimensions(), img.dimensions());
        for (a, b) in out.pixels().zip(img.pixels()) {
            for c in 0..3 {
                assert!(a.0[c].abs_diff(b.0[c]) <= 1, "{a:?} drifted from {b:?}");
            }
        }
    }

    #[test]
    fn test_blur_spreads_a_bright_dot() {
        let mut img = RgbImage::new(5, 5);
        img.put_pixel(2, 2, Rgb([255, 255, 255]));
        let out = gaussian_blur(&img, 3, 1.0);
        assert!(out.get_pixel(2, 2).0[0] < 255);
        assert!(out.get_pixel(1, 2).0[0] > 0);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_map_rgb_keeps_layout() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([10])));
        let out = map_rgb(gray, invert);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 7])));
        let out = map_rgb(rgba, invert).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 7]);
    }

    #[test]
    fn test_identity_affine_keeps_interior() -> Result<()> {
        let img = DynamicImage::ImageRgb8(gradient(8, 8));
        let out = warp_affine(&img, &Affine::default(), None, 0)?.to_rgb8();
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(4, 4), img.to_rgb8().get_pixel(4, 4));
        Ok(())
    }

    #[test]
    fn test_crop_padded_outside_is_black() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])));
        let out = crop_padded(&img, -1, -1, 4, 4).to_rgb8();
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 1).0, [9, 9, 9]);
    }
}
