#![allow(dead_code)]

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

/// Image whose pixels all differ, so any geometric or colour change shows up.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) * 3 % 256) as u8])
    }))
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Writes `count` solid-colour `.jpg` noise images into `dir`.
pub fn write_noise_images(dir: &Path, count: usize) -> Result<()> {
    for i in 0..count {
        let shade = (i * 40 % 256) as u8;
        RgbImage::from_pixel(16, 16, Rgb([shade, 0, 255 - shade]))
            .save(dir.join(format!("noise_{i}.jpg")))?;
    }
    Ok(())
}
