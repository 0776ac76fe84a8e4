use crate::pixels::Tensor;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::{Array3, Axis};

// ============================================================================
// ToTensor / ToTensorNoDiv
// ============================================================================

/// Converts an image to a channel-first f32 tensor in [0.0, 1.0] range.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | RGB           | `[3, H, W]`  |
/// | RGBA          | `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
///
/// # Example
/// ```ignore
/// let tensor = ToTensor.apply(image)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform<DynamicImage, Tensor> for ToTensor {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let mut tensor = image_to_chw(img)?;
        tensor.mapv_inplace(|v| v / 255.0);
        Ok(tensor)
    }
}

/// Like [`ToTensor`] but keeps the raw 0..=255 intensities.
///
/// Used by pipelines whose normalization statistics are expressed on the
/// 8-bit scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensorNoDiv;

impl Transform<DynamicImage, Tensor> for ToTensorNoDiv {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        image_to_chw(img)
    }
}

fn image_to_chw(img: DynamicImage) -> Result<Tensor> {
    let (width, height) = img.dimensions();
    ensure!(
        width > 0 && height > 0,
        "Image dimensions must be positive (got {}x{})",
        width,
        height
    );

    let (channels, raw) = match img {
        DynamicImage::ImageLuma8(img) => (1, img.into_raw()),
        DynamicImage::ImageRgb8(img) => (3, img.into_raw()),
        DynamicImage::ImageRgba8(img) => (4, img.into_raw()),
        // Everything else goes through RGB
        other => (3, other.to_rgb8().into_raw()),
    };

    let hwc = Array3::from_shape_vec(
        (height as usize, width as usize, channels),
        raw.into_iter().map(f32::from).collect(),
    )
    .context("Pixel buffer does not match image dimensions")?;

    Ok(hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
}

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes tensors using channel-wise statistics.
///
/// # Mathematical Operation:
/// ```text
/// output[c,h,w] = (input[c,h,w] - mean[c]) / std[c]
/// ```
///
/// # Example
/// ```ignore
/// let norm = Normalize::imagenet();
/// let normalized = norm.apply(tensor)?;
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "The mean and standard deviation for normalization must match in dimension \
             (mean has {}, std has {})",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|s| *s != 0.0),
            "Normalization std must be non-zero (got {:?})",
            std
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// ImageNet standard normalization (RGB)
    pub fn imagenet() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

impl Transform<Tensor, Tensor> for Normalize {
    fn apply(&self, mut tensor: Tensor) -> Result<Tensor> {
        let num_channels = tensor.len_of(Axis(0));
        ensure!(
            num_channels == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            num_channels,
            self.mean.len()
        );

        for (c, mut channel) in tensor.axis_iter_mut(Axis(0)).enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            channel.mapv_inplace(|v| (v - mean) / std);
        }
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 2);
        for x in 0..3 {
            for y in 0..2 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 255) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_to_tensor() -> Result<()> {
        let tensor = ToTensor.apply(test_rgb_image())?;
        assert_eq!(tensor.dim(), (3, 2, 3)); // CHW format

        // Verify normalization to [0,1]
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 0, 2]] - 170.0 / 255.0).abs() < 1e-6);
        assert!((tensor[[1, 1, 0]] - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_to_tensor_without_div_keeps_scale() -> Result<()> {
        let tensor = ToTensorNoDiv.apply(test_rgb_image())?;
        assert_eq!(tensor[[0, 0, 1]], 85.0);
        assert_eq!(tensor[[2, 1, 2]], 128.0);
        Ok(())
    }

    #[test]
    fn test_to_tensor_grayscale_single_channel() -> Result<()> {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 5, Luma([51])));
        let tensor = ToTensor.apply(gray)?;
        assert_eq!(tensor.dim(), (1, 5, 4));
        assert!((tensor[[0, 4, 3]] - 0.2).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_normalize() -> Result<()> {
        let tensor = Array3::<f32>::ones((3, 4, 4));
        let norm = Normalize::new(&[1.0; 3], &[1.0; 3])?;

        let normalized = norm.apply(tensor)?;
        assert!(normalized.iter().all(|v| v.abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_normalize_channel_mismatch() -> Result<()> {
        let tensor = Array3::<f32>::zeros((1, 2, 2));
        assert!(Normalize::imagenet().apply(tensor).is_err());
        assert!(Normalize::new(&[0.5, 0.5], &[0.5]).is_err());
        Ok(())
    }
}
