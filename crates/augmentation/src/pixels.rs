use crate::error::AugmentError;
use image::DynamicImage;
use ndarray::Array3;

/// Channel-first `[C, H, W]` float tensor.
pub type Tensor = Array3<f32>;

/// The value flowing between pipeline steps.
///
/// Pipelines start on an image and may end on a tensor once a conversion
/// step (`to_tensor`, `to_tensor_without_div`) has run.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Image(DynamicImage),
    Tensor(Tensor),
}

impl Pixels {
    pub fn into_image(self) -> Result<DynamicImage, AugmentError> {
        match self {
            Pixels::Image(img) => Ok(img),
            Pixels::Tensor(_) => Err(AugmentError::UnexpectedInput {
                transform: "into_image",
                expected: "image",
            }),
        }
    }

    pub fn into_tensor(self) -> Result<Tensor, AugmentError> {
        match self {
            Pixels::Tensor(t) => Ok(t),
            Pixels::Image(_) => Err(AugmentError::UnexpectedInput {
                transform: "into_tensor",
                expected: "tensor",
            }),
        }
    }

    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            Pixels::Image(img) => Some(img),
            Pixels::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Pixels::Tensor(t) => Some(t),
            Pixels::Image(_) => None,
        }
    }
}

impl From<DynamicImage> for Pixels {
    fn from(img: DynamicImage) -> Self {
        Pixels::Image(img)
    }
}

impl From<Tensor> for Pixels {
    fn from(t: Tensor) -> Self {
        Pixels::Tensor(t)
    }
}
