//! Runtime pipeline containers: [`Compose`] and [`RandomChoice`].

use crate::error::AugmentError;
use crate::introspect::is_spatial;
use crate::pixels::Pixels;
use crate::rng::worker_gen_index;
use crate::transforms::core::{SharedTransform, Transform};
use anyhow::{ensure, Context, Result};
use std::fmt;

/// One slot of a compiled pipeline.
///
/// `kinds` lists the registry names the slot may run: the step's own name
/// for a plain step, every candidate for a choice group.
#[derive(Clone)]
pub struct Step {
    name: String,
    kinds: Vec<String>,
    transform: SharedTransform,
}

impl Step {
    pub fn new(name: impl Into<String>, transform: SharedTransform) -> Self {
        let name = name.into();
        Self {
            kinds: vec![name.clone()],
            name,
            transform,
        }
    }

    pub(crate) fn with_kinds(
        name: impl Into<String>,
        kinds: Vec<String>,
        transform: SharedTransform,
    ) -> Self {
        Self {
            name: name.into(),
            kinds,
            transform,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn transform(&self) -> &SharedTransform {
        &self.transform
    }

    /// True when any transform this slot may run alters geometry.
    pub fn is_spatial(&self) -> bool {
        self.kinds.iter().any(|k| is_spatial(k))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .finish()
    }
}

// ============================================================================
// Compose
// ============================================================================

/// An ordered pipeline of steps applied left to right.
///
/// # Example
/// ```ignore
/// let pipeline = create_aug_transforms(&json!({
///     "resize": {"size": 256},
///     "random_horizonflip": "no_params",
///     "to_tensor": "no_params",
/// }))?;
/// let tensor = pipeline.apply(image.into())?.into_tensor()?;
/// ```
#[derive(Clone, Default)]
pub struct Compose {
    steps: Vec<Step>,
}

impl Compose {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Builds a pipeline from the steps at `indices`, in the given order.
    /// Indices may repeat; steps are shared, not rebuilt.
    pub fn select(&self, indices: &[usize]) -> Result<Compose, AugmentError> {
        indices
            .iter()
            .map(|&index| {
                self.steps
                    .get(index)
                    .cloned()
                    .ok_or_else(|| AugmentError::ClassIndexOutOfRange {
                        class: String::new(),
                        index,
                        len: self.steps.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Compose::new)
    }

    /// True when any step may alter image geometry, which invalidates
    /// box or keypoint overlays drawn on the input.
    pub fn has_spatial_step(&self) -> bool {
        self.steps.iter().any(Step::is_spatial)
    }
}

impl Transform<Pixels, Pixels> for Compose {
    fn apply(&self, input: Pixels) -> Result<Pixels> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(input, |data, (i, step)| {
                step.transform
                    .apply(data)
                    .with_context(|| format!("Step {} ('{}') failed", i, step.name))
            })
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

// ============================================================================
// RandomChoice
// ============================================================================

/// Applies exactly one candidate per call, drawn uniformly at random.
pub struct RandomChoice {
    candidates: Vec<SharedTransform>,
}

impl RandomChoice {
    pub fn new(candidates: Vec<SharedTransform>) -> Result<Self> {
        ensure!(
            !candidates.is_empty(),
            AugmentError::InvalidConfig {
                reason: "random_choice needs at least one candidate".into(),
            }
        );
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl Transform<Pixels, Pixels> for RandomChoice {
    fn apply(&self, input: Pixels) -> Result<Pixels> {
        let pick = worker_gen_index(self.candidates.len());
        self.candidates[pick].apply(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seed_rng;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use std::sync::Arc;

    /// Paints the top-left pixel with a fixed value so tests can see which step ran.
    struct Mark(u8);
    impl Transform<Pixels, Pixels> for Mark {
        fn apply(&self, input: Pixels) -> Result<Pixels> {
            let mut img = input.into_image()?.to_rgb8();
            img.put_pixel(0, 0, Rgb([self.0, 0, 0]));
            Ok(Pixels::Image(DynamicImage::ImageRgb8(img)))
        }
    }

    fn marker_of(p: Pixels) -> Result<u8> {
        Ok(p.into_image()?.get_pixel(0, 0)[0])
    }

    fn blank() -> Pixels {
        Pixels::Image(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
    }

    #[test]
    fn test_compose_applies_in_order() -> Result<()> {
        let pipeline = Compose::new(vec![
            Step::new("a", Arc::new(Mark(1))),
            Step::new("b", Arc::new(Mark(2))),
        ]);
        assert_eq!(pipeline.step_names(), vec!["a", "b"]);
        assert_eq!(marker_of(pipeline.apply(blank())?)?, 2);
        Ok(())
    }

    #[test]
    fn test_select_reorders_and_shares() -> Result<()> {
        let pipeline = Compose::new(vec![
            Step::new("a", Arc::new(Mark(1))),
            Step::new("b", Arc::new(Mark(2))),
            Step::new("c", Arc::new(Mark(3))),
        ]);
        let sub = pipeline.select(&[2, 0, 0])?;
        assert_eq!(sub.step_names(), vec!["c", "a", "a"]);
        assert!(Arc::ptr_eq(
            sub.steps()[1].transform(),
            pipeline.steps()[0].transform()
        ));
        assert!(pipeline.select(&[3]).is_err());
        Ok(())
    }

    #[test]
    fn test_random_choice_uses_every_candidate() -> Result<()> {
        seed_rng(3);
        let choice = RandomChoice::new(vec![Arc::new(Mark(1)), Arc::new(Mark(2))])?;
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[marker_of(choice.apply(blank())?)? as usize] = true;
        }
        assert!(seen[1] && seen[2]);
        Ok(())
    }

    #[test]
    fn test_random_choice_rejects_empty() {
        assert!(RandomChoice::new(Vec::new()).is_err());
    }

    #[test]
    fn test_failing_step_names_position() {
        let pipeline = Compose::new(vec![Step::new("mark", Arc::new(Mark(1)))]);
        let err = pipeline
            .apply(Pixels::Tensor(ndarray::Array3::zeros((1, 1, 1))))
            .unwrap_err();
        assert!(err.to_string().contains("Step 0 ('mark') failed"));
        assert!(err.downcast_ref::<AugmentError>().is_some());
    }
}
