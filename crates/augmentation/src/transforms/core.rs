use crate::error::AugmentError;
use crate::pixels::{Pixels, Tensor};
use anyhow::{Context, Result};
use image::DynamicImage;
use std::marker::PhantomData;
use std::sync::Arc;

/// Defines the core `Transform` trait for composable augmentation pipelines.
///
/// The `Transform<I, O>` trait represents one step converting an input of
/// type `I` to an output of type `O`. Steps may draw from the worker RNG
/// (see [`crate::rng`]) but hold no mutable state, so `apply` takes `&self`.
///
/// Statically typed steps can be chained via `.then(...)`. Pipelines
/// compiled from configuration use the type-erased [`DynTransform`] over
/// [`Pixels`] instead.
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// A step of a compiled pipeline.
pub type DynTransform = dyn Transform<Pixels, Pixels>;

/// Owned step as produced by registry factories.
pub type BoxedTransform = Box<DynTransform>;

/// Step handle held by pipelines; class-wise sub-pipelines share these.
pub type SharedTransform = Arc<DynTransform>;

/// A chain of two transforms (`A` -> `B`)
/// - `PhantomData<M>` enforces intermediate type alignment.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Creates a new transform chain.
    /// Use [`Transform::then`] for better ergonomics.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}

fn short_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

// ============================================================================
// Adapters onto `Pixels`
// ============================================================================

/// Lifts an image-to-image transform into a pipeline step.
#[derive(Debug, Clone)]
pub struct OnImage<T>(pub T);

impl<T> Transform<Pixels, Pixels> for OnImage<T>
where
    T: Transform<DynamicImage, DynamicImage>,
{
    fn apply(&self, input: Pixels) -> Result<Pixels> {
        match input {
            Pixels::Image(img) => self.0.apply(img).map(Pixels::Image),
            Pixels::Tensor(_) => Err(AugmentError::UnexpectedInput {
                transform: short_name::<T>(),
                expected: "image",
            }
            .into()),
        }
    }
}

/// Lifts a tensor-to-tensor transform into a pipeline step.
#[derive(Debug, Clone)]
pub struct OnTensor<T>(pub T);

impl<T> Transform<Pixels, Pixels> for OnTensor<T>
where
    T: Transform<Tensor, Tensor>,
{
    fn apply(&self, input: Pixels) -> Result<Pixels> {
        match input {
            Pixels::Tensor(t) => self.0.apply(t).map(Pixels::Tensor),
            Pixels::Image(_) => Err(AugmentError::UnexpectedInput {
                transform: short_name::<T>(),
                expected: "tensor",
            }
            .into()),
        }
    }
}

/// Lifts an image-to-tensor conversion into a pipeline step.
#[derive(Debug, Clone)]
pub struct IntoTensor<T>(pub T);

impl<T> Transform<Pixels, Pixels> for IntoTensor<T>
where
    T: Transform<DynamicImage, Tensor>,
{
    fn apply(&self, input: Pixels) -> Result<Pixels> {
        match input {
            Pixels::Image(img) => self.0.apply(img).map(Pixels::Tensor),
            Pixels::Tensor(_) => Err(AugmentError::UnexpectedInput {
                transform: short_name::<T>(),
                expected: "image",
            }
            .into()),
        }
    }
}
