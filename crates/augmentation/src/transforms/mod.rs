pub mod compose;
pub mod core;
pub mod vision;

pub use compose::{Compose, RandomChoice, Step};
pub use core::{BoxedTransform, Chain, DynTransform, IntoTensor, OnImage, OnTensor, SharedTransform, Transform};
