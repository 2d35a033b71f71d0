//! Annotation-aware augmentation.
//!
//! The [`catalog`] declares what can be applied and how parameters are
//! sampled, [`ops`] renders pixels, the geometry module moves boxes along
//! with them, and the [`executor`] runs batches.
//!
//! Kinds are applied independently and their outputs unioned: enabling
//! brightness with 3 samples and rotation with 2 yields 5 derived images per
//! source image, never a composed brightness-then-rotation image.

pub mod catalog;
pub mod executor;
mod geometry;
pub mod ops;

pub use catalog::{
    default_specs, LabelRule, ParamDomain, ParamShape, TransformCatalog, TransformFamily,
    TransformKind, TransformParams, TransformSpec,
};
pub use executor::{augment, AugmentationOutcome, Augmenter};
pub use geometry::{propagate_boxes, Affine};
