//! Annotation model for boxforge.
//!
//! This module defines the data every other stage works on: labeled images,
//! their bounding boxes, and the dataset-wide class list.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Newtype ids and coordinate-space markers keep image
//!    ids, box ids, pixel and normalized coordinates apart at compile time.
//!
//! 2. **Labeling-tool shape**: [`BoundingBox`] stores `x, y, width, height`
//!    in pixels as produced by labeling tools; geometry is done on
//!    [`BBoxXYXY`].
//!
//! 3. **Stable class ids**: [`ClassList`] fixes the class ordering once for
//!    the whole dataset.
//!
//! # Example
//!
//! ```
//! use boxforge::ir::{BoundingBox, ClassList, LabeledImage, PixelData};
//!
//! let image = LabeledImage::new("img1", "street.jpg", PixelData::File("street.jpg".into()))
//!     .with_size(800, 600)
//!     .with_box(BoundingBox::new(1u64, 100.0, 100.0, 200.0, 150.0, "car"));
//!
//! let classes = ClassList::discover([&image]);
//! assert_eq!(classes.id_of("car"), Some(0));
//! ```

mod bbox;
mod classes;
mod coord;
mod ids;
pub mod io_json;
mod model;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use classes::ClassList;
pub use coord::{Coord, Normalized, Pixel};
pub use ids::{BoxId, ImageId};
pub use model::{BoundingBox, ImageSize, LabeledImage, PixelData, Provenance};
