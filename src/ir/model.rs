//! Core annotation model: labeled images and their bounding boxes.
//!
//! These types are plain data. The upload/labeling layer creates original
//! [`LabeledImage`]s, the augmentation executor creates derived ones, and
//! the partitioner and exporters only read them.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::coord::Pixel;
use super::ids::{BoxId, ImageId};
use crate::augment::TransformKind;

/// An axis-aligned bounding box annotation in source pixel space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Identifier, unique within the owning image.
    pub id: BoxId,

    /// Left edge in pixels.
    pub x: f64,

    /// Top edge in pixels.
    pub y: f64,

    pub width: f64,

    pub height: f64,

    /// Class label as typed by the user.
    pub class_name: String,
}

impl BoundingBox {
    /// Creates a new box from its top-left corner and size.
    pub fn new(
        id: impl Into<BoxId>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            class_name: class_name.into(),
        }
    }

    /// Returns the box as an XYXY rectangle.
    #[inline]
    pub fn to_xyxy(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xywh(self.x, self.y, self.width, self.height)
    }

    /// Returns a copy of this box occupying `rect`, keeping id and class.
    pub fn with_rect(&self, rect: BBoxXYXY<Pixel>) -> Self {
        let (x, y, width, height) = rect.to_xywh();
        Self {
            id: self.id,
            x,
            y,
            width,
            height,
            class_name: self.class_name.clone(),
        }
    }

    /// Clamps the box into the image and returns `None` if nothing with
    /// positive area remains.
    pub fn clamped(&self, image_width: u32, image_height: u32) -> Option<Self> {
        let rect = self
            .to_xyxy()
            .clamp_to(image_width as f64, image_height as f64);
        if rect.is_degenerate() {
            None
        } else {
            Some(self.with_rect(rect))
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Decoded pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Handle to the encoded bytes of an image.
///
/// Originals usually point at a file; derived images hold the encoded JPEG
/// produced by the executor. Cloning is cheap for both variants.
#[derive(Clone)]
pub enum PixelData {
    /// Encoded image bytes held in memory.
    Encoded(Arc<[u8]>),
    /// Encoded image stored on disk.
    File(PathBuf),
}

impl PixelData {
    /// Wraps encoded bytes.
    pub fn encoded(bytes: impl Into<Arc<[u8]>>) -> Self {
        PixelData::Encoded(bytes.into())
    }

    /// Reads the encoded bytes, borrowing when they are already in memory.
    pub fn load(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            PixelData::Encoded(bytes) => Ok(Cow::Borrowed(&bytes[..])),
            PixelData::File(path) => std::fs::read(path).map(Cow::Owned),
        }
    }

    /// Returns the backing path for file handles.
    pub fn path(&self) -> Option<&Path> {
        match self {
            PixelData::File(path) => Some(path),
            PixelData::Encoded(_) => None,
        }
    }
}

impl fmt::Debug for PixelData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelData::Encoded(bytes) => write!(f, "Encoded({} bytes)", bytes.len()),
            PixelData::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

/// Where a derived image came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Id of the original image the transform was applied to.
    pub source: ImageId,

    pub kind: TransformKind,

    /// Position of the sample within the transform's sample set.
    pub sample_index: usize,

    /// Sampled parameter value (intensity for stochastic transforms).
    pub value: f64,
}

/// An image together with its bounding-box annotations.
#[derive(Clone, Debug)]
pub struct LabeledImage {
    pub id: ImageId,

    /// File name used inside exported bundles (e.g. `cat_01.png`).
    pub file_name: String,

    pub pixels: PixelData,

    /// Known once the image has been decoded or probed.
    pub size: Option<ImageSize>,

    /// Ordered annotations; ids are unique within the image.
    pub boxes: Vec<BoundingBox>,

    /// `None` for originals.
    pub provenance: Option<Provenance>,
}

impl LabeledImage {
    /// Creates an original image with no boxes and unknown size.
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, pixels: PixelData) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            pixels,
            size: None,
            boxes: Vec::new(),
            provenance: None,
        }
    }

    /// Sets the known pixel size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some(ImageSize::new(width, height));
        self
    }

    /// Appends a bounding box.
    pub fn with_box(mut self, bbox: BoundingBox) -> Self {
        self.boxes.push(bbox);
        self
    }

    /// Replaces the bounding boxes.
    pub fn with_boxes(mut self, boxes: Vec<BoundingBox>) -> Self {
        self.boxes = boxes;
        self
    }

    /// True for images produced by the augmentation executor.
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.provenance.is_some()
    }

    /// Images without any box take no part in augmentation or export.
    #[inline]
    pub fn is_eligible(&self) -> bool {
        !self.boxes.is_empty()
    }

    /// File name without its extension.
    pub fn file_stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.file_name)
    }
}
