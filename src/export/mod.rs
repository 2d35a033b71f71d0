//! Dataset format exporters.
//!
//! Every exporter turns one [`DatasetSplit`] plus the dataset-wide
//! [`ClassList`] into a list of [`Artifact`]s. Exporters are pure: the same
//! split and class list always yield byte-identical artifacts. Writing them
//! anywhere is the archive builder's job.

mod coco;
mod voc;
mod yolo;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::BoxforgeError;
use crate::ir::{BoundingBox, ClassList, ImageSize, LabeledImage};
use crate::split::DatasetSplit;

pub use coco::CocoExporter;
pub use voc::VocExporter;
pub use yolo::YoloExporter;

/// One output file, addressed by its `/`-separated path inside the bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8 text; every exporter writes text.
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.contents).unwrap_or_default()
    }
}

/// Serializes splits into one dataset format.
pub trait Exporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// Label artifacts for one split.
    fn export(
        &self,
        split: &DatasetSplit,
        classes: &ClassList,
    ) -> Result<Vec<Artifact>, BoxforgeError>;

    /// Dataset-level artifacts such as class files.
    fn global_artifacts(&self, _classes: &ClassList) -> Vec<Artifact> {
        Vec::new()
    }
}

/// Supported dataset formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Ultralytics YOLO text labels.
    Yolo,
    /// COCO JSON, one file per split.
    Coco,
    /// Pascal VOC XML, one file per image.
    #[value(name = "voc", alias = "pascal")]
    Voc,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Yolo => "yolo",
            ExportFormat::Coco => "coco",
            ExportFormat::Voc => "voc",
        }
    }

    /// The exporter implementing this format.
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Yolo => Box::new(YoloExporter),
            ExportFormat::Coco => Box::new(CocoExporter),
            ExportFormat::Voc => Box::new(VocExporter),
        }
    }

    /// Per-split folder holding label files, if the format has one.
    pub fn labels_dir(&self) -> Option<&'static str> {
        match self {
            ExportFormat::Coco => None,
            ExportFormat::Yolo | ExportFormat::Voc => Some("labels"),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = BoxforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yolo" => Ok(ExportFormat::Yolo),
            "coco" => Ok(ExportFormat::Coco),
            "voc" | "pascal" | "pascalvoc" | "pascal-voc" => Ok(ExportFormat::Voc),
            other => Err(BoxforgeError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn require_size(image: &LabeledImage) -> Result<ImageSize, BoxforgeError> {
    image.size.ok_or_else(|| BoxforgeError::Export {
        message: format!("image {} has no known size", image.id),
    })
}

fn require_class(
    classes: &ClassList,
    image: &LabeledImage,
    bbox: &BoundingBox,
) -> Result<usize, BoxforgeError> {
    classes
        .id_of(&bbox.class_name)
        .ok_or_else(|| BoxforgeError::Export {
            message: format!(
                "box {} of image {} has class '{}' missing from the class list",
                bbox.id, image.id, bbox.class_name
            ),
        })
}

/// `{split}/labels/{stem}.{extension}`
fn label_path(split: &DatasetSplit, image: &LabeledImage, extension: &str) -> String {
    format!("{}/labels/{}.{extension}", split.name, image.file_stem())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ir::{BoundingBox, LabeledImage, PixelData};
    use crate::split::{DatasetSplit, SplitName};

    pub fn image(id: &str, width: u32, height: u32, boxes: &[(f64, f64, f64, f64, &str)]) -> LabeledImage {
        let mut image = LabeledImage::new(id, format!("{id}.jpg"), PixelData::File(format!("{id}.jpg").into()))
            .with_size(width, height);
        for (i, (x, y, w, h, class)) in boxes.iter().enumerate() {
            image = image.with_box(BoundingBox::new(i as u64 + 1, *x, *y, *w, *h, *class));
        }
        image
    }

    pub fn split(name: SplitName, images: Vec<LabeledImage>) -> DatasetSplit {
        DatasetSplit {
            name,
            images,
            target_percent: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_aliases() {
        assert_eq!("YOLO".parse::<ExportFormat>().unwrap(), ExportFormat::Yolo);
        assert_eq!("pascal".parse::<ExportFormat>().unwrap(), ExportFormat::Voc);
        assert!(matches!(
            "tfrecord".parse::<ExportFormat>(),
            Err(BoxforgeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn each_format_has_a_matching_exporter() {
        for format in [ExportFormat::Yolo, ExportFormat::Coco, ExportFormat::Voc] {
            assert_eq!(format.exporter().format(), format);
        }
        assert_eq!(ExportFormat::Coco.labels_dir(), None);
    }
}
