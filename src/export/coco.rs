//! COCO JSON, one `{split}/annotations.json` per split.
//!
//! # Deterministic Output
//!
//! Image ids are the image's position in the split starting at 0,
//! annotation ids count up from 1 across the split, and category ids are
//! class-list indices. The `info` block is static so identical inputs give
//! identical bytes.

use serde::Serialize;

use super::{require_class, require_size, Artifact, ExportFormat, Exporter};
use crate::error::BoxforgeError;
use crate::ir::ClassList;
use crate::split::DatasetSplit;

const DESCRIPTION: &str = "boxforge dataset";
const VERSION: &str = "1.0";
const SUPERCATEGORY: &str = "object";

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Serialize)]
struct CocoDataset {
    info: CocoInfo,
    licenses: Vec<CocoLicense>,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Serialize)]
struct CocoInfo {
    description: &'static str,
    version: &'static str,
}

/// Always empty; kept so COCO tooling finds the key.
#[derive(Debug, Serialize)]
struct CocoLicense {}

#[derive(Debug, Serialize)]
struct CocoImage {
    id: u64,
    width: u32,
    height: u32,
    file_name: String,
}

#[derive(Debug, Serialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    bbox: [f64; 4],

    area: f64,
    iscrowd: u8,
}

#[derive(Debug, Serialize)]
struct CocoCategory {
    id: u64,
    name: String,
    supercategory: &'static str,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CocoExporter;

impl CocoExporter {
    fn build(split: &DatasetSplit, classes: &ClassList) -> Result<CocoDataset, BoxforgeError> {
        let mut images = Vec::with_capacity(split.images.len());
        let mut annotations = Vec::new();
        let mut next_annotation_id = 1u64;

        for (index, image) in split.images.iter().enumerate() {
            let size = require_size(image)?;
            let image_id = index as u64;
            images.push(CocoImage {
                id: image_id,
                width: size.width,
                height: size.height,
                file_name: image.file_name.clone(),
            });

            for bbox in &image.boxes {
                let category_id = require_class(classes, image, bbox)? as u64;
                annotations.push(CocoAnnotation {
                    id: next_annotation_id,
                    image_id,
                    category_id,
                    bbox: [bbox.x, bbox.y, bbox.width, bbox.height],
                    area: bbox.area(),
                    iscrowd: 0,
                });
                next_annotation_id += 1;
            }
        }

        let categories = classes
            .names()
            .iter()
            .enumerate()
            .map(|(id, name)| CocoCategory {
                id: id as u64,
                name: name.clone(),
                supercategory: SUPERCATEGORY,
            })
            .collect();

        Ok(CocoDataset {
            info: CocoInfo {
                description: DESCRIPTION,
                version: VERSION,
            },
            licenses: Vec::new(),
            images,
            annotations,
            categories,
        })
    }
}

impl Exporter for CocoExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Coco
    }

    fn export(
        &self,
        split: &DatasetSplit,
        classes: &ClassList,
    ) -> Result<Vec<Artifact>, BoxforgeError> {
        let coco = Self::build(split, classes)?;
        let json = serde_json::to_vec_pretty(&coco).map_err(|source| BoxforgeError::Export {
            message: format!("serializing COCO annotations for {}: {source}", split.name),
        })?;
        Ok(vec![Artifact::new(
            format!("{}/annotations.json", split.name),
            json,
        )])
    }
}
