//! JSON project files.
//!
//! A project file is the hand-off point between the labeling layer and this
//! crate: an ordered list of images, where each image points at its encoded
//! pixels on disk and carries its boxes. `boxforge augment` reads one and
//! writes a new one that also lists the derived images.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::{BoundingBox, ImageSize, LabeledImage, PixelData, Provenance};
use super::ImageId;
use crate::error::BoxforgeError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectFile {
    images: Vec<ProjectImage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectImage {
    id: String,
    file_name: String,

    /// Path of the encoded image. Relative paths resolve against the
    /// directory of the project file; defaults to `file_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<u32>,

    #[serde(default)]
    boxes: Vec<BoundingBox>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    provenance: Option<Provenance>,
}

/// Reads a project file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_project_json(path: &Path) -> Result<Vec<LabeledImage>, BoxforgeError> {
    let file = File::open(path).map_err(BoxforgeError::Io)?;
    let reader = BufReader::new(file);

    let project: ProjectFile =
        serde_json::from_reader(reader).map_err(|source| BoxforgeError::ProjectJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(project_to_images(project, base))
}

/// Writes a project file.
///
/// Every image must be file-backed; in-memory images have to be persisted
/// first (see [`crate::archive::persist_derived`]).
pub fn write_project_json(path: &Path, images: &[LabeledImage]) -> Result<(), BoxforgeError> {
    let project = images_to_project(images)?;

    let file = File::create(path).map_err(BoxforgeError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &project).map_err(|source| {
        BoxforgeError::ProjectJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Parses a project from a JSON string, resolving paths against `base`.
///
/// Useful for testing without file I/O.
pub fn from_project_str(json: &str, base: &Path) -> Result<Vec<LabeledImage>, serde_json::Error> {
    let project: ProjectFile = serde_json::from_str(json)?;
    Ok(project_to_images(project, base))
}

fn project_to_images(project: ProjectFile, base: &Path) -> Vec<LabeledImage> {
    project
        .images
        .into_iter()
        .map(|img| {
            let rel = img.path.unwrap_or_else(|| PathBuf::from(&img.file_name));
            let full = if rel.is_absolute() { rel } else { base.join(rel) };
            let size = match (img.width, img.height) {
                (Some(width), Some(height)) => Some(ImageSize::new(width, height)),
                _ => None,
            };
            LabeledImage {
                id: ImageId::new(img.id),
                file_name: img.file_name,
                pixels: PixelData::File(full),
                size,
                boxes: img.boxes,
                provenance: img.provenance,
            }
        })
        .collect()
}

fn images_to_project(images: &[LabeledImage]) -> Result<ProjectFile, BoxforgeError> {
    let images = images
        .iter()
        .map(|image| {
            let path = image
                .pixels
                .path()
                .ok_or_else(|| BoxforgeError::UnpersistedImage {
                    image: image.id.clone(),
                })?;
            Ok(ProjectImage {
                id: image.id.as_str().to_string(),
                file_name: image.file_name.clone(),
                path: Some(path.to_path_buf()),
                width: image.size.map(|s| s.width),
                height: image.size.map(|s| s.height),
                boxes: image.boxes.clone(),
                provenance: image.provenance.clone(),
            })
        })
        .collect::<Result<Vec<_>, BoxforgeError>>()?;

    Ok(ProjectFile { images })
}
