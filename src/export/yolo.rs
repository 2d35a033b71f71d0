//! Ultralytics-style YOLO labels.
//!
//! One `{split}/labels/{stem}.txt` per image with a
//! `class cx cy w h` line per box, normalized and printed with 6 decimals.
//! Class names go into a dataset-level `classes.txt`.

use super::{label_path, require_class, require_size, Artifact, ExportFormat, Exporter};
use crate::error::BoxforgeError;
use crate::ir::ClassList;
use crate::split::DatasetSplit;

pub const CLASSES_FILE: &str = "classes.txt";

#[derive(Clone, Copy, Debug, Default)]
pub struct YoloExporter;

impl Exporter for YoloExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Yolo
    }

    fn export(
        &self,
        split: &DatasetSplit,
        classes: &ClassList,
    ) -> Result<Vec<Artifact>, BoxforgeError> {
        split
            .images
            .iter()
            .map(|image| {
                let size = require_size(image)?;
                let lines = image
                    .boxes
                    .iter()
                    .map(|bbox| {
                        let class_id = require_class(classes, image, bbox)?;
                        let (cx, cy, w, h) = bbox
                            .to_xyxy()
                            .to_normalized(size.width as f64, size.height as f64)
                            .to_cxcywh();
                        Ok(format!("{} {:.6} {:.6} {:.6} {:.6}", class_id, cx, cy, w, h))
                    })
                    .collect::<Result<Vec<_>, BoxforgeError>>()?;
                Ok(Artifact::new(label_path(split, image, "txt"), lines.join("\n")))
            })
            .collect()
    }

    fn global_artifacts(&self, classes: &ClassList) -> Vec<Artifact> {
        vec![Artifact::new(CLASSES_FILE, classes.names().join("\n"))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{image, split};
    use crate::split::SplitName;

    #[test]
    fn writes_normalized_center_lines() {
        let classes = ClassList::from_names(["car", "person"]);
        let split = split(
            SplitName::Train,
            vec![image(
                "street",
                200,
                100,
                &[(50.0, 25.0, 100.0, 50.0, "person"), (0.0, 0.0, 20.0, 10.0, "car")],
            )],
        );

        let artifacts = YoloExporter.export(&split, &classes).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].path, "train/labels/street.txt");
        assert_eq!(
            artifacts[0].text(),
            "1 0.500000 0.500000 0.500000 0.500000\n0 0.050000 0.050000 0.100000 0.100000"
        );
    }

    #[test]
    fn classes_file_has_no_trailing_newline() {
        let classes = ClassList::from_names(["car", "person"]);
        let global = YoloExporter.global_artifacts(&classes);
        assert_eq!(global[0].path, "classes.txt");
        assert_eq!(global[0].text(), "car\nperson");
    }

    #[test]
    fn unknown_class_is_an_export_error() {
        let classes = ClassList::from_names(["car"]);
        let split = split(SplitName::Val, vec![image("a", 10, 10, &[(0.0, 0.0, 1.0, 1.0, "dog")])]);
        assert!(matches!(
            YoloExporter.export(&split, &classes),
            Err(BoxforgeError::Export { .. })
        ));
    }

    #[test]
    fn missing_size_is_an_export_error() {
        let classes = ClassList::from_names(["car"]);
        let mut img = image("a", 10, 10, &[(0.0, 0.0, 1.0, 1.0, "car")]);
        img.size = None;
        let split = split(SplitName::Test, vec![img]);
        assert!(YoloExporter.export(&split, &classes).is_err());
    }
}
