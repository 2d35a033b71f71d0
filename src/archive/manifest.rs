//! `dataset_info.json` and `README.md`.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::export::ExportFormat;
use crate::ir::ClassList;
use crate::split::SplitRatio;

pub const DATASET_INFO_FILE: &str = "dataset_info.json";
pub const README_FILE: &str = "README.md";

/// Image count per split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

/// Contents of `dataset_info.json`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub format: ExportFormat,
    pub total_images: usize,
    pub total_labels: usize,
    pub classes: Vec<String>,
    pub split_ratio: SplitRatio,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub splits: SplitCounts,
}

impl DatasetInfo {
    pub fn new(
        format: ExportFormat,
        classes: &ClassList,
        split_ratio: SplitRatio,
        splits: SplitCounts,
        total_labels: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            format,
            total_images: splits.train + splits.val + splits.test,
            total_labels,
            classes: classes.names().to_vec(),
            split_ratio,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            splits,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Human-readable summary with class table, split table and layout.
    pub fn readme(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        self.write_readme(&mut out)?;
        Ok(out)
    }

    fn write_readme(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# Object Detection Dataset")?;
        writeln!(out)?;
        writeln!(out, "## Dataset")?;
        writeln!(out, "- Format: {}", self.format.as_str().to_uppercase())?;
        writeln!(out, "- Total images: {}", self.total_images)?;
        writeln!(out, "- Total labels: {}", self.total_labels)?;
        writeln!(out, "- Classes: {}", self.classes.len())?;
        writeln!(out, "- Created: {}", self.created_at)?;
        writeln!(out)?;
        writeln!(out, "## Classes")?;
        writeln!(out)?;
        writeln!(out, "| id | name |")?;
        writeln!(out, "|---:|------|")?;
        for (id, name) in self.classes.iter().enumerate() {
            writeln!(out, "| {id} | {name} |")?;
        }
        writeln!(out)?;
        writeln!(out, "## Splits")?;
        writeln!(out)?;
        writeln!(out, "| split | images | target |")?;
        writeln!(out, "|-------|-------:|-------:|")?;
        for (name, count, percent) in [
            ("train", self.splits.train, self.split_ratio.train),
            ("val", self.splits.val, self.split_ratio.val),
            ("test", self.splits.test, self.split_ratio.test),
        ] {
            writeln!(out, "| {name} | {count} | {percent}% |")?;
        }
        writeln!(out)?;
        writeln!(out, "## Layout")?;
        writeln!(out)?;
        writeln!(out, "```")?;
        writeln!(out, "dataset/")?;
        if self.format == ExportFormat::Yolo {
            writeln!(out, "├── classes.txt")?;
        }
        let leaf = match self.format {
            ExportFormat::Coco => "annotations.json",
            ExportFormat::Yolo | ExportFormat::Voc => "labels/",
        };
        for (i, split) in ["train", "val", "test"].iter().enumerate() {
            let (branch, indent) = if i == 2 {
                ("└──", "    ")
            } else {
                ("├──", "│   ")
            };
            writeln!(out, "{branch} {split}/")?;
            writeln!(out, "{indent}├── images/")?;
            writeln!(out, "{indent}└── {leaf}")?;
        }
        writeln!(out, "```")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info(format: ExportFormat) -> DatasetInfo {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        DatasetInfo::new(
            format,
            &ClassList::from_names(["car", "person"]),
            SplitRatio::default(),
            SplitCounts {
                train: 7,
                val: 2,
                test: 1,
            },
            25,
            created,
        )
    }

    #[test]
    fn manifest_serializes_expected_fields() {
        let json: serde_json::Value = serde_json::from_slice(&info(ExportFormat::Coco).to_json().unwrap()).unwrap();
        assert_eq!(json["format"], "coco");
        assert_eq!(json["total_images"], 10);
        assert_eq!(json["total_labels"], 25);
        assert_eq!(json["classes"], serde_json::json!(["car", "person"]));
        assert_eq!(json["split_ratio"]["val"], 20);
        assert_eq!(json["splits"]["test"], 1);
        assert_eq!(json["created_at"], "2024-05-01T12:30:00Z");
    }

    #[test]
    fn readme_lists_classes_and_layout() {
        let readme = info(ExportFormat::Yolo).readme().unwrap();
        assert!(readme.contains("- Format: YOLO"));
        assert!(readme.contains("| 1 | person |"));
        assert!(readme.contains("| train | 7 | 70% |"));
        assert!(readme.contains("├── classes.txt"));
        assert!(!info(ExportFormat::Coco).readme().unwrap().contains("classes.txt"));
    }
}
