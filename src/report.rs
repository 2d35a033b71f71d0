//! Run report types for augmentation and export runs.
//!
//! A report separates what succeeded from what was skipped so a single bad
//! image never hides behind a successful run.

use serde::Serialize;
use std::fmt;

use crate::error::BoxforgeError;
use crate::ir::ImageId;

/// Summary of one augmentation or export run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// Operation name (`augment`, `export:yolo`, ...).
    pub operation: String,
    /// Counts for the run.
    pub counts: RunCounts,
    /// True when the run stopped early on request.
    pub cancelled: bool,
    /// Images and outputs that were skipped, plus notes.
    pub issues: Vec<RunIssue>,
}

impl RunReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: RunIssue) {
        self.issues.push(issue);
    }

    /// Count of skipped images or outputs.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == RunSeverity::Warning)
            .count()
    }

    /// Count of info-level notes.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == RunSeverity::Info)
            .count()
    }

    /// Returns true if anything was skipped.
    pub fn has_failures(&self) -> bool {
        self.warning_count() > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.operation)?;
        writeln!(
            f,
            "  {} source image(s), {} processed, {} failed",
            self.counts.source_images, self.counts.processed_images, self.counts.failed_images
        )?;
        writeln!(
            f,
            "  {} output(s) written, {} skipped",
            self.counts.outputs, self.counts.skipped_outputs
        )?;
        if self.cancelled {
            writeln!(f, "  cancelled before completion")?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Skipped ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == RunSeverity::Warning)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == RunSeverity::Info)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Counts tracked by a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    /// Images considered by the run (eligible originals, or exported images).
    pub source_images: usize,
    pub processed_images: usize,
    pub failed_images: usize,
    /// Derived images or bundle files produced.
    pub outputs: usize,
    pub skipped_outputs: usize,
}

/// A single skipped item or note.
#[derive(Clone, Debug, Serialize)]
pub struct RunIssue {
    pub severity: RunSeverity,
    pub code: RunIssueCode,
    /// Image the issue is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageId>,
    pub message: String,
}

impl RunIssue {
    /// A skipped image or output.
    pub fn warning(code: RunIssueCode, image: Option<ImageId>, message: impl Into<String>) -> Self {
        Self {
            severity: RunSeverity::Warning,
            code,
            image,
            message: message.into(),
        }
    }

    pub fn info(code: RunIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: RunSeverity::Info,
            code,
            image: None,
            message: message.into(),
        }
    }

    /// Builds a warning from a per-image error.
    pub fn from_error(image: &ImageId, err: &BoxforgeError) -> Self {
        let code = match err {
            BoxforgeError::DecodeTimeout { .. } => RunIssueCode::DecodeTimeout,
            BoxforgeError::Encode { .. } => RunIssueCode::EncodeFailed,
            _ => RunIssueCode::DecodeFailed,
        };
        Self::warning(code, Some(image.clone()), err.to_string())
    }
}

impl fmt::Display for RunIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.image {
            Some(image) => write!(f, "[{}] {}", image, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSeverity {
    /// Something was skipped.
    Warning,
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunIssueCode {
    /// Source image bytes could not be read or decoded.
    DecodeFailed,
    /// Decoding did not finish within the configured timeout.
    DecodeTimeout,
    /// A derived image could not be encoded.
    EncodeFailed,
    /// A duplicate input image id was ignored.
    DuplicateImage,
    /// Images without boxes take no part in the run.
    IneligibleImage,
    /// An image could not be loaded while writing a bundle.
    ImageUnavailable,
    /// A bundle file name was renamed to stay unique within its split.
    RenamedFile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_report_has_no_failures() {
        let report = RunReport::new("augment");
        assert!(!report.has_failures());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.info_count(), 0);
    }

    #[test]
    fn per_image_errors_map_to_codes() {
        let id = ImageId::new("img");
        let timeout = BoxforgeError::DecodeTimeout {
            image: id.clone(),
            timeout: Duration::from_millis(5),
        };
        let issue = RunIssue::from_error(&id, &timeout);
        assert_eq!(issue.code, RunIssueCode::DecodeTimeout);
        assert_eq!(issue.severity, RunSeverity::Warning);
        assert!(issue.to_string().starts_with("[img]"));
    }

    #[test]
    fn display_lists_skipped_images() {
        let mut report = RunReport::new("augment");
        report.counts.source_images = 2;
        report.counts.failed_images = 1;
        report.add(RunIssue::warning(
            RunIssueCode::DecodeFailed,
            Some(ImageId::new("broken")),
            "not an image",
        ));
        let text = report.to_string();
        assert!(text.contains("2 source image(s)"));
        assert!(text.contains("Skipped (1):"));
        assert!(text.contains("[broken] not an image"));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = RunReport::new("export:coco");
        report.cancelled = true;
        report.add(RunIssue::info(RunIssueCode::IneligibleImage, "1 image has no boxes"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"operation\":\"export:coco\""));
        assert!(json.contains("\"severity\":\"info\""));
        assert!(json.contains("\"code\":\"ineligible_image\""));
        assert!(!json.contains("\"image\""));
    }
}
