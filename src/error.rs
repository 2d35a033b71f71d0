use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::ir::{ImageId, LabeledImage};

/// The main error type for boxforge operations.
///
/// The variants follow the run taxonomy: `Validation` is raised before any
/// work starts, `Decode`/`DecodeTimeout`/`Encode` are per-image and are
/// recorded and skipped by batch runs, and `Fatal` aborts a run.
#[derive(Debug, Error)]
pub enum BoxforgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse project JSON from {path}: {source}")]
    ProjectJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write project JSON to {path}: {source}")]
    ProjectJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse augmentation config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid run parameters: {message}")]
    Validation { message: String },

    #[error("Failed to decode image {image}: {message}")]
    Decode { image: ImageId, message: String },

    #[error("Decoding image {image} timed out after {timeout:?}")]
    DecodeTimeout { image: ImageId, timeout: Duration },

    #[error("Failed to encode derived image {image}: {message}")]
    Encode { image: ImageId, message: String },

    #[error("Run aborted: {message} ({partial})")]
    Fatal {
        message: String,
        partial: PartialOutput,
    },

    #[error("Another augmentation or export run is already active")]
    RunInProgress,

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Image {image} only exists in memory and must be written to disk first")]
    UnpersistedImage { image: ImageId },

    #[error("Failed to write dataset manifest: {source}")]
    ManifestWrite {
        #[source]
        source: serde_json::Error,
    },

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl BoxforgeError {
    /// Shorthand for a [`BoxforgeError::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        BoxforgeError::Validation {
            message: message.into(),
        }
    }

    /// True for errors that only affect a single image or output.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            BoxforgeError::Decode { .. }
                | BoxforgeError::DecodeTimeout { .. }
                | BoxforgeError::Encode { .. }
        )
    }
}

/// What happened to already produced output when a run aborted.
///
/// The caller chooses between the two with
/// [`PartialPolicy`](crate::run::PartialPolicy).
#[derive(Debug)]
pub enum PartialOutput {
    /// Derived images produced before the failure were dropped.
    Discarded,
    /// Derived images produced before the failure.
    Kept(Vec<LabeledImage>),
}

impl std::fmt::Display for PartialOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialOutput::Discarded => write!(f, "partial output discarded"),
            PartialOutput::Kept(images) => write!(f, "{} derived image(s) kept", images.len()),
        }
    }
}
