//! Newtype IDs for type-safe identification of images and boxes.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., passing a box ID where an image ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::augment::TransformKind;

/// A unique identifier for an image in the working set.
///
/// Original images carry whatever id the labeling layer assigned. Derived
/// images get a composite id built by [`ImageId::derived`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    /// Creates a new ImageId.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the deterministic id of a derived image from its composite key
    /// `(source, kind, sample_index)`.
    pub fn derived(source: &ImageId, kind: TransformKind, sample_index: usize) -> Self {
        Self(format!("{}_{}_{}", source.0, kind.as_str(), sample_index))
    }

    /// Returns the underlying string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a single path component: anything outside
    /// `[A-Za-z0-9._-]` becomes `_` and leading dots are dropped.
    pub fn to_file_stem(&self) -> String {
        let cleaned: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        match cleaned.trim_start_matches('.') {
            "" => "_".to_string(),
            stem => stem.to_string(),
        }
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        ImageId::new(id)
    }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self {
        ImageId(id)
    }
}

/// Identifier of a bounding box, unique within its image.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub u64);

impl BoxId {
    /// Creates a new BoxId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxId({})", self.0)
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BoxId {
    fn from(id: u64) -> Self {
        BoxId::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(ImageId::new("a"), ImageId::from("a"));
        assert_ne!(BoxId(1), BoxId(2));
    }

    #[test]
    fn test_derived_id_is_deterministic() {
        let source = ImageId::new("img7");
        let a = ImageId::derived(&source, TransformKind::Rotation, 2);
        let b = ImageId::derived(&source, TransformKind::Rotation, 2);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "img7_rotation_2");
        assert_ne!(a, ImageId::derived(&source, TransformKind::Rotation, 1));
    }

    #[test]
    fn test_file_stem_is_one_path_component() {
        assert_eq!(ImageId::new("img7_flip-h_0").to_file_stem(), "img7_flip-h_0");
        assert_eq!(ImageId::new("cam1/0001").to_file_stem(), "cam1_0001");
        assert_eq!(ImageId::new("../../etc/x").to_file_stem(), "_.._etc_x");
        assert_eq!(ImageId::new("..").to_file_stem(), "_");
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(BoxId(1));
        set.insert(BoxId(2));
        set.insert(BoxId(1)); // duplicate
        assert_eq!(set.len(), 2);
    }
}
