//! The dataset-wide class list.

use std::collections::HashMap;

use super::model::LabeledImage;

/// Distinct class names in first-seen order.
///
/// The position of a name is its integer class id in every export format.
/// Build it once over the complete image set (originals and derived) before
/// any exporter runs and share the same value everywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassList {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ClassList {
    /// Scans every box of every image, in order, and records new names.
    pub fn discover<'a, I>(images: I) -> Self
    where
        I: IntoIterator<Item = &'a LabeledImage>,
    {
        let mut classes = ClassList::default();
        for image in images {
            for bbox in &image.boxes {
                classes.insert(&bbox.class_name);
            }
        }
        classes
    }

    /// Builds a list from explicit names, ignoring repeats.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = ClassList::default();
        for name in names {
            classes.insert(name.as_ref());
        }
        classes
    }

    fn insert(&mut self, name: &str) {
        if !self.index.contains_key(name) {
            self.index.insert(name.to_string(), self.names.len());
            self.names.push(name.to_string());
        }
    }

    /// Class id of `name`, if known.
    #[inline]
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
