//! Bundle targets: a plain directory or a zip file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BoxforgeError;

/// Receives bundle files one at a time.
///
/// Paths are relative and `/`-separated. Nothing is guaranteed to be
/// complete on disk before [`BundleSink::finish`] returns.
pub trait BundleSink {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), BoxforgeError>;

    fn finish(&mut self) -> Result<(), BoxforgeError>;
}

/// Splits a bundle path into its components, rejecting anything that could
/// resolve outside the bundle root: empty, `.` or `..` components, absolute
/// paths, backslashes and drive prefixes.
fn checked_parts(path: &str) -> Result<Vec<&str>, BoxforgeError> {
    let parts: Vec<&str> = path.split('/').collect();
    let unsafe_part = parts.iter().any(|part| {
        part.is_empty() || *part == "." || *part == ".." || part.contains(['\\', ':'])
    });
    if unsafe_part {
        return Err(BoxforgeError::Export {
            message: format!("refusing to write '{path}' outside the bundle root"),
        });
    }
    Ok(parts)
}

/// Writes the bundle as a directory tree under `root`.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BoxforgeError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BundleSink for DirectorySink {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), BoxforgeError> {
        let target = checked_parts(path)?
            .into_iter()
            .fold(self.root.clone(), |acc, part| acc.join(part));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxforgeError> {
        Ok(())
    }
}

/// Writes the bundle into a deflate-compressed zip file.
pub struct ZipSink {
    writer: Option<ZipWriter<File>>,
    options: SimpleFileOptions,
}

impl ZipSink {
    pub fn create(path: &Path) -> Result<Self, BoxforgeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: Some(ZipWriter::new(file)),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    fn writer(&mut self) -> Result<&mut ZipWriter<File>, BoxforgeError> {
        self.writer.as_mut().ok_or_else(|| BoxforgeError::Export {
            message: "zip archive already finished".to_string(),
        })
    }
}

impl BundleSink for ZipSink {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), BoxforgeError> {
        checked_parts(path)?;
        let options = self.options;
        let writer = self.writer()?;
        writer.start_file(path, options)?;
        writer.write_all(contents)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxforgeError> {
        if let Some(writer) = self.writer.take() {
            writer.finish()?;
        }
        Ok(())
    }
}

/// Picks a [`ZipSink`] for `*.zip` paths and a [`DirectorySink`] otherwise.
pub fn sink_for_path(path: &Path) -> Result<Box<dyn BundleSink>, BoxforgeError> {
    let is_zip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        Ok(Box::new(ZipSink::create(path)?))
    } else {
        Ok(Box::new(DirectorySink::new(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn directory_sink_creates_nested_folders() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out")).unwrap();
        sink.write_file("train/labels/a.txt", b"0 0.5 0.5 1 1").unwrap();
        sink.finish().unwrap();
        let text = fs::read_to_string(dir.path().join("out/train/labels/a.txt")).unwrap();
        assert_eq!(text, "0 0.5 0.5 1 1");
    }

    #[test]
    fn sinks_reject_paths_leaving_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out")).unwrap();
        for path in ["../escape.txt", "train/../../escape.txt", "/abs.txt", "a//b.txt", "c:\\x.txt"] {
            assert!(
                matches!(sink.write_file(path, b"x"), Err(BoxforgeError::Export { .. })),
                "{path} accepted"
            );
        }
        assert!(!dir.path().join("escape.txt").exists());

        let mut zip = ZipSink::create(&dir.path().join("b.zip")).unwrap();
        assert!(zip.write_file("../escape.txt", b"x").is_err());
        zip.write_file("train/ok.txt", b"x").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn zip_sink_writes_readable_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        let mut sink = sink_for_path(&path).unwrap();
        sink.write_file("classes.txt", b"car\nperson").unwrap();
        sink.write_file("train/images/a.jpg", &[1, 2, 3]).unwrap();
        sink.finish().unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut text = String::new();
        archive
            .by_name("classes.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "car\nperson");
    }
}
