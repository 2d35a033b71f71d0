//! Archive builder: partitions labeled images, runs one exporter over every
//! split and writes images, labels, class files, `dataset_info.json` and
//! `README.md` into a [`BundleSink`].
//!
//! Image bytes are loaded one image at a time while writing.

mod manifest;
mod sink;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::decode::resolve_size;
use crate::error::BoxforgeError;
use crate::export::ExportFormat;
use crate::ir::{ClassList, LabeledImage, PixelData};
use crate::report::{RunIssue, RunIssueCode, RunReport};
use crate::run::{NoProgress, Progress, ProgressSink, RunGuard};
use crate::split::{partition, DatasetSplit, SplitName, SplitRatio};

pub use manifest::{DatasetInfo, SplitCounts, DATASET_INFO_FILE, README_FILE};
pub use sink::{sink_for_path, BundleSink, DirectorySink, ZipSink};

/// Settings of one export run.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub ratio: SplitRatio,
    /// Partition seed; OS entropy if unset.
    pub seed: Option<u64>,
    /// Manifest timestamp; the current time if unset.
    pub created_at: Option<DateTime<Utc>>,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ratio: SplitRatio::default(),
            seed: None,
            created_at: None,
        }
    }

    pub fn with_ratio(mut self, ratio: SplitRatio) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// What a finished export wrote.
#[derive(Debug)]
pub struct BundleSummary {
    pub info: DatasetInfo,
    pub report: RunReport,
}

/// Builds bundles, one at a time per [`RunGuard`].
#[derive(Clone, Debug, Default)]
pub struct BundleBuilder {
    guard: RunGuard,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares `guard` with other runners so export and augmentation exclude
    /// each other.
    pub fn with_guard(guard: RunGuard) -> Self {
        Self { guard }
    }

    pub fn build(
        &self,
        images: &[LabeledImage],
        options: &ExportOptions,
        sink: &mut dyn BundleSink,
    ) -> Result<BundleSummary, BoxforgeError> {
        self.build_with_progress(images, options, sink, &NoProgress)
    }

    /// Like [`BundleBuilder::build`], reporting one step per written image.
    pub fn build_with_progress(
        &self,
        images: &[LabeledImage],
        options: &ExportOptions,
        sink: &mut dyn BundleSink,
        progress: &dyn ProgressSink,
    ) -> Result<BundleSummary, BoxforgeError> {
        let _active = self.guard.try_begin()?;
        build_bundle(images, options, sink, progress)
    }
}

/// Keeps only images that can be exported and fills in missing sizes.
fn prepare(images: &[LabeledImage], report: &mut RunReport) -> Vec<LabeledImage> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(images.len());
    let mut bare = 0usize;

    for image in images {
        if !image.is_eligible() {
            bare += 1;
            continue;
        }
        if !seen.insert(&image.id) {
            report.add(RunIssue::info(
                RunIssueCode::DuplicateImage,
                format!("duplicate image id {} ignored", image.id),
            ));
            continue;
        }
        match resolve_size(image) {
            Some(size) => {
                let mut image = image.clone();
                image.size = Some(size);
                prepared.push(image);
            }
            None => {
                warn!("skipping {}: could not read image size", image.id);
                report.counts.failed_images += 1;
                report.add(RunIssue::warning(
                    RunIssueCode::ImageUnavailable,
                    Some(image.id.clone()),
                    "could not read image size",
                ));
            }
        }
    }

    if bare > 0 {
        report.add(RunIssue::info(
            RunIssueCode::IneligibleImage,
            format!("{bare} image(s) without boxes were not exported"),
        ));
    }
    prepared
}

/// Reduces a project `file_name` to one safe path component: folders are
/// dropped, and names that are empty or only dots become `image`.
fn flat_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace(':', "_");
    if base.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        base
    }
}

/// Splits `name` into its stem and its extension including the dot.
fn stem_and_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

/// Picks a file name from `name` whose stem is not yet in `used`, appending
/// `_{n}` to the stem on a clash, and records the stem.
fn claim_unique_name(name: &str, used: &mut HashSet<String>) -> String {
    let (stem, ext) = stem_and_extension(name);
    if used.insert(stem.to_string()) {
        return name.to_string();
    }
    let unique = (1..)
        .map(|n| format!("{stem}_{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_default();
    used.insert(unique.clone());
    format!("{unique}{ext}")
}

/// Flattens every file name of `split` and renames clashing stems to
/// `{stem}_{n}{ext}`, so image files and label files pair up one to one.
fn dedupe_file_names(split: &mut DatasetSplit, report: &mut RunReport) {
    let mut used = HashSet::new();
    for image in &mut split.images {
        let unique = claim_unique_name(&flat_file_name(&image.file_name), &mut used);
        if unique != image.file_name {
            report.add(RunIssue::info(
                RunIssueCode::RenamedFile,
                format!(
                    "{} in {} renamed to {unique}",
                    image.file_name, split.name
                ),
            ));
            image.file_name = unique;
        }
    }
}

/// Writes each image of `split` into `{split}/images/` and drops the ones
/// whose bytes cannot be read.
fn write_images(
    split: &mut DatasetSplit,
    sink: &mut dyn BundleSink,
    report: &mut RunReport,
    on_image: &mut dyn FnMut(),
) -> Result<(), BoxforgeError> {
    let mut kept = Vec::with_capacity(split.images.len());
    for image in std::mem::take(&mut split.images) {
        match image.pixels.load() {
            Ok(bytes) => {
                sink.write_file(&format!("{}/images/{}", split.name, image.file_name), &bytes)?;
                report.counts.outputs += 1;
                kept.push(image);
            }
            Err(err) => {
                warn!("skipping {}: {err}", image.id);
                report.counts.failed_images += 1;
                report.add(RunIssue::warning(
                    RunIssueCode::ImageUnavailable,
                    Some(image.id.clone()),
                    err.to_string(),
                ));
            }
        }
        on_image();
    }
    split.images = kept;
    Ok(())
}

/// Partitions `images` and writes the complete bundle into `sink`.
pub fn build_bundle(
    images: &[LabeledImage],
    options: &ExportOptions,
    sink: &mut dyn BundleSink,
    progress: &dyn ProgressSink,
) -> Result<BundleSummary, BoxforgeError> {
    options.ratio.validate()?;
    let mut report = RunReport::new(format!("export:{}", options.format));

    let prepared = prepare(images, &mut report);
    if prepared.is_empty() {
        return Err(BoxforgeError::validation(
            "no labeled image with a readable size to export",
        ));
    }
    report.counts.source_images = prepared.len();

    // Fixed before any export so every split agrees on class ids.
    let classes = ClassList::discover(prepared.iter());
    let mut partition = partition(&prepared, options.ratio, options.seed)?;
    info!(
        "exporting {} image(s), {} class(es) as {} with split {}",
        prepared.len(),
        classes.len(),
        options.format,
        options.ratio
    );

    let exporter = options.format.exporter();
    let total = prepared.len();
    let mut completed = 0usize;
    let mut counts = SplitCounts::default();
    let mut total_labels = 0usize;

    for split in partition.splits.iter_mut() {
        if split.is_empty() {
            continue;
        }
        dedupe_file_names(split, &mut report);
        write_images(split, sink, &mut report, &mut || {
            completed += 1;
            progress.on_progress(Progress { completed, total });
        })?;
        if split.is_empty() {
            continue;
        }

        for artifact in exporter.export(split, &classes)? {
            sink.write_file(&artifact.path, &artifact.contents)?;
            report.counts.outputs += 1;
        }

        report.counts.processed_images += split.len();
        total_labels += split.images.iter().map(|i| i.boxes.len()).sum::<usize>();
        match split.name {
            SplitName::Train => counts.train = split.len(),
            SplitName::Val => counts.val = split.len(),
            SplitName::Test => counts.test = split.len(),
        }
    }

    for artifact in exporter.global_artifacts(&classes) {
        sink.write_file(&artifact.path, &artifact.contents)?;
        report.counts.outputs += 1;
    }

    let info = DatasetInfo::new(
        options.format,
        &classes,
        options.ratio,
        counts,
        total_labels,
        options.created_at.unwrap_or_else(Utc::now),
    );
    let json = info
        .to_json()
        .map_err(|source| BoxforgeError::ManifestWrite { source })?;
    sink.write_file(DATASET_INFO_FILE, &json)?;
    let readme = info.readme().map_err(|err| BoxforgeError::Export {
        message: format!("failed to render {README_FILE}: {err}"),
    })?;
    sink.write_file(README_FILE, readme.as_bytes())?;
    report.counts.outputs += 2;
    sink.finish()?;

    info!(
        "export finished: {} image(s), {} label(s), train/val/test = {}/{}/{}",
        info.total_images, info.total_labels, counts.train, counts.val, counts.test
    );
    Ok(BundleSummary { info, report })
}

/// Writes in-memory derived images into `dir` and repoints them at the
/// written files, so they can be listed in a project file.
///
/// File names are flattened into `dir` and clashing stems get a `_{n}`
/// suffix; the image's `file_name` is updated to match.
pub fn persist_derived(images: &mut [LabeledImage], dir: &Path) -> Result<usize, BoxforgeError> {
    fs::create_dir_all(dir)?;
    let mut used = HashSet::new();
    let mut written = 0;
    for image in images.iter_mut() {
        if let PixelData::Encoded(bytes) = &image.pixels {
            let name = claim_unique_name(&flat_file_name(&image.file_name), &mut used);
            let path = dir.join(&name);
            fs::write(&path, bytes)?;
            debug!("{} written to {}", image.id, path.display());
            image.pixels = PixelData::File(path);
            image.file_name = name;
            written += 1;
        }
    }
    Ok(written)
}
