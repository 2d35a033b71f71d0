//! Augmentation executor.
//!
//! [`augment`] turns one decoded image into its derived images;
//! [`Augmenter::run`] drives a whole batch with progress, cancellation and
//! per-image failure isolation.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use image::RgbImage;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::catalog::{TransformKind, TransformSpec};
use super::geometry::propagate_boxes;
use super::ops;
use crate::decode::{decode_rgb, encode_jpeg};
use crate::error::{BoxforgeError, PartialOutput};
use crate::ir::{ImageId, ImageSize, LabeledImage, PixelData, Provenance};
use crate::report::{RunIssue, RunIssueCode, RunReport};
use crate::run::{PartialPolicy, Progress, RunContext, RunGuard};

/// One sample to render: a transform kind at one parameter value.
#[derive(Clone, Copy, Debug)]
struct SampleJob {
    kind: TransformKind,
    sample_index: usize,
    value: f64,
    seed: u64,
}

/// Expands the enabled specs into sample jobs, drawing one seed per sample
/// from `rng` in order.
fn plan_samples<R: Rng + ?Sized>(specs: &[TransformSpec], rng: &mut R) -> Vec<SampleJob> {
    specs
        .iter()
        .filter(|spec| spec.enabled)
        .flat_map(|spec| {
            spec.params
                .samples()
                .into_iter()
                .enumerate()
                .map(move |(sample_index, value)| (spec.kind, sample_index, value))
        })
        .map(|(kind, sample_index, value)| SampleJob {
            kind,
            sample_index,
            value,
            seed: rng.random(),
        })
        .collect()
}

/// Renders every enabled sample of `specs` for one decoded source image.
///
/// Results come back in catalog-configuration order. The source buffer is
/// only read. An `Err` entry is a derived image that failed to encode; the
/// other samples are unaffected.
pub fn augment<R: Rng + ?Sized>(
    source: &LabeledImage,
    pixels: &RgbImage,
    specs: &[TransformSpec],
    rng: &mut R,
) -> Vec<Result<LabeledImage, BoxforgeError>> {
    let jobs = plan_samples(specs, rng);
    let (width, height) = pixels.dimensions();

    jobs.par_iter()
        .map(|job| {
            let mut sample_rng = StdRng::seed_from_u64(job.seed);
            let rendered = ops::render(job.kind, job.value, pixels, &mut sample_rng);
            let boxes = propagate_boxes(job.kind, job.value, &source.boxes, width, height);

            let id = ImageId::derived(&source.id, job.kind, job.sample_index);
            let bytes = encode_jpeg(&id, &rendered)?;
            debug!(
                "{id}: {} = {} ({} box(es), {} bytes)",
                job.kind,
                job.value,
                boxes.len(),
                bytes.len()
            );

            let file_name = format!("{}.jpg", id.to_file_stem());
            Ok(LabeledImage {
                id,
                file_name,
                pixels: PixelData::encoded(bytes),
                size: Some(ImageSize::new(width, height)),
                boxes,
                provenance: Some(Provenance {
                    source: source.id.clone(),
                    kind: job.kind,
                    sample_index: job.sample_index,
                    value: job.value,
                }),
            })
        })
        .collect()
}

/// Result of a batch run.
#[derive(Debug)]
pub struct AugmentationOutcome {
    /// Input images, de-duplicated by id, sizes filled in where decoded.
    pub originals: Vec<LabeledImage>,
    pub derived: Vec<LabeledImage>,
    pub report: RunReport,
}

impl AugmentationOutcome {
    pub fn cancelled(&self) -> bool {
        self.report.cancelled
    }

    /// Originals followed by derived images.
    pub fn combined(&self) -> Vec<LabeledImage> {
        self.originals
            .iter()
            .chain(self.derived.iter())
            .cloned()
            .collect()
    }

    pub fn into_combined(self) -> Vec<LabeledImage> {
        let mut all = self.originals;
        all.extend(self.derived);
        all
    }
}

/// What one source image produced.
struct ProcessedImage {
    size: ImageSize,
    outputs: Vec<Result<LabeledImage, BoxforgeError>>,
}

/// Runs augmentation batches, one at a time per [`RunGuard`].
#[derive(Clone, Debug, Default)]
pub struct Augmenter {
    guard: RunGuard,
}

impl Augmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares `guard` with other runners (e.g. bundle export).
    pub fn with_guard(guard: RunGuard) -> Self {
        Self { guard }
    }

    /// Augments every eligible original in `images`.
    ///
    /// Fails with [`BoxforgeError::RunInProgress`] while another run holds
    /// the guard.
    pub fn run(
        &self,
        images: &[LabeledImage],
        ctx: &RunContext<'_>,
    ) -> Result<AugmentationOutcome, BoxforgeError> {
        let _active = self.guard.try_begin()?;
        let specs: Vec<TransformSpec> = ctx.config.enabled().cloned().collect();
        let timeout = ctx.config.decode_timeout();
        run_batch(images, ctx, |image, rng| {
            let pixels = decode_rgb(image, timeout)?;
            let (width, height) = pixels.dimensions();
            Ok(ProcessedImage {
                size: ImageSize::new(width, height),
                outputs: augment(image, &pixels, &specs, rng),
            })
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_batch<F>(
    images: &[LabeledImage],
    ctx: &RunContext<'_>,
    mut process: F,
) -> Result<AugmentationOutcome, BoxforgeError>
where
    F: FnMut(&LabeledImage, &mut StdRng) -> Result<ProcessedImage, BoxforgeError>,
{
    let config = &ctx.config;
    config.validate()?;

    let mut report = RunReport::new("augment");
    let mut seen = HashSet::new();
    let mut originals = Vec::with_capacity(images.len());
    for image in images {
        if !seen.insert(&image.id) {
            report.add(RunIssue::info(
                RunIssueCode::DuplicateImage,
                format!("duplicate image id {} ignored", image.id),
            ));
            continue;
        }
        originals.push(image.clone());
    }

    let eligible: Vec<usize> = originals
        .iter()
        .enumerate()
        .filter(|(_, image)| !image.is_derived() && image.is_eligible())
        .map(|(index, _)| index)
        .collect();
    let ineligible = originals.iter().filter(|i| !i.is_derived()).count() - eligible.len();
    if eligible.is_empty() {
        return Err(BoxforgeError::validation(
            "no image has a bounding box to augment",
        ));
    }
    if ineligible > 0 {
        report.add(RunIssue::info(
            RunIssueCode::IneligibleImage,
            format!("{ineligible} image(s) without boxes were not augmented"),
        ));
    }

    let share = config.samples_per_image();
    let total = share * eligible.len();
    report.counts.source_images = eligible.len();
    info!(
        "augmenting {} image(s) with {} transform(s), {} derived image(s) planned",
        eligible.len(),
        config.enabled().count(),
        total
    );

    let mut rng = config.rng();
    let mut derived = Vec::with_capacity(total);
    let mut completed = 0;

    for index in eligible {
        if ctx.cancel.is_cancelled() {
            info!("augmentation cancelled after {completed} of {total} sample(s)");
            report.cancelled = true;
            break;
        }

        let image = &originals[index];
        let result = panic::catch_unwind(AssertUnwindSafe(|| process(image, &mut rng)));
        match result {
            Err(payload) => {
                let message = format!(
                    "augmenting {} panicked: {}",
                    image.id,
                    panic_message(payload.as_ref())
                );
                let partial = match config.on_fatal {
                    PartialPolicy::Keep => PartialOutput::Kept(derived),
                    PartialPolicy::Discard => PartialOutput::Discarded,
                };
                return Err(BoxforgeError::Fatal { message, partial });
            }
            Ok(Err(err)) => {
                warn!("skipping {}: {err}", image.id);
                report.counts.failed_images += 1;
                report.add(RunIssue::from_error(&image.id, &err));
            }
            Ok(Ok(processed)) => {
                report.counts.processed_images += 1;
                originals[index].size = Some(processed.size);
                for output in processed.outputs {
                    match output {
                        Ok(image) => derived.push(image),
                        Err(err) => {
                            warn!("dropping derived output: {err}");
                            report.counts.skipped_outputs += 1;
                            report.add(RunIssue::from_error(&originals[index].id, &err));
                        }
                    }
                }
            }
        }

        completed += share;
        ctx.progress.on_progress(Progress { completed, total });
    }

    report.counts.outputs = derived.len();
    info!(
        "augmentation finished: {} derived image(s), {} failed source image(s)",
        derived.len(),
        report.counts.failed_images
    );

    Ok(AugmentationOutcome {
        originals,
        derived,
        report,
    })
}
