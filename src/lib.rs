//! Boxforge: annotation-aware image augmentation and dataset export.
//!
//! Boxforge takes images labeled with bounding boxes, enlarges the set with
//! geometric, color, noise, occlusion and weather augmentations while keeping
//! every box aligned with its pixels, then partitions the result into
//! train/val/test splits and writes it as a YOLO, COCO or Pascal VOC bundle.
//!
//! # Modules
//!
//! - [`ir`]: Annotation model (labeled images, boxes, class list, project file)
//! - [`augment`]: Transform catalog, pixel operations and the executor
//! - [`split`]: Train/val/test partitioning
//! - [`export`]: Format exporters
//! - [`archive`]: Bundle writer (directory or zip)
//! - [`run`]: Run guard, cancellation and progress
//! - [`error`]: Error types for boxforge operations

pub mod archive;
pub mod augment;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod ir;
pub mod report;
pub mod run;
pub mod split;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

pub use error::BoxforgeError;

use crate::archive::{sink_for_path, BundleBuilder, ExportOptions};
use crate::augment::{Augmenter, TransformCatalog};
use crate::config::AugmentConfig;
use crate::export::ExportFormat;
use crate::report::RunReport;
use crate::run::{Progress, RunContext, RunGuard};
use crate::split::SplitRatio;

/// The boxforge CLI application.
#[derive(Parser)]
#[command(name = "boxforge")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List every augmentation with its family, parameter shape and default.
    Catalog,
    /// Augment a project and write originals plus derived images.
    Augment(AugmentArgs),
    /// Partition a project and write a dataset bundle.
    Export(ExportArgs),
}

/// Arguments for the augment subcommand.
#[derive(clap::Args)]
struct AugmentArgs {
    /// Project JSON listing the labeled images.
    project: PathBuf,

    /// YAML augmentation config.
    #[arg(long, short = 'c')]
    config: PathBuf,

    /// Output directory; receives `images/` and `project.json`.
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Override the config seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Run report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Project JSON listing the labeled images.
    project: PathBuf,

    /// Dataset format.
    #[arg(long, short = 'f', value_enum)]
    format: ExportFormat,

    /// Output directory, or a `.zip` file.
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Train/val/test percentages.
    #[arg(long, default_value = "70,20,10")]
    split: SplitRatio,

    /// Seed for the partition shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Run report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Run the boxforge CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BoxforgeError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Catalog) => {
            print!("{}", TransformCatalog.describe());
            Ok(())
        }
        Some(Commands::Augment(args)) => run_augment(args),
        Some(Commands::Export(args)) => run_export(args),
        None => {
            println!("boxforge {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation-aware augmentation and dataset export.");
            println!();
            println!("Run 'boxforge --help' for usage information.");
            Ok(())
        }
    }
}

fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{label}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn print_report(report: &RunReport, format: ReportFormat) -> Result<(), BoxforgeError> {
    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|source| BoxforgeError::ManifestWrite { source })?;
            println!("{json}");
        }
        ReportFormat::Text => print!("{report}"),
    }
    Ok(())
}

/// Execute the augment subcommand.
fn run_augment(args: AugmentArgs) -> Result<(), BoxforgeError> {
    let images = ir::io_json::read_project_json(&args.project)?;
    let mut config = AugmentConfig::from_path(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    info!(
        "loaded {} image(s) from {}",
        images.len(),
        args.project.display()
    );

    let eligible = images.iter().filter(|i| i.is_eligible()).count();
    let pb = progress_bar(eligible * config.samples_per_image(), "augment");
    let sink = |p: Progress| pb.set_position(p.completed as u64);
    let ctx = RunContext::new(Arc::new(config), &sink);

    let outcome = Augmenter::with_guard(RunGuard::new()).run(&images, &ctx)?;
    pb.finish_and_clear();

    let report = outcome.report.clone();
    let mut combined = outcome.into_combined();
    let written = archive::persist_derived(&mut combined, &args.output.join("images"))?;
    ir::io_json::write_project_json(&args.output.join("project.json"), &combined)?;
    info!(
        "wrote {written} derived image(s) and project.json to {}",
        args.output.display()
    );

    print_report(&report, args.report)
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs) -> Result<(), BoxforgeError> {
    let images = ir::io_json::read_project_json(&args.project)?;
    let mut options = ExportOptions::new(args.format).with_ratio(args.split);
    options.seed = args.seed;

    let pb = progress_bar(images.iter().filter(|i| i.is_eligible()).count(), "export");
    let progress = |p: Progress| pb.set_position(p.completed as u64);
    let mut sink = sink_for_path(&args.output)?;

    let summary = BundleBuilder::new().build_with_progress(
        &images,
        &options,
        sink.as_mut(),
        &progress,
    )?;
    pb.finish_and_clear();

    print_report(&summary.report, args.report)?;
    println!(
        "Exported {} image(s) with {} label(s) to {}",
        summary.info.total_images,
        summary.info.total_labels,
        args.output.display()
    );
    Ok(())
}
