// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 vidtrack developers.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::{fs::File, io::BufReader, path::PathBuf};
use vidtrack::{
    DatasetRegistry, Error, FrameIndexing, OrphanPolicy, Settings, TrackIdentity,
    VideoWriteOptions, VideoWriter, check_record, convert, scan_dataset, validate_value,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file, defaults to vidtrack.toml in the user config directory
    #[clap(long, env = "VIDTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Convert a frame-level COCO annotation file (.json or .zip) into a
    /// video track dataset.
    Convert {
        /// Frame-level annotation file
        input: PathBuf,

        /// Output video dataset JSON
        output: PathBuf,

        /// What to do with annotations whose frame belongs to no video
        #[clap(long, value_enum)]
        orphans: Option<Orphans>,

        /// How an observation's frame position is determined
        #[clap(long, value_enum)]
        frame_index: Option<FrameIndex>,

        /// How observations are linked into one track
        #[clap(long, value_enum)]
        track_identity: Option<Identity>,

        /// Pretty-print the output JSON
        #[clap(long)]
        pretty: bool,

        /// Fail when the conversion reports issues or the output does not
        /// validate
        #[clap(long)]
        strict: bool,
    },
    /// Validate the structure of a video dataset JSON file.
    Validate {
        /// Video dataset JSON
        file: PathBuf,
    },
    /// Build a video dataset without annotations from a directory holding
    /// one sub-directory of frames per video.
    Scan {
        /// Directory of video folders
        video_dir: PathBuf,

        /// Output video dataset JSON
        output: PathBuf,

        /// Pretty-print the output JSON
        #[clap(long)]
        pretty: bool,
    },
    /// List the configured datasets.
    Datasets,
    /// Load a configured dataset and check its frames on disk.
    Check {
        /// Dataset name
        dataset: String,
    },
}

#[derive(ValueEnum, PartialEq, Eq, Clone, Copy, Debug)]
enum Orphans {
    Skip,
    Fail,
}

impl From<Orphans> for OrphanPolicy {
    fn from(value: Orphans) -> Self {
        match value {
            Orphans::Skip => OrphanPolicy::Skip,
            Orphans::Fail => OrphanPolicy::Fail,
        }
    }
}

#[derive(ValueEnum, PartialEq, Eq, Clone, Copy, Debug)]
enum FrameIndex {
    /// Position of the frame in its sorted video
    Position,
    /// Integer parsed from the frame file stem
    Stem,
}

impl From<FrameIndex> for FrameIndexing {
    fn from(value: FrameIndex) -> Self {
        match value {
            FrameIndex::Position => FrameIndexing::Position,
            FrameIndex::Stem => FrameIndexing::FileStem,
        }
    }
}

#[derive(ValueEnum, PartialEq, Eq, Clone, Copy, Debug)]
enum Identity {
    /// Track id when present, annotation id otherwise
    Auto,
    /// Always the annotation id
    Annotation,
}

impl From<Identity> for TrackIdentity {
    fn from(value: Identity) -> Self {
        match value {
            Identity::Auto => TrackIdentity::Auto,
            Identity::Annotation => TrackIdentity::AnnotationId,
        }
    }
}

struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,
    orphans: Option<Orphans>,
    frame_index: Option<FrameIndex>,
    track_identity: Option<Identity>,
    pretty: bool,
    strict: bool,
}

fn handle_convert(settings: &Settings, args: ConvertArgs) -> Result<(), Error> {
    let mut options = settings.conversion;
    if let Some(orphans) = args.orphans {
        options.orphan_policy = orphans.into();
    }
    if let Some(frame_index) = args.frame_index {
        options.frame_indexing = frame_index.into();
    }
    if let Some(identity) = args.track_identity {
        options.track_identity = identity.into();
    }
    let write_options = VideoWriteOptions {
        pretty: args.pretty || settings.pretty,
    };

    let conversion = convert(&args.input, &args.output, &options, write_options)?;

    println!("{}", conversion.summary());
    for (kind, count) in conversion.issue_counts() {
        println!("  {:<24} {}", kind, count);
    }
    if !conversion.validation.is_valid() {
        println!("{}", conversion.validation);
    }

    if args.strict && (!conversion.issues.is_empty() || !conversion.validation.is_valid()) {
        return Err(Error::InvalidDataset(format!(
            "{}: {} issue(s), {} violation(s)",
            args.output.display(),
            conversion.issues.len(),
            conversion.validation.violations.len()
        )));
    }
    Ok(())
}

fn handle_validate(file: PathBuf) -> Result<(), Error> {
    let reader = BufReader::with_capacity(64 * 1024, File::open(&file)?);
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let report = validate_value(&value);

    println!("{}", report);
    if report.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidDataset(format!(
            "{}: {} violation(s)",
            file.display(),
            report.violations.len()
        )))
    }
}

fn handle_scan(
    settings: &Settings,
    video_dir: PathBuf,
    output: PathBuf,
    pretty: bool,
) -> Result<(), Error> {
    let dataset = scan_dataset(&video_dir)?;
    let frames: usize = dataset.videos.iter().map(|v| v.length).sum();

    VideoWriter::with_options(VideoWriteOptions {
        pretty: pretty || settings.pretty,
    })
    .write_json(&dataset, &output)?;

    println!(
        "Found {} videos with {} frames in {}",
        dataset.videos.len(),
        frames,
        video_dir.display()
    );
    info!("Saved video dataset to {}", output.display());
    Ok(())
}

fn handle_datasets(registry: &DatasetRegistry) -> Result<(), Error> {
    if registry.is_empty() {
        warn!("No datasets configured");
    }
    for name in registry.names() {
        let metadata = registry.metadata(name)?;
        println!(
            "{} [{}] classes: {}",
            name,
            metadata.evaluator_type,
            metadata.thing_classes.join(", ")
        );
    }
    Ok(())
}

fn handle_check(registry: &DatasetRegistry, dataset: String) -> Result<(), Error> {
    let records = registry.get(&dataset)?;

    let bar = ProgressBar::new(records.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(dataset.clone());

    let problems: Vec<_> = records
        .par_iter()
        .flat_map_iter(|record| {
            let problems = check_record(record);
            bar.inc(1);
            problems
        })
        .collect();
    bar.finish_and_clear();

    for problem in &problems {
        println!("{}", problem);
    }

    let frames: usize = records.iter().map(|r| r.file_names.len()).sum();
    println!(
        "{}: {} videos, {} frames, {} problem(s)",
        dataset,
        records.len(),
        frames,
        problems.len()
    );

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidDataset(format!(
            "{}: {} problem(s)",
            dataset,
            problems.len()
        )))
    }
}

#[cfg(feature = "profiling")]
fn init_profiling() {
    use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        warn!("Tracing disabled: {}", err);
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    init_profiling();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    match args.cmd {
        Command::Convert {
            input,
            output,
            orphans,
            frame_index,
            track_identity,
            pretty,
            strict,
        } => handle_convert(
            &settings,
            ConvertArgs {
                input,
                output,
                orphans,
                frame_index,
                track_identity,
                pretty,
                strict,
            },
        ),
        Command::Validate { file } => handle_validate(file),
        Command::Scan {
            video_dir,
            output,
            pretty,
        } => handle_scan(&settings, video_dir, output, pretty),
        Command::Datasets => handle_datasets(&DatasetRegistry::from_settings(&settings)?),
        Command::Check { dataset } => {
            handle_check(&DatasetRegistry::from_settings(&settings)?, dataset)
        }
    }
}
