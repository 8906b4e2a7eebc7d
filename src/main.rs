use msialign::alignment::filters::FilterReport;
use msialign::config::NormalizationMethod;
use msialign::traits::metadata_matcher::MetadataMatcher;
use msialign::{
    align_directory, merge_directories, AlignmentConfig, ExactIdMatcher, MergeReport, Merger,
    NameContainsMatcher, RunSummary,
};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Also write a chrome trace (chrome://tracing) to this file.
    #[arg(long, global = true)]
    chrome_trace: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum PossibleMatcher {
    #[default]
    Exact,
    Name,
}

#[derive(Parser, Debug)]
struct AlignArgs {
    /// Dataset root, one subdirectory per class.
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Where the aligned matrix and its metadata are written.
    #[arg(short, long)]
    output_dir: PathBuf,

    /// The path to the json file with the alignment settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Background mass list, overrides the one in the config.
    #[arg(short, long)]
    background_file: Option<PathBuf>,

    /// Directory for content addressed checkpoints.
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Output directories of previous `align` runs.
    #[arg(short, long, num_args = 1.., required = true)]
    run: Vec<PathBuf>,

    #[arg(short, long)]
    output_dir: PathBuf,

    /// Settings to take the normalization and label precision from.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    normalization: Option<NormalizationMethod>,

    #[arg(short, long, default_value_t, value_enum)]
    matcher: PossibleMatcher,

    #[arg(short, long)]
    label_decimals: Option<usize>,
}

#[derive(Parser, Debug)]
struct WriteTemplateArgs {
    /// The path to the output files.
    #[arg(short, long)]
    output_path: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align every sample of one dataset directory.
    Align(AlignArgs),
    /// Merge the outputs of several align runs.
    Merge(MergeArgs),
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Tabled)]
struct FilterStep {
    step: &'static str,
    columns: usize,
}

#[derive(Tabled)]
struct RunStatus {
    run: String,
    status: &'static str,
    reason: String,
}

fn init_tracing(chrome_trace: Option<&Path>) -> Option<FlushGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new("msialign".into(), std::io::stderr);
    let (chrome_layer, guard) = match chrome_trace {
        Some(path) => {
            let (layer, guard) = ChromeLayerBuilder::new().file(path).build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(chrome_layer);

    set_global_default(subscriber).expect("Setting default subscriber failed");
    guard
}

fn main() {
    let args = Args::parse();
    let _guard = init_tracing(args.chrome_trace.as_deref());

    let result = match args.command {
        Some(Commands::Align(args)) => main_align(args),
        Some(Commands::Merge(args)) => main_merge(args),
        Some(Commands::WriteTemplate(args)) => main_write_template(args),
        None => {
            println!("No command provided");
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> msialign::Result<AlignmentConfig> {
    match path {
        Some(path) => AlignmentConfig::from_json_path(path),
        None => Ok(AlignmentConfig::default()),
    }
}

fn filter_table(report: &FilterReport) -> Table {
    Table::new([
        FilterStep {
            step: "input",
            columns: report.input_columns,
        },
        FilterStep {
            step: "prevalence",
            columns: report.after_prevalence,
        },
        FilterStep {
            step: "background",
            columns: report.after_background,
        },
        FilterStep {
            step: "mass range",
            columns: report.after_mass_range,
        },
    ])
}

fn main_align(args: AlignArgs) -> msialign::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(background) = args.background_file {
        config.background_file = Some(background);
    }
    let summary: RunSummary = align_directory(
        config,
        &args.input_dir,
        &args.output_dir,
        args.checkpoint_dir.as_deref(),
    )?;

    println!(
        "Dataset '{}': {} pixels, {} peaks, aligned by {}",
        summary.dataset, summary.pixels, summary.peaks, summary.aligner
    );
    println!("{}", filter_table(&summary.filter_report));
    for failure in summary.failures.iter() {
        println!("Failed sample {}: {}", failure.path.display(), failure.reason);
    }
    println!("Wrote results to {}", args.output_dir.display());
    Ok(())
}

fn main_merge(args: MergeArgs) -> msialign::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let normalization = args.normalization.unwrap_or(config.normalization_method);
    let label_decimals = args.label_decimals.unwrap_or(config.label_decimals);
    let matcher: Box<dyn MetadataMatcher> = match args.matcher {
        PossibleMatcher::Exact => Box::new(ExactIdMatcher),
        PossibleMatcher::Name => Box::new(NameContainsMatcher),
    };
    let merger = Merger::new(matcher, label_decimals);

    let report: MergeReport = merge_directories(&args.run, &args.output_dir, &merger, normalization)?;

    let statuses = report
        .merged
        .iter()
        .map(|name| RunStatus {
            run: name.clone(),
            status: "merged",
            reason: String::new(),
        })
        .chain(report.skipped.iter().map(|s| RunStatus {
            run: s.name.clone(),
            status: "skipped",
            reason: s.reason.clone(),
        }));
    println!("{}", Table::new(statuses));
    println!(
        "Compiled matrix: {} rows x {} columns, normalization {:?}",
        report.rows, report.columns, normalization
    );
    Ok(())
}

fn main_write_template(args: WriteTemplateArgs) -> msialign::Result<()> {
    let put_path = args.output_path;
    std::fs::create_dir_all(&put_path)
        .map_err(|e| msialign::errors::DataReadingError::io(&put_path, e))?;
    let config_path = put_path.join("alignment_config.json");
    println!("Writing to {}", config_path.display());
    msialign::io::write_json(&config_path, &AlignmentConfig::default())?;
    println!(
        "use as `msialign align --input-dir 'your_dataset' --output-dir '.' --config {:#?}`",
        config_path,
    );
    Ok(())
}
