use crate::alignment::binning::FixedWidthBinner;
use crate::alignment::clusterer::HierarchicalClusterer;
use crate::alignment::extractor::ExtractedPeaks;
use crate::alignment::filters::{BackgroundFilter, FilterPipeline, FilterReport};
use crate::alignment::matcher::ClusterMatcher;
use crate::alignment::matrix_builder::build_matrix;
use crate::alignment::merger::{DatasetRun, MergeReport, Merger};
use crate::config::{AlignmentConfig, NormalizationMethod, PeakAlignmentMethod};
use crate::errors::{DataReadingError, Result};
use crate::io::background::read_background;
use crate::io::checkpoint::{CheckpointStage, CheckpointStore};
use crate::io::dataset_reader::{load_dataset, DatasetScan, LoadedDataset, SampleFailure};
use crate::io::matrix_io::{
    read_aligned_matrix, read_metadata, write_aligned_matrix, write_compiled_matrix,
    write_metadata, ALIGNED_MATRIX_FILE, COMPILED_MATRIX_FILE, PIXEL_METADATA_FILE,
};
use crate::io::{read_json, write_json};
use crate::models::aligned_matrix::AlignedMatrix;
use crate::models::dataset::Dataset;
use crate::models::metadata::PixelMetadataTable;
use crate::traits::peak_aligner::PeakAligner;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const FILTER_REPORT_FILE: &str = "filter_report.json";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
pub const MERGE_REPORT_FILE: &str = "merge_report.json";

/// Everything one dataset produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOutcome {
    pub dataset: String,
    pub aligner: String,
    pub unfiltered_columns: usize,
    pub matrix: AlignedMatrix,
    pub metadata: PixelMetadataTable,
    pub report: FilterReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub dataset: String,
    pub aligner: String,
    pub pixels: usize,
    pub peaks: usize,
    pub filter_report: FilterReport,
    pub failures: Vec<SampleFailure>,
    pub checkpoint_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AlignmentPipeline {
    config: AlignmentConfig,
    background: Vec<f64>,
}

impl AlignmentPipeline {
    /// Validates the configuration and reads the background list if one
    /// is configured. A missing background file fails here.
    pub fn new(config: AlignmentConfig) -> Result<Self> {
        config.validate()?;
        let background = match &config.background_file {
            Some(path) => read_background(path)?,
            None => Vec::new(),
        };
        Ok(Self { config, background })
    }

    pub fn with_background(config: AlignmentConfig, background: Vec<f64>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, background })
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    pub fn aligner(&self) -> Result<Box<dyn PeakAligner>> {
        let aligner: Box<dyn PeakAligner> = match self.config.peak_alignment_method {
            PeakAlignmentMethod::Clustering => Box::new(HierarchicalClusterer::new(
                self.config.clust_h,
                self.config.clust_linkage,
                self.config.centroid_method,
            )?),
            PeakAlignmentMethod::Binning => Box::new(FixedWidthBinner::new(self.config.bin_width)?),
        };
        Ok(aligner)
    }

    #[instrument(skip_all, fields(dataset = %dataset.name))]
    pub fn run(&self, dataset: &Dataset) -> Result<AlignmentOutcome> {
        let aligner = self.aligner()?;
        let inject = self.config.inject_background && !self.background.is_empty();

        let mut peaks = ExtractedPeaks::from_dataset(dataset);
        if inject {
            peaks = peaks.with_background(&self.background);
        }
        let assignment = aligner.assign(peaks.masses());

        let rows = ClusterMatcher::new(&assignment, self.config.clust_int_method).match_all(&peaks)?;
        let matrix = build_matrix(&assignment.centroids, dataset.pixel_labels(), &rows)?;
        let unfiltered_columns = matrix.n_cols();

        let background = if self.background.is_empty() {
            None
        } else {
            let assigned = if inject {
                peaks
                    .background_range()
                    .map(|i| assignment.centroid_of(i).map(|c| c.mass))
                    .collect::<Result<Vec<f64>>>()?
            } else {
                Vec::new()
            };
            Some(
                BackgroundFilter::new(self.background.clone(), aligner.background_tolerance())
                    .with_assigned_centroids(assigned),
            )
        };
        let filters = FilterPipeline {
            min_prevalence: self.config.min_prevalence,
            background,
            mass_range: self.config.mass_range,
        };
        let outcome = filters.apply(&matrix);

        Ok(AlignmentOutcome {
            dataset: dataset.name.clone(),
            aligner: aligner.name().to_string(),
            unfiltered_columns,
            matrix: outcome.matrix,
            metadata: dataset.metadata_table(),
            report: outcome.report,
        })
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| DataReadingError::io(path, e).into())
}

/// Loads, aligns and filters one dataset directory and writes its
/// artifacts to `output_dir`.
#[instrument(skip(config))]
pub fn align_directory(
    config: AlignmentConfig,
    input_dir: &Path,
    output_dir: &Path,
    checkpoint_root: Option<&Path>,
) -> Result<RunSummary> {
    let pipeline = AlignmentPipeline::new(config)?;
    let scan = DatasetScan::from_dir(input_dir)?;
    let store = checkpoint_root
        .map(|root| CheckpointStore::new(root, pipeline.config(), &scan))
        .transpose()?;

    let cached: Option<LoadedDataset> = match &store {
        Some(s) => s.load(CheckpointStage::Dataset)?,
        None => None,
    };
    let loaded = match cached {
        Some(loaded) => loaded,
        None => {
            let loaded = load_dataset(&scan, pipeline.config().fail_fast)?;
            if let Some(s) = &store {
                s.store(CheckpointStage::Dataset, &loaded)?;
            }
            loaded
        }
    };

    let cached: Option<AlignmentOutcome> = match &store {
        Some(s) => s.load(CheckpointStage::AlignedMatrix)?,
        None => None,
    };
    let outcome = match cached {
        Some(outcome) => outcome,
        None => {
            let outcome = pipeline.run(&loaded.dataset)?;
            if let Some(s) = &store {
                s.store(CheckpointStage::AlignedMatrix, &outcome)?;
            }
            outcome
        }
    };

    create_dir(output_dir)?;
    write_metadata(&output_dir.join(PIXEL_METADATA_FILE), &outcome.metadata)?;
    write_aligned_matrix(&output_dir.join(ALIGNED_MATRIX_FILE), &outcome.matrix)?;
    write_json(&output_dir.join(FILTER_REPORT_FILE), &outcome.report)?;

    let summary = RunSummary {
        dataset: outcome.dataset.clone(),
        aligner: outcome.aligner.clone(),
        pixels: loaded.dataset.num_pixels(),
        peaks: loaded.dataset.num_peaks(),
        filter_report: outcome.report.clone(),
        failures: loaded.failures,
        checkpoint_key: store.map(|s| s.key().to_string()),
    };
    write_json(&output_dir.join(RUN_SUMMARY_FILE), &summary)?;
    info!(
        "Aligned dataset '{}' into {} ({} columns)",
        summary.dataset,
        output_dir.display(),
        summary.filter_report.after_mass_range
    );
    Ok(summary)
}

/// Reads the aligned matrix of a run directory and every metadata table
/// next to it. The run is named after the dataset in its summary, or
/// after the directory when no summary exists.
pub fn read_run_directory(run_dir: &Path) -> Result<(DatasetRun, Vec<PixelMetadataTable>)> {
    if !run_dir.is_dir() {
        return Err(DataReadingError::MissingDirectory(run_dir.to_path_buf()).into());
    }
    let summary_path = run_dir.join(RUN_SUMMARY_FILE);
    let name = if summary_path.is_file() {
        read_json::<RunSummary>(&summary_path)?.dataset
    } else {
        warn!(
            "{} has no {}, naming the run after the directory",
            run_dir.display(),
            RUN_SUMMARY_FILE
        );
        run_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    };
    let matrix = read_aligned_matrix(&run_dir.join(ALIGNED_MATRIX_FILE))?;

    let entries = std::fs::read_dir(run_dir).map_err(|e| DataReadingError::io(run_dir, e))?;
    let mut metadata_paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DataReadingError::io(run_dir, e))?.path();
        let is_metadata = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("metadata") && n.ends_with(".csv"));
        if is_metadata {
            metadata_paths.push(path);
        }
    }
    metadata_paths.sort();
    let tables = metadata_paths
        .iter()
        .map(|p| read_metadata(p))
        .collect::<Result<Vec<_>>>()?;
    Ok((DatasetRun { name, matrix }, tables))
}

/// Merges several run directories, normalizes the result and writes the
/// compiled matrix and merge report to `output_dir`.
#[instrument(skip(merger))]
pub fn merge_directories(
    run_dirs: &[PathBuf],
    output_dir: &Path,
    merger: &Merger,
    normalization: NormalizationMethod,
) -> Result<MergeReport> {
    let mut runs = Vec::with_capacity(run_dirs.len());
    let mut tables = Vec::new();
    for dir in run_dirs {
        let (run, run_tables) = read_run_directory(dir)?;
        runs.push(run);
        tables.extend(run_tables);
    }

    let (mut compiled, report) = merger.merge(&runs, &tables);
    compiled.normalize(normalization);

    create_dir(output_dir)?;
    write_compiled_matrix(&output_dir.join(COMPILED_MATRIX_FILE), &compiled)?;
    write_json(&output_dir.join(MERGE_REPORT_FILE), &report)?;
    Ok(report)
}
