// Re-export main structures
pub use crate::alignment::merger::{DatasetRun, ExactIdMatcher, MergeReport, Merger, NameContainsMatcher};
pub use crate::alignment::pipeline::{
    align_directory, merge_directories, AlignmentOutcome, AlignmentPipeline, RunSummary,
};
pub use crate::config::AlignmentConfig;
pub use crate::errors::{MsiAlignError, Result};
pub use crate::models::aligned_matrix::AlignedMatrix;
pub use crate::models::compiled_matrix::CompiledMatrix;
pub use crate::models::dataset::Dataset;

// Re-export traits
pub use crate::traits::aggregator::Aggregator;
pub use crate::traits::metadata_matcher::MetadataMatcher;
pub use crate::traits::peak_aligner::PeakAligner;

// Declare modules
pub mod alignment;
pub mod config;
pub mod errors;
pub mod io;
pub mod models;
pub mod traits;
pub mod utils;
