use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum MsiAlignError {
    DataReadingError(DataReadingError),
    DataProcessingError(DataProcessingError),
    ConfigError(ConfigError),
}

pub type Result<T> = std::result::Result<T, MsiAlignError>;

impl Display for MsiAlignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MsiAlignError::DataReadingError(e) => write!(f, "data reading error: {}", e),
            MsiAlignError::DataProcessingError(e) => write!(f, "data processing error: {}", e),
            MsiAlignError::ConfigError(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl std::error::Error for MsiAlignError {}

#[derive(Debug)]
pub enum DataReadingError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingDirectory(PathBuf),
    UnsupportedFormat(PathBuf),
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },
    InvalidValue {
        path: PathBuf,
        line: u64,
        value: String,
    },
    Checkpoint {
        path: PathBuf,
        reason: String,
    },
    DuplicateSample {
        path: PathBuf,
        first: PathBuf,
    },
}

impl DataReadingError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_value(path: &Path, line: u64, value: impl Display) -> Self {
        Self::InvalidValue {
            path: path.to_path_buf(),
            line,
            value: value.to_string(),
        }
    }
}

impl Display for DataReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataReadingError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            DataReadingError::Csv { path, source } => {
                write!(f, "malformed table {}: {}", path.display(), source)
            }
            DataReadingError::Json { path, source } => {
                write!(f, "malformed json {}: {}", path.display(), source)
            }
            DataReadingError::MissingDirectory(path) => {
                write!(f, "directory {} does not exist", path.display())
            }
            DataReadingError::UnsupportedFormat(path) => {
                write!(f, "unsupported file format: {}", path.display())
            }
            DataReadingError::MissingColumn { path, column } => {
                write!(f, "{} has no '{}' column", path.display(), column)
            }
            DataReadingError::InvalidValue { path, line, value } => {
                write!(
                    f,
                    "{} line {}: invalid value '{}'",
                    path.display(),
                    line,
                    value
                )
            }
            DataReadingError::Checkpoint { path, reason } => {
                write!(f, "checkpoint {}: {}", path.display(), reason)
            }
            DataReadingError::DuplicateSample { path, first } => write!(
                f,
                "{} has the same sample name as {}, its pixel ids would collide",
                path.display(),
                first.display()
            ),
        }
    }
}

#[derive(Debug)]
pub enum DataProcessingError {
    UnknownCentroid {
        peak_index: usize,
        centroid_id: u32,
        num_centroids: usize,
    },
    UnassignedPeak(usize),
    DuplicatePixelId(String),
    ExpectedVectorSameLength(usize, usize),
    MatrixShape {
        rows: usize,
        cols: usize,
        values: usize,
    },
    UnsortedMassLabels {
        position: usize,
        previous: f64,
        current: f64,
    },
}

impl Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataProcessingError::UnknownCentroid {
                peak_index,
                centroid_id,
                num_centroids,
            } => write!(
                f,
                "peak {} was assigned to centroid {} but only {} centroids exist",
                peak_index, centroid_id, num_centroids
            ),
            DataProcessingError::UnassignedPeak(idx) => {
                write!(f, "peak {} has no centroid assignment", idx)
            }
            DataProcessingError::DuplicatePixelId(id) => {
                write!(f, "pixel id '{}' appears more than once", id)
            }
            DataProcessingError::ExpectedVectorSameLength(a, b) => {
                write!(f, "expected vectors of the same length, got {} and {}", a, b)
            }
            DataProcessingError::MatrixShape { rows, cols, values } => write!(
                f,
                "a {}x{} matrix cannot hold {} values",
                rows, cols, values
            ),
            DataProcessingError::UnsortedMassLabels {
                position,
                previous,
                current,
            } => write!(
                f,
                "mass labels must be strictly ascending, column {} has {} after {}",
                position, current, previous
            ),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidClusterHeight(f64),
    InvalidBinWidth(f64),
    InvalidMassRange((f64, f64)),
    InvalidPrevalence(f64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidClusterHeight(h) => {
                write!(f, "clust_h must be finite and >= 0, got {}", h)
            }
            ConfigError::InvalidBinWidth(w) => {
                write!(f, "bin_width must be finite and > 0, got {}", w)
            }
            ConfigError::InvalidMassRange((lo, hi)) => {
                write!(f, "mass_range must satisfy min < max, got ({}, {})", lo, hi)
            }
            ConfigError::InvalidPrevalence(p) => {
                write!(f, "min_prevalence must be in [0, 1), got {}", p)
            }
        }
    }
}

impl From<DataReadingError> for MsiAlignError {
    fn from(e: DataReadingError) -> Self {
        MsiAlignError::DataReadingError(e)
    }
}

impl From<DataProcessingError> for MsiAlignError {
    fn from(e: DataProcessingError) -> Self {
        MsiAlignError::DataProcessingError(e)
    }
}

impl From<ConfigError> for MsiAlignError {
    fn from(e: ConfigError) -> Self {
        MsiAlignError::ConfigError(e)
    }
}
