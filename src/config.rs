use crate::errors::{ConfigError, DataReadingError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PeakAlignmentMethod {
    #[default]
    Clustering,
    Binning,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    #[default]
    Single,
    Average,
    Complete,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentroidMethod {
    #[default]
    Mean,
    Median,
}

/// How intensities of several peaks landing on the same centroid
/// within one pixel are combined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityAggregation {
    #[default]
    SumInts,
    MaxInt,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum NormalizationMethod {
    Tic,
    #[cfg_attr(feature = "clap", value(name = "maxpeak"))]
    MaxPeak,
    Median,
    #[cfg_attr(feature = "clap", value(name = "medianlog"))]
    MedianLog,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub mass_range: (f64, f64),
    pub peak_alignment_method: PeakAlignmentMethod,
    pub clust_h: f64,
    pub clust_linkage: Linkage,
    pub centroid_method: CentroidMethod,
    pub bin_width: f64,
    pub clust_int_method: IntensityAggregation,
    pub normalization_method: NormalizationMethod,
    pub min_prevalence: f64,
    pub background_file: Option<PathBuf>,
    pub inject_background: bool,
    pub label_decimals: usize,
    pub fail_fast: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        AlignmentConfig {
            mass_range: (50.0, 1200.0),
            peak_alignment_method: PeakAlignmentMethod::Clustering,
            clust_h: 0.005,
            clust_linkage: Linkage::Single,
            centroid_method: CentroidMethod::Mean,
            bin_width: 0.01,
            clust_int_method: IntensityAggregation::SumInts,
            normalization_method: NormalizationMethod::None,
            min_prevalence: 0.10,
            background_file: None,
            inject_background: true,
            label_decimals: 4,
            fail_fast: false,
        }
    }
}

impl AlignmentConfig {
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| DataReadingError::io(path, e))?;
        let config: AlignmentConfig =
            serde_json::from_str(&text).map_err(|e| DataReadingError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.clust_h.is_finite() || self.clust_h < 0.0 {
            return Err(ConfigError::InvalidClusterHeight(self.clust_h).into());
        }
        if !self.bin_width.is_finite() || self.bin_width <= 0.0 {
            return Err(ConfigError::InvalidBinWidth(self.bin_width).into());
        }
        let (lo, hi) = self.mass_range;
        // An infinite upper bound is a valid "no limit".
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(ConfigError::InvalidMassRange(self.mass_range).into());
        }
        if !(0.0..1.0).contains(&self.min_prevalence) {
            return Err(ConfigError::InvalidPrevalence(self.min_prevalence).into());
        }
        Ok(())
    }
}
