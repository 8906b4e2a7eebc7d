use crate::errors::{DataProcessingError, Result};
use crate::sort_vecs_by_mass;
use serde::{Deserialize, Serialize};

/// One extracted peak; `pixel_id` is the pixel's position in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub mass: f64,
    pub intensity: f64,
    pub pixel_id: u32,
}

/// The peak list of a single pixel, sorted by mass.
///
/// Fields are private so a spectrum cannot change after it is built;
/// the TIC is computed once on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelSpectrum {
    sample: String,
    scan: u32,
    class: String,
    mz: Vec<f64>,
    intensity: Vec<f64>,
    tic: f64,
}

impl PixelSpectrum {
    pub fn new(
        sample: impl Into<String>,
        scan: u32,
        class: impl Into<String>,
        mz: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(
                DataProcessingError::ExpectedVectorSameLength(mz.len(), intensity.len()).into(),
            );
        }
        let (mz, intensity) = if mz.windows(2).all(|w| w[0] <= w[1]) {
            (mz, intensity)
        } else {
            sort_vecs_by_mass!(&mz, &intensity)
        };
        let tic = intensity.iter().sum();
        Ok(Self {
            sample: sample.into(),
            scan,
            class: class.into(),
            mz,
            intensity,
            tic,
        })
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn scan(&self) -> u32 {
        self.scan
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn tic(&self) -> f64 {
        self.tic
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// `sample.scan`, the row label used in aligned matrices.
    pub fn pixel_label(&self) -> String {
        format!("{}.{}", self.sample, self.scan)
    }
}
