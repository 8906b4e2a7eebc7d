use crate::errors::{ConfigError, Result};
use crate::models::centroid::{Centroid, MassAssignment};
use crate::traits::peak_aligner::PeakAligner;
use std::collections::BTreeMap;
use tracing::info;

/// Fixed-width discretization of the mass axis.
///
/// Bin `k` covers `[k * width, (k + 1) * width)` and is represented by
/// its center. Only occupied bins become centroids.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthBinner {
    width: f64,
}

impl FixedWidthBinner {
    pub fn new(width: f64) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(ConfigError::InvalidBinWidth(width).into());
        }
        Ok(Self { width })
    }

    pub fn bin_index(&self, mass: f64) -> i64 {
        (mass / self.width).floor() as i64
    }

    pub fn bin_center(&self, bin: i64) -> f64 {
        (bin as f64 + 0.5) * self.width
    }
}

impl PeakAligner for FixedWidthBinner {
    fn assign(&self, masses: &[f64]) -> MassAssignment {
        let mut occupied: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &mass) in masses.iter().enumerate() {
            occupied.entry(self.bin_index(mass)).or_default().push(i);
        }

        let mut labels = vec![0u32; masses.len()];
        let mut centroids = Vec::with_capacity(occupied.len());
        for (id, (bin, indices)) in occupied.into_iter().enumerate() {
            let mut members: Vec<f64> = indices.iter().map(|&i| masses[i]).collect();
            members.sort_unstable_by(|a, b| a.total_cmp(b));
            for i in indices {
                labels[i] = id as u32;
            }
            centroids.push(Centroid {
                id: id as u32,
                mass: self.bin_center(bin),
                members,
            });
        }

        info!(
            "Binned {} masses into {} occupied bins (width={})",
            masses.len(),
            centroids.len(),
            self.width
        );
        MassAssignment { centroids, labels }
    }

    fn background_tolerance(&self) -> f64 {
        self.width / 2.0
    }

    fn name(&self) -> &'static str {
        "binning"
    }
}
