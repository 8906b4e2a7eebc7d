use crate::alignment::extractor::ExtractedPeaks;
use crate::config::IntensityAggregation;
use crate::errors::{DataProcessingError, Result};
use crate::models::centroid::MassAssignment;
use crate::models::peak::Peak;
use crate::traits::aggregator::Aggregator;
use indicatif::ParallelProgressIterator;
use nohash_hasher::IntMap;
use rayon::prelude::*;
use tracing::{debug, info};

/// Centroid id -> aggregated intensity for one pixel.
/// Centroids without a matched peak are absent.
pub type SparseIntensities = IntMap<u32, f64>;

#[derive(Debug, Clone)]
pub struct PixelIntensityAggregator {
    mode: IntensityAggregation,
    intensities: SparseIntensities,
}

impl PixelIntensityAggregator {
    pub fn new(mode: IntensityAggregation) -> Self {
        Self {
            mode,
            intensities: SparseIntensities::default(),
        }
    }
}

impl Aggregator for PixelIntensityAggregator {
    type Item = (u32, f64);
    type Output = SparseIntensities;

    fn add(&mut self, item: impl Into<Self::Item>) {
        let (centroid_id, intensity) = item.into();
        match self.mode {
            IntensityAggregation::SumInts => {
                *self.intensities.entry(centroid_id).or_insert(0.0) += intensity;
            }
            IntensityAggregation::MaxInt => {
                self.intensities
                    .entry(centroid_id)
                    .and_modify(|v| {
                        if intensity > *v {
                            *v = intensity
                        }
                    })
                    .or_insert(intensity);
            }
        }
    }

    fn finalize(self) -> SparseIntensities {
        self.intensities
    }
}

/// Maps every pixel's peaks onto the centroids they were grouped with
/// by the global alignment.
///
/// The matcher only ever reads `assignment.labels`; a label that points
/// past the centroid list is reported as an error rather than being
/// redirected to some other centroid.
pub struct ClusterMatcher<'a> {
    assignment: &'a MassAssignment,
    mode: IntensityAggregation,
}

impl<'a> ClusterMatcher<'a> {
    pub fn new(assignment: &'a MassAssignment, mode: IntensityAggregation) -> Self {
        Self { assignment, mode }
    }

    /// Aggregates the peaks of one pixel; each peak comes with its index
    /// into the global mass array the assignment was computed on.
    pub fn match_pixel(
        &self,
        peaks: impl IntoIterator<Item = (usize, Peak)>,
    ) -> Result<SparseIntensities> {
        let num_centroids = self.assignment.num_centroids();
        let mut agg = PixelIntensityAggregator::new(self.mode);
        for (peak_index, peak) in peaks {
            let centroid_id = *self
                .assignment
                .labels
                .get(peak_index)
                .ok_or(DataProcessingError::UnassignedPeak(peak_index))?;
            if centroid_id as usize >= num_centroids {
                return Err(DataProcessingError::UnknownCentroid {
                    peak_index,
                    centroid_id,
                    num_centroids,
                }
                .into());
            }
            agg.add((centroid_id, peak.intensity));
        }
        Ok(agg.finalize())
    }

    /// Matches all pixels in parallel, output in pixel order.
    pub fn match_all(&self, peaks: &ExtractedPeaks) -> Result<Vec<SparseIntensities>> {
        let num_pixels = peaks.num_pixels();
        debug!(
            "Matching {} pixels onto {} centroids with {:?}",
            num_pixels,
            self.assignment.num_centroids(),
            self.mode
        );
        let out = (0..num_pixels)
            .into_par_iter()
            .progress_count(num_pixels as u64)
            .map(|pixel| self.match_pixel(peaks.pixel_peaks(pixel)))
            .collect::<Result<Vec<_>>>()?;
        let num_entries: usize = out.iter().map(|x| x.len()).sum();
        info!(
            "Matched {} pixels, {} nonzero pixel/centroid entries",
            num_pixels, num_entries
        );
        Ok(out)
    }
}
