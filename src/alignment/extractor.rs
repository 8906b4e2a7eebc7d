use crate::models::dataset::Dataset;
use crate::models::peak::Peak;
use crate::utils::offsets::offsets_from_lengths;
use std::ops::Range;
use tracing::{debug, info};

/// Every peak of a dataset flattened into global arrays.
///
/// Pixel `i` owns `masses[pixel_offsets[i]..pixel_offsets[i + 1]]`.
/// Injected background masses are appended after the last pixel and
/// belong to no pixel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedPeaks {
    masses: Vec<f64>,
    intensities: Vec<f64>,
    pixel_offsets: Vec<usize>,
}

impl ExtractedPeaks {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let lengths: Vec<usize> = dataset.pixels().map(|p| p.len()).collect();
        let pixel_offsets = offsets_from_lengths(&lengths);
        let total = *pixel_offsets.last().unwrap_or(&0);

        let mut masses = Vec::with_capacity(total);
        let mut intensities = Vec::with_capacity(total);
        for pixel in dataset.pixels() {
            masses.extend_from_slice(pixel.mz());
            intensities.extend_from_slice(pixel.intensity());
        }

        info!(
            "Extracted {} peaks from {} pixels of dataset '{}'",
            total,
            lengths.len(),
            dataset.name
        );
        Self {
            masses,
            intensities,
            pixel_offsets,
        }
    }

    pub fn with_background(mut self, background: &[f64]) -> Self {
        debug!("Injecting {} background masses", background.len());
        self.masses.extend_from_slice(background);
        self
    }

    pub fn num_pixels(&self) -> usize {
        self.pixel_offsets.len().saturating_sub(1)
    }

    pub fn num_observed(&self) -> usize {
        *self.pixel_offsets.last().unwrap_or(&0)
    }

    /// Every mass that takes part in the global alignment,
    /// observed peaks first and background after them.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn background_range(&self) -> Range<usize> {
        self.num_observed()..self.masses.len()
    }

    pub fn pixel_range(&self, pixel: usize) -> Range<usize> {
        self.pixel_offsets[pixel]..self.pixel_offsets[pixel + 1]
    }

    /// The peaks of one pixel, each with its index into the global arrays.
    pub fn pixel_peaks(&self, pixel: usize) -> impl Iterator<Item = (usize, Peak)> + '_ {
        self.pixel_range(pixel).map(move |i| {
            let peak = Peak {
                mass: self.masses[i],
                intensity: self.intensities[i],
                pixel_id: pixel as u32,
            };
            (i, peak)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dataset::ClassGroup;
    use crate::models::peak::PixelSpectrum;

    fn two_pixel_dataset() -> Dataset {
        Dataset {
            name: "d".into(),
            classes: vec![ClassGroup {
                name: "c".into(),
                spectra: vec![
                    PixelSpectrum::new("s", 1, "c", vec![100.001, 100.002], vec![10.0, 5.0])
                        .unwrap(),
                    PixelSpectrum::new("s", 2, "c", vec![500.5], vec![20.0]).unwrap(),
                ],
            }],
        }
    }

    #[test]
    fn test_flatten_keeps_pixel_ranges() {
        let peaks = ExtractedPeaks::from_dataset(&two_pixel_dataset());
        assert_eq!(peaks.num_pixels(), 2);
        assert_eq!(peaks.num_observed(), 3);
        assert_eq!(peaks.pixel_range(0), 0..2);
        assert_eq!(peaks.pixel_range(1), 2..3);
        assert_eq!(peaks.masses(), &[100.001, 100.002, 500.5]);

        let second: Vec<(usize, Peak)> = peaks.pixel_peaks(1).collect();
        assert_eq!(
            second,
            vec![(
                2,
                Peak {
                    mass: 500.5,
                    intensity: 20.0,
                    pixel_id: 1
                }
            )]
        );
    }

    #[test]
    fn test_background_is_appended() {
        let peaks = ExtractedPeaks::from_dataset(&two_pixel_dataset()).with_background(&[42.0]);
        assert_eq!(peaks.masses().len(), 4);
        assert_eq!(peaks.num_observed(), 3);
        assert_eq!(peaks.background_range(), 3..4);
        let owned: usize = (0..peaks.num_pixels())
            .map(|p| peaks.pixel_peaks(p).count())
            .sum();
        assert_eq!(owned, 3);
    }

    #[test]
    fn test_empty_dataset() {
        let peaks = ExtractedPeaks::from_dataset(&Dataset::new("empty"));
        assert_eq!(peaks.num_pixels(), 0);
        assert!(peaks.masses().is_empty());
    }
}
