use crate::errors::{DataProcessingError, Result};
use crate::utils::display::{glimpse_vec, GlimpseConfig};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Dense pixel x centroid intensity table.
///
/// Values are stored row-major. A zero means that no peak of the pixel
/// was matched to the centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedMatrix {
    mass_labels: Vec<f64>,
    pixel_ids: Vec<String>,
    values: Vec<f64>,
}

impl AlignedMatrix {
    pub fn new(mass_labels: Vec<f64>, pixel_ids: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != mass_labels.len() * pixel_ids.len() {
            return Err(DataProcessingError::MatrixShape {
                rows: pixel_ids.len(),
                cols: mass_labels.len(),
                values: values.len(),
            }
            .into());
        }
        for (i, w) in mass_labels.windows(2).enumerate() {
            // Negated so NaN labels are rejected too.
            if !(w[0] < w[1]) {
                return Err(DataProcessingError::UnsortedMassLabels {
                    position: i + 1,
                    previous: w[0],
                    current: w[1],
                }
                .into());
            }
        }
        Ok(Self {
            mass_labels,
            pixel_ids,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.pixel_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.mass_labels.len()
    }

    pub fn mass_labels(&self) -> &[f64] {
        &self.mass_labels
    }

    pub fn pixel_ids(&self) -> &[String] {
        &self.pixel_ids
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }

    /// Number of pixels with a matched peak, per column.
    pub fn nonzero_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_cols()];
        if self.n_cols() == 0 {
            return counts;
        }
        for row in self.values.chunks_exact(self.n_cols()) {
            for (count, v) in counts.iter_mut().zip(row) {
                if *v != 0.0 {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Keeps the given columns, in the given order.
    ///
    /// Callers pass ascending indices so the label order is preserved.
    pub fn select_columns(&self, keep: &[usize]) -> Self {
        debug_assert!(keep.windows(2).all(|w| w[0] < w[1]));
        let n_cols = self.n_cols();
        let mut values = Vec::with_capacity(keep.len() * self.n_rows());
        if n_cols > 0 {
            for row in self.values.chunks_exact(n_cols) {
                values.extend(keep.iter().map(|&c| row[c]));
            }
        }
        Self {
            mass_labels: keep.iter().map(|&c| self.mass_labels[c]).collect(),
            pixel_ids: self.pixel_ids.clone(),
            values,
        }
    }
}

impl Display for AlignedMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = Some(GlimpseConfig {
            max_items: 8,
            edge_items: 3,
            padding: 0,
            new_line: false,
        });
        write!(
            f,
            "AlignedMatrix {}x{}:\n    mass_labels={},\n    pixel_ids={}",
            self.n_rows(),
            self.n_cols(),
            glimpse_vec(&self.mass_labels, config),
            glimpse_vec(&self.pixel_ids, config),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> AlignedMatrix {
        AlignedMatrix::new(
            vec![100.0, 200.0, 300.0],
            vec!["a.1".into(), "a.2".into()],
            vec![1.0, 0.0, 3.0, 0.0, 0.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_is_checked() {
        assert!(AlignedMatrix::new(vec![1.0], vec!["a".into()], vec![]).is_err());
    }

    #[test]
    fn test_labels_must_ascend() {
        let out = AlignedMatrix::new(vec![2.0, 2.0], vec![], vec![]);
        assert!(out.is_err());
    }

    #[test]
    fn test_nonzero_counts() {
        assert_eq!(sample_matrix().nonzero_counts(), vec![1, 0, 2]);
    }

    #[test]
    fn test_select_columns() {
        let m = sample_matrix().select_columns(&[0, 2]);
        assert_eq!(m.mass_labels(), &[100.0, 300.0]);
        assert_eq!(m.row(0), &[1.0, 3.0]);
        assert_eq!(m.row(1), &[0.0, 6.0]);
    }

    #[test]
    fn test_select_no_columns_keeps_rows() {
        let m = sample_matrix().select_columns(&[]);
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 0);
        assert!(m.values().is_empty());
    }
}
