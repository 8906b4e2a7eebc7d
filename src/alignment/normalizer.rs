use crate::config::NormalizationMethod;
use crate::models::aligned_matrix::AlignedMatrix;
use crate::models::compiled_matrix::CompiledMatrix;
use crate::utils::math::median;
use rayon::prelude::*;
use tracing::{debug, info};

/// Normalizes every row of a row-major buffer in place.
///
/// A row whose divisor (sum, max or median) is zero or not finite is
/// set to zero instead of being divided.
pub fn normalize_rows(values: &mut [f64], n_cols: usize, method: NormalizationMethod) {
    if n_cols == 0 || method == NormalizationMethod::None {
        return;
    }
    let num_zeroed: usize = values
        .par_chunks_mut(n_cols)
        .map(|row| usize::from(!normalize_row(row, method)))
        .sum();
    info!(
        "Normalized {} rows with {:?}, {} rows left as zero",
        values.len() / n_cols,
        method,
        num_zeroed
    );
}

/// Returns false when the row had no usable divisor and was zeroed.
pub fn normalize_row(row: &mut [f64], method: NormalizationMethod) -> bool {
    match method {
        NormalizationMethod::None => true,
        NormalizationMethod::Tic => divide_row(row, row.iter().sum()),
        NormalizationMethod::MaxPeak => {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            divide_row(row, max)
        }
        NormalizationMethod::Median => {
            let divisor = nonzero_median(row).unwrap_or(0.0);
            divide_row(row, divisor)
        }
        NormalizationMethod::MedianLog => {
            for v in row.iter_mut().filter(|v| **v != 0.0) {
                *v = v.ln_1p();
            }
            match nonzero_median(row) {
                Some(center) if center.is_finite() => {
                    for v in row.iter_mut().filter(|v| **v != 0.0) {
                        *v -= center;
                    }
                    true
                }
                _ => {
                    row.iter_mut().for_each(|v| *v = 0.0);
                    false
                }
            }
        }
    }
}

fn nonzero_median(row: &[f64]) -> Option<f64> {
    let nonzero: Vec<f64> = row.iter().copied().filter(|v| *v != 0.0).collect();
    median(&nonzero)
}

fn divide_row(row: &mut [f64], divisor: f64) -> bool {
    if divisor == 0.0 || !divisor.is_finite() {
        debug!("Row divisor is {}, leaving row as zero", divisor);
        row.iter_mut().for_each(|v| *v = 0.0);
        return false;
    }
    row.iter_mut().for_each(|v| *v /= divisor);
    true
}

impl AlignedMatrix {
    pub fn normalize(&mut self, method: NormalizationMethod) {
        let n_cols = self.n_cols();
        normalize_rows(self.values_mut(), n_cols, method);
    }
}

impl CompiledMatrix {
    pub fn normalize(&mut self, method: NormalizationMethod) {
        let n_cols = self.n_cols();
        normalize_rows(&mut self.values, n_cols, method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tic_rows_sum_to_one() {
        let mut values = vec![1.0, 3.0, 0.0, 0.0, 0.0, 0.0, 2.5, 2.5, 5.0];
        normalize_rows(&mut values, 3, NormalizationMethod::Tic);
        for row in values.chunks(3) {
            let sum: f64 = row.iter().sum();
            assert!(sum == 0.0 || (sum - 1.0).abs() < 1e-6, "row sum {}", sum);
        }
        assert_eq!(&values[3..6], &[0.0, 0.0, 0.0]);
        assert_eq!(values[1], 0.75);
    }

    #[test]
    fn test_maxpeak() {
        let mut row = vec![2.0, 8.0, 4.0];
        assert!(normalize_row(&mut row, NormalizationMethod::MaxPeak));
        assert_eq!(row, vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn test_median_ignores_missing_peaks() {
        let mut row = vec![0.0, 2.0, 0.0, 4.0, 6.0];
        assert!(normalize_row(&mut row, NormalizationMethod::Median));
        assert_eq!(row, vec![0.0, 0.5, 0.0, 1.0, 1.5]);
    }

    #[test]
    fn test_zero_rows_stay_zero() {
        for method in [
            NormalizationMethod::Tic,
            NormalizationMethod::MaxPeak,
            NormalizationMethod::Median,
            NormalizationMethod::MedianLog,
        ] {
            let mut row = vec![0.0; 4];
            assert!(!normalize_row(&mut row, method));
            assert!(row.iter().all(|v| *v == 0.0 && v.is_finite()));
        }
    }

    #[test]
    fn test_medianlog_centers_nonzero_entries() {
        let e = std::f64::consts::E;
        let mut row = vec![e - 1.0, 0.0, e * e - 1.0, e.powi(3) - 1.0];
        assert!(normalize_row(&mut row, NormalizationMethod::MedianLog));
        assert!((row[0] + 1.0).abs() < 1e-9);
        assert_eq!(row[1], 0.0);
        assert!(row[2].abs() < 1e-9);
        assert!((row[3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_none_is_passthrough() {
        let mut values = vec![1.0, 2.0];
        normalize_rows(&mut values, 2, NormalizationMethod::None);
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_matrix_without_columns() {
        let mut m = AlignedMatrix::new(vec![], vec!["a.1".into()], vec![]).unwrap();
        m.normalize(NormalizationMethod::Tic);
        assert_eq!(m.n_cols(), 0);
    }
}
