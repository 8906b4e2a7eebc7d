use crate::alignment::matcher::SparseIntensities;
use crate::errors::{DataProcessingError, Result};
use crate::models::aligned_matrix::AlignedMatrix;
use crate::models::centroid::Centroid;
use std::collections::HashSet;
use tracing::debug;

/// Stacks per-pixel sparse vectors into a dense matrix.
///
/// `centroids` must be in id order (ascending mass); `rows[i]` belongs to
/// `pixel_ids[i]`.
pub fn build_matrix(
    centroids: &[Centroid],
    pixel_ids: Vec<String>,
    rows: &[SparseIntensities],
) -> Result<AlignedMatrix> {
    if pixel_ids.len() != rows.len() {
        return Err(DataProcessingError::ExpectedVectorSameLength(pixel_ids.len(), rows.len()).into());
    }
    let mut seen = HashSet::with_capacity(pixel_ids.len());
    for id in pixel_ids.iter() {
        if !seen.insert(id.as_str()) {
            return Err(DataProcessingError::DuplicatePixelId(id.clone()).into());
        }
    }

    let n_cols = centroids.len();
    let mut values = vec![0.0; n_cols * rows.len()];
    for (r, row) in rows.iter().enumerate() {
        let offset = r * n_cols;
        for (&centroid_id, &intensity) in row.iter() {
            let col = centroid_id as usize;
            if col >= n_cols {
                return Err(DataProcessingError::UnknownCentroid {
                    peak_index: r,
                    centroid_id,
                    num_centroids: n_cols,
                }
                .into());
            }
            values[offset + col] = intensity;
        }
    }

    let mass_labels = centroids.iter().map(|c| c.mass).collect();
    let matrix = AlignedMatrix::new(mass_labels, pixel_ids, values)?;
    debug!("Built {}", matrix);
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroids(masses: &[f64]) -> Vec<Centroid> {
        masses
            .iter()
            .enumerate()
            .map(|(i, &m)| Centroid {
                id: i as u32,
                mass: m,
                members: vec![m],
            })
            .collect()
    }

    #[test]
    fn test_dense_fill() {
        let mut r0 = SparseIntensities::default();
        r0.insert(0, 15.0);
        let mut r1 = SparseIntensities::default();
        r1.insert(1, 20.0);
        let m = build_matrix(
            &centroids(&[100.0015, 500.5]),
            vec!["s.1".into(), "s.2".into()],
            &[r0, r1],
        )
        .unwrap();
        assert_eq!(m.values(), &[15.0, 0.0, 0.0, 20.0]);
        assert_eq!(m.mass_labels(), &[100.0015, 500.5]);
    }

    #[test]
    fn test_duplicate_pixel_ids_fail() {
        let rows = vec![SparseIntensities::default(), SparseIntensities::default()];
        let out = build_matrix(&centroids(&[1.0]), vec!["a.1".into(), "a.1".into()], &rows);
        assert!(out.is_err());
    }

    #[test]
    fn test_no_centroids() {
        let rows = vec![SparseIntensities::default()];
        let m = build_matrix(&[], vec!["a.1".into()], &rows).unwrap();
        assert_eq!(m.n_rows(), 1);
        assert_eq!(m.n_cols(), 0);
    }
}
