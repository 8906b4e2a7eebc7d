use crate::models::aligned_matrix::AlignedMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Background masses and the columns they claim.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackgroundFilter {
    pub masses: Vec<f64>,
    pub tolerance: f64,
    /// Centroid masses of the clusters the background masses were
    /// grouped into when they took part in the clustering.
    pub assigned_centroids: Vec<f64>,
}

impl BackgroundFilter {
    pub fn new(masses: Vec<f64>, tolerance: f64) -> Self {
        Self {
            masses,
            tolerance,
            assigned_centroids: Vec::new(),
        }
    }

    pub fn with_assigned_centroids(mut self, centroids: Vec<f64>) -> Self {
        self.assigned_centroids = centroids;
        self
    }

    /// The background mass claiming a column at `mass`, if any.
    fn claimed_by(&self, mass: f64) -> Option<f64> {
        if let Some(&b) = self.assigned_centroids.iter().find(|&&c| c == mass) {
            return Some(b);
        }
        self.masses
            .iter()
            .copied()
            .find(|b| (b - mass).abs() <= self.tolerance)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    pub min_prevalence: f64,
    pub background: Option<BackgroundFilter>,
    pub mass_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    pub rows: usize,
    pub prevalence_threshold: usize,
    pub input_columns: usize,
    pub after_prevalence: usize,
    pub after_background: usize,
    pub after_mass_range: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub matrix: AlignedMatrix,
    pub report: FilterReport,
}

impl FilterOutcome {
    pub fn retained_masses(&self) -> &[f64] {
        self.matrix.mass_labels()
    }
}

impl FilterPipeline {
    #[instrument(skip_all)]
    pub fn apply(&self, matrix: &AlignedMatrix) -> FilterOutcome {
        let input_columns = matrix.n_cols();
        let (matrix, prevalence_threshold) = prevalence_filter(matrix, self.min_prevalence);
        let after_prevalence = matrix.n_cols();
        let matrix = match &self.background {
            Some(background) => background_filter(&matrix, background),
            None => matrix,
        };
        let after_background = matrix.n_cols();
        let matrix = mass_range_filter(&matrix, self.mass_range);

        let report = FilterReport {
            rows: matrix.n_rows(),
            prevalence_threshold,
            input_columns,
            after_prevalence,
            after_background,
            after_mass_range: matrix.n_cols(),
        };
        info!(
            "Filtered columns {} -> {} (prevalence) -> {} (background) -> {} (mass range)",
            report.input_columns,
            report.after_prevalence,
            report.after_background,
            report.after_mass_range
        );
        FilterOutcome { matrix, report }
    }
}

/// Keeps columns whose nonzero count is strictly above
/// `floor(fraction * rows)`. Returns the threshold used.
pub fn prevalence_filter(matrix: &AlignedMatrix, fraction: f64) -> (AlignedMatrix, usize) {
    let threshold = (fraction * matrix.n_rows() as f64).floor() as usize;
    let counts = matrix.nonzero_counts();
    let keep: Vec<usize> = counts
        .iter()
        .enumerate()
        .filter_map(|(col, &count)| {
            if count > threshold {
                Some(col)
            } else {
                debug!(
                    "Dropping column {} (prevalence): {} nonzero pixels, needs more than {}",
                    matrix.mass_labels()[col],
                    count,
                    threshold
                );
                None
            }
        })
        .collect();
    (matrix.select_columns(&keep), threshold)
}

pub fn background_filter(matrix: &AlignedMatrix, background: &BackgroundFilter) -> AlignedMatrix {
    let keep: Vec<usize> = matrix
        .mass_labels()
        .iter()
        .enumerate()
        .filter_map(|(col, &mass)| match background.claimed_by(mass) {
            Some(b) => {
                debug!(
                    "Dropping column {} (background): claimed by background mass {} (tolerance {})",
                    mass, b, background.tolerance
                );
                None
            }
            None => Some(col),
        })
        .collect();
    matrix.select_columns(&keep)
}

/// Keeps columns with `lower < mass < upper`.
pub fn mass_range_filter(matrix: &AlignedMatrix, mass_range: (f64, f64)) -> AlignedMatrix {
    let (lower, upper) = mass_range;
    let keep: Vec<usize> = matrix
        .mass_labels()
        .iter()
        .enumerate()
        .filter_map(|(col, &mass)| {
            if lower < mass && mass < upper {
                Some(col)
            } else {
                debug!(
                    "Dropping column {} (mass range): outside ({}, {})",
                    mass, lower, upper
                );
                None
            }
        })
        .collect();
    matrix.select_columns(&keep)
}
