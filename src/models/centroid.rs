use crate::errors::{DataProcessingError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub id: u32,
    pub mass: f64,
    /// Member masses, ascending.
    pub members: Vec<f64>,
}

impl Centroid {
    pub fn spread(&self) -> f64 {
        match (self.members.first(), self.members.last()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        }
    }
}

/// Result of running an aligner over the global mass array.
///
/// `labels[i]` is the id of the centroid that input mass `i` was
/// grouped into. Centroid ids equal their position in `centroids`,
/// which is sorted by ascending mass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MassAssignment {
    pub centroids: Vec<Centroid>,
    pub labels: Vec<u32>,
}

impl MassAssignment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn num_centroids(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn centroid_masses(&self) -> Vec<f64> {
        self.centroids.iter().map(|c| c.mass).collect()
    }

    /// Centroid the input mass at `index` was grouped with.
    pub fn centroid_of(&self, index: usize) -> Result<&Centroid> {
        let id = *self
            .labels
            .get(index)
            .ok_or(DataProcessingError::UnassignedPeak(index))?;
        self.centroids
            .get(id as usize)
            .ok_or_else(|| {
                DataProcessingError::UnknownCentroid {
                    peak_index: index,
                    centroid_id: id,
                    num_centroids: self.centroids.len(),
                }
                .into()
            })
    }

    pub fn verify(&self) -> bool {
        let ids_ok = self
            .centroids
            .iter()
            .enumerate()
            .all(|(i, c)| c.id as usize == i);
        let sorted_ok = self.centroids.windows(2).all(|w| w[0].mass < w[1].mass);
        let labels_ok = self
            .labels
            .iter()
            .all(|&l| (l as usize) < self.centroids.len());
        let members_ok =
            self.centroids.iter().map(|c| c.members.len()).sum::<usize>() == self.labels.len();
        ids_ok && sorted_ok && labels_ok && members_ok
    }
}
