use crate::config::{CentroidMethod, Linkage};
use crate::errors::{ConfigError, Result};
use crate::models::centroid::{Centroid, MassAssignment};
use crate::traits::peak_aligner::PeakAligner;
use crate::utils::math::{mean, median_sorted};
use crate::utils::sorting::argsort_masses;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// Hierarchical clustering of 1-D masses cut at a fixed height.
///
/// Masses are first ordered by (mass, input index). In one dimension
/// every cluster produced by single, average or complete linkage is a
/// run of consecutive sorted masses, and the closest pair of clusters
/// under any of the three is always a pair of neighbours. That keeps
/// all three linkages at O(n log n):
///
/// - `Single` cuts wherever the gap between consecutive masses exceeds
///   the height.
/// - `Average` and `Complete` merge neighbouring runs greedily, smallest
///   distance first (lowest position on ties), until the smallest
///   remaining distance exceeds the height.
#[derive(Debug, Clone, Copy)]
pub struct HierarchicalClusterer {
    height: f64,
    linkage: Linkage,
    centroid_method: CentroidMethod,
}

impl HierarchicalClusterer {
    pub fn new(height: f64, linkage: Linkage, centroid_method: CentroidMethod) -> Result<Self> {
        if !height.is_finite() || height < 0.0 {
            return Err(ConfigError::InvalidClusterHeight(height).into());
        }
        Ok(Self {
            height,
            linkage,
            centroid_method,
        })
    }

    /// Cluster boundaries as `(start, end)` ranges over the sorted masses.
    pub fn cluster_bounds(&self, sorted: &[f64]) -> Vec<(usize, usize)> {
        debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
        match self.linkage {
            Linkage::Single => gap_cut(sorted, self.height),
            Linkage::Average | Linkage::Complete => {
                agglomerate(sorted, self.height, self.linkage)
            }
        }
    }

    fn representative_mass(&self, members: &[f64]) -> Option<f64> {
        match self.centroid_method {
            CentroidMethod::Mean => mean(members),
            CentroidMethod::Median => median_sorted(members),
        }
    }
}

impl PeakAligner for HierarchicalClusterer {
    fn assign(&self, masses: &[f64]) -> MassAssignment {
        if masses.is_empty() {
            debug!("No masses to cluster");
            return MassAssignment::empty();
        }

        let order = argsort_masses(masses);
        let sorted: Vec<f64> = order.iter().map(|&i| masses[i]).collect();
        let bounds = self.cluster_bounds(&sorted);

        let mut labels = vec![0u32; masses.len()];
        let mut centroids = Vec::with_capacity(bounds.len());
        for (id, &(start, end)) in bounds.iter().enumerate() {
            let members = sorted[start..end].to_vec();
            let mass = self
                .representative_mass(&members)
                .unwrap_or(sorted[start]);
            for &original in &order[start..end] {
                labels[original] = id as u32;
            }
            centroids.push(Centroid {
                id: id as u32,
                mass,
                members,
            });
        }

        let out = MassAssignment { centroids, labels };
        debug_assert!(out.verify(), "HierarchicalClusterer::assign failed at verify");
        info!(
            "Clustered {} masses into {} centroids (h={}, linkage={:?})",
            masses.len(),
            out.num_centroids(),
            self.height,
            self.linkage
        );
        out
    }

    fn background_tolerance(&self) -> f64 {
        self.height
    }

    fn name(&self) -> &'static str {
        "clustering"
    }
}

fn gap_cut(sorted: &[f64], height: f64) -> Vec<(usize, usize)> {
    if sorted.is_empty() {
        return Vec::new();
    }
    let mut bounds = Vec::new();
    let mut start = 0;
    for i in 1..sorted.len() {
        if sorted[i] - sorted[i - 1] > height {
            bounds.push((start, i));
            start = i;
        }
    }
    bounds.push((start, sorted.len()));
    bounds
}

const NO_SEGMENT: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    distance: f64,
    left: usize,
    right: usize,
    left_version: u32,
    right_version: u32,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.left.cmp(&other.left))
    }
}

/// Runs of the sorted mass array, addressed by their start position and
/// chained as a doubly linked list.
struct Segments<'a> {
    sorted: &'a [f64],
    end: Vec<usize>,
    sum: Vec<f64>,
    next: Vec<usize>,
    prev: Vec<usize>,
    alive: Vec<bool>,
    version: Vec<u32>,
}

impl<'a> Segments<'a> {
    fn singletons(sorted: &'a [f64]) -> Self {
        let n = sorted.len();
        Self {
            sorted,
            end: (1..=n).collect(),
            sum: sorted.to_vec(),
            next: (0..n)
                .map(|i| if i + 1 < n { i + 1 } else { NO_SEGMENT })
                .collect(),
            prev: (0..n)
                .map(|i| if i == 0 { NO_SEGMENT } else { i - 1 })
                .collect(),
            alive: vec![true; n],
            version: vec![0; n],
        }
    }

    fn size(&self, seg: usize) -> usize {
        self.end[seg] - seg
    }

    fn distance(&self, left: usize, right: usize, linkage: Linkage) -> f64 {
        match linkage {
            Linkage::Single => self.sorted[right] - self.sorted[self.end[left] - 1],
            Linkage::Complete => self.sorted[self.end[right] - 1] - self.sorted[left],
            // Every member of `right` is >= every member of `left`, so the
            // mean pairwise distance is the difference of the means.
            Linkage::Average => {
                self.sum[right] / self.size(right) as f64 - self.sum[left] / self.size(left) as f64
            }
        }
    }

    fn candidate(&self, left: usize, right: usize, linkage: Linkage) -> MergeCandidate {
        MergeCandidate {
            distance: self.distance(left, right, linkage),
            left,
            right,
            left_version: self.version[left],
            right_version: self.version[right],
        }
    }

    fn is_current(&self, c: &MergeCandidate) -> bool {
        self.alive[c.left]
            && self.alive[c.right]
            && self.next[c.left] == c.right
            && self.version[c.left] == c.left_version
            && self.version[c.right] == c.right_version
    }

    fn merge(&mut self, left: usize, right: usize) {
        self.end[left] = self.end[right];
        self.sum[left] += self.sum[right];
        self.alive[right] = false;
        let after = self.next[right];
        self.next[left] = after;
        if after != NO_SEGMENT {
            self.prev[after] = left;
        }
        self.version[left] += 1;
    }

    fn bounds(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut seg = if self.sorted.is_empty() { NO_SEGMENT } else { 0 };
        while seg != NO_SEGMENT {
            out.push((seg, self.end[seg]));
            seg = self.next[seg];
        }
        out
    }
}

fn agglomerate(sorted: &[f64], height: f64, linkage: Linkage) -> Vec<(usize, usize)> {
    let mut segments = Segments::singletons(sorted);
    let mut heap: BinaryHeap<Reverse<MergeCandidate>> = (1..sorted.len())
        .map(|i| Reverse(segments.candidate(i - 1, i, linkage)))
        .collect();

    let mut num_merges = 0usize;
    while let Some(Reverse(candidate)) = heap.pop() {
        // Merge heights never decrease under average or complete linkage,
        // so the first distance above the cut ends the clustering.
        if candidate.distance > height {
            break;
        }
        if !segments.is_current(&candidate) {
            continue;
        }
        trace!(
            "merging segments {} and {} at {}",
            candidate.left,
            candidate.right,
            candidate.distance
        );
        segments.merge(candidate.left, candidate.right);
        num_merges += 1;

        let left = candidate.left;
        let before = segments.prev[left];
        if before != NO_SEGMENT {
            heap.push(Reverse(segments.candidate(before, left, linkage)));
        }
        let after = segments.next[left];
        if after != NO_SEGMENT {
            heap.push(Reverse(segments.candidate(left, after, linkage)));
        }
    }
    debug!("{:?} linkage performed {} merges", linkage, num_merges);
    segments.bounds()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusterer(h: f64, linkage: Linkage) -> HierarchicalClusterer {
        HierarchicalClusterer::new(h, linkage, CentroidMethod::Mean).unwrap()
    }

    #[test]
    fn test_empty_input_gives_empty_assignment() {
        let out = clusterer(0.01, Linkage::Single).assign(&[]);
        assert!(out.is_empty());
        assert!(out.labels.is_empty());
    }

    #[test]
    fn test_negative_height_is_rejected() {
        assert!(HierarchicalClusterer::new(-0.1, Linkage::Single, CentroidMethod::Mean).is_err());
        assert!(
            HierarchicalClusterer::new(f64::NAN, Linkage::Single, CentroidMethod::Mean).is_err()
        );
    }

    #[test]
    fn test_two_pixel_example() {
        let out = clusterer(0.01, Linkage::Single).assign(&[100.001, 100.002, 500.5]);
        assert_eq!(out.num_centroids(), 2);
        assert!((out.centroids[0].mass - 100.0015).abs() < 1e-9);
        assert_eq!(out.centroids[1].mass, 500.5);
        assert_eq!(out.labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_singleton_is_its_own_centroid() {
        let out = clusterer(0.001, Linkage::Complete).assign(&[250.125]);
        assert_eq!(out.num_centroids(), 1);
        assert_eq!(out.centroids[0].mass, 250.125);
        assert_eq!(out.centroids[0].members, vec![250.125]);
    }

    #[test]
    fn test_labels_follow_input_order() {
        let out = clusterer(0.1, Linkage::Single).assign(&[300.0, 100.0, 300.05, 100.02]);
        assert_eq!(out.labels, vec![1, 0, 1, 0]);
        assert!(out.verify());
    }

    #[test]
    fn test_gap_equal_to_height_joins() {
        // All values exactly representable.
        let out = clusterer(0.5, Linkage::Single).assign(&[1.0, 1.5, 2.25]);
        assert_eq!(out.num_centroids(), 2);
        assert_eq!(out.centroids[0].members, vec![1.0, 1.5]);
    }

    #[test]
    fn test_single_linkage_chains() {
        let out = clusterer(1.0, Linkage::Single).assign(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(out.num_centroids(), 1);
        assert_eq!(out.centroids[0].mass, 1.5);
    }

    #[test]
    fn test_complete_and_average_linkage_break_chains() {
        for linkage in [Linkage::Complete, Linkage::Average] {
            let out = clusterer(1.0, linkage).assign(&[0.0, 1.0, 2.0, 3.0]);
            assert_eq!(out.num_centroids(), 2, "{:?}", linkage);
            assert_eq!(out.centroids[0].members, vec![0.0, 1.0]);
            assert_eq!(out.centroids[1].members, vec![2.0, 3.0]);
            assert_eq!(out.labels, vec![0, 0, 1, 1]);
        }
    }

    #[test]
    fn test_complete_linkage_diameter_within_height() {
        let masses: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64 * 0.37).sin() * 0.05 + i as f64 * 0.003).collect();
        let h = 0.02;
        let out = clusterer(h, Linkage::Complete).assign(&masses);
        for c in &out.centroids {
            assert!(c.spread() <= h + 1e-12, "spread {} > {}", c.spread(), h);
        }
        assert!(out.verify());
    }

    #[test]
    fn test_single_linkage_members_connected() {
        let masses: Vec<f64> = (0..300).map(|i| 200.0 + ((i * 7919) % 1000) as f64 * 0.0013).collect();
        let h = 0.004;
        let out = clusterer(h, Linkage::Single).assign(&masses);
        for c in &out.centroids {
            assert!(c.members.windows(2).all(|w| w[1] - w[0] <= h));
        }
        for w in out.centroids.windows(2) {
            let gap = w[1].members[0] - w[0].members.last().unwrap();
            assert!(gap > h);
        }
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let masses: Vec<f64> = (0..500)
            .map(|i| 150.0 + ((i * 31) % 97) as f64 * 0.001)
            .collect();
        for linkage in [Linkage::Single, Linkage::Average, Linkage::Complete] {
            let a = clusterer(0.0015, linkage).assign(&masses);
            let b = clusterer(0.0015, linkage).assign(&masses);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_median_centroid() {
        let c = HierarchicalClusterer::new(0.1, Linkage::Single, CentroidMethod::Median).unwrap();
        let out = c.assign(&[10.0, 10.01, 10.09]);
        assert_eq!(out.num_centroids(), 1);
        assert_eq!(out.centroids[0].mass, 10.01);
    }

    #[test]
    fn test_zero_height_only_merges_identical_masses() {
        let out = clusterer(0.0, Linkage::Average).assign(&[5.0, 5.0, 5.0001]);
        assert_eq!(out.num_centroids(), 2);
        assert_eq!(out.centroids[0].members, vec![5.0, 5.0]);
    }
}
