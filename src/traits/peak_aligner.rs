use crate::models::centroid::MassAssignment;

/// Turns the global array of observed masses into a shared feature panel.
///
/// Implementations must be deterministic: the same input slice always
/// yields the same centroids and labels. The label of every input mass
/// is what the matcher uses later, so no implementation should expect a
/// second nearest-neighbour lookup to agree with it.
pub trait PeakAligner: Send + Sync {
    fn assign(&self, masses: &[f64]) -> MassAssignment;

    /// Distance within which a background mass claims a centroid.
    fn background_tolerance(&self) -> f64;

    fn name(&self) -> &'static str;
}
