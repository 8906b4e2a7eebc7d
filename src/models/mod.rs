pub mod aligned_matrix;
pub mod centroid;
pub mod compiled_matrix;
pub mod dataset;
pub mod metadata;
pub mod peak;
