pub mod aggregator;
pub mod metadata_matcher;
pub mod peak_aligner;
