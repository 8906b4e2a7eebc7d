pub mod binning;
pub mod clusterer;
pub mod extractor;
pub mod filters;
pub mod matcher;
pub mod matrix_builder;
pub mod merger;
pub mod normalizer;
pub mod pipeline;
