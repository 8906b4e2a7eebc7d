pub mod display;
pub mod math;
pub mod offsets;
pub mod sorting;
