//! Grid and resolution modules

pub mod quality;
pub mod uniform_grid;

// Re-export main types
pub use quality::QualityPreset;
pub use uniform_grid::{Axis, Grid};
