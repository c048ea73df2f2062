//! Moving-boundary solver stages
//!
//! Each stage is a set of free functions over explicit grid data. The
//! driver in [`crate::simulation`] calls them in pipeline order once per
//! step:
//!
//! - [`domain`]: interior / interface classification
//! - [`geometry`]: sub-cell crossings, normals and curvature
//! - [`interface_density`]: boundary density on the interface
//! - [`field_solver`] and [`limiter`]: diffusion-reaction step
//! - [`velocity`]: Stefan speed and its extension off the interface
//! - [`level_set`]: upwind advection of φ
//! - [`reinit`]: signed-distance reinitialisation
//!
//! Every sweep over the grid is double-buffered and runs rows in parallel
//! with rayon.

pub mod domain;
pub mod field_solver;
pub(crate) mod fields;
pub mod geometry;
pub mod interface_density;
pub mod level_set;
pub mod limiter;
pub mod profiler;
pub mod reinit;
pub mod velocity;

// Re-exports
pub use domain::{classify, Classification};
pub use field_solver::{SolveReport, BOUND_TOLERANCE, FAR_FIELD_DENSITY};
pub use fields::FieldData;
pub use geometry::{Crossing, Direction, InterfaceGeometry, InterfacePoint};
pub use interface_density::FieldBounds;
pub use profiler::ProfilerScope;
