//! Porous-Fisher-Stefan Simulation Core Library
//!
//! A two-dimensional moving-boundary solver for invasion fronts. A density
//! `u` obeys a nonlinear diffusion-reaction equation inside an evolving
//! region, while the region's boundary moves with a Stefan condition driven
//! by the diffusive flux arriving at it.
//!
//! ## Pipeline
//!
//! The region is the negative set of a level set φ. Every step:
//! - re-derives the interior and interface-adjacent grid points from φ
//! - locates the interface to sub-cell accuracy with its normal and curvature
//! - solves the flux-limited diffusion-reaction step on the interior
//! - evaluates the Stefan speed and extends it off the interface
//! - advects and periodically reinitialises φ
//!
//! ## Example
//!
//! ```rust,no_run
//! use stefan_sim_core::{InitialCondition, NullSink, Params, Perturbation, Simulation};
//!
//! let params = Params::default();
//! let perturbation = Perturbation::from_params(&params);
//! let mut sim = Simulation::new(params, &InitialCondition::Step, &perturbation)?;
//! let report = sim.run(&mut NullSink, 100);
//! println!("{:?} after {} steps", report.stop_reason, report.steps);
//! # Ok::<(), stefan_sim_core::SimulationError>(())
//! ```

// Run configuration and errors
pub mod config;
pub mod error;

// Grid and numerical stages
pub mod grid;
pub mod solver;

// Time-stepping driver, initial conditions and output hand-off
pub mod simulation;

// Re-export core types
pub use config::Params;
pub use error::{ConfigError, GeometryError, GridError, SimulationError, SinkError};
pub use grid::{Axis, Grid, QualityPreset};
pub use solver::FieldData;

// Re-export driver types
pub use simulation::{
    Diagnostics, FrontSample, InitialCondition, MemorySink, NullSink, OwnedSnapshot,
    Perturbation, RunReport, Simulation, SimulationState, Snapshot, SnapshotSink, SolverWarning,
    StepOutcome, StepReport, StopReason, TravellingWaveProfile,
};
