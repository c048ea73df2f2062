//! Time-stepping driver
//!
//! [`Simulation`] owns the running state (density, level set, velocity) and
//! advances it one step at a time through a strict pipeline:
//!
//! 1. classify the grid against the level set
//! 2. locate the interface and evaluate normals and curvature
//! 3. set the interface density and the step's admissible density range
//! 4. solve the diffusion-reaction step on the interior
//! 5. evaluate the Stefan speed and extend it over the grid
//! 6. advect the level set
//! 7. reinitialise the level set (every `reinit_every` steps)
//!
//! Each stage consumes the previous stage's output in full. A fatal error is
//! raised before the running state is modified, so the last valid state is
//! always the one held by the driver.

pub mod diagnostics;
pub mod initial;
pub mod snapshot;

pub use diagnostics::{front_position, Diagnostics, FrontSample, SolverWarning};
pub use initial::{InitialCondition, Perturbation, TravellingWaveProfile};
pub use snapshot::{MemorySink, NullSink, OwnedSnapshot, Snapshot, SnapshotSink};

use crate::config::Params;
use crate::error::SimulationError;
use crate::grid::Grid;
use crate::solver::domain::classify;
use crate::solver::field_solver::{step_field, SolveReport};
use crate::solver::geometry::InterfaceGeometry;
use crate::solver::interface_density::assign_interface_density;
use crate::solver::level_set::advect_level_set;
use crate::solver::reinit::reinitialise;
use crate::solver::velocity::{extend_velocity, interface_speed, seed_velocity};
use crate::solver::{FieldData, ProfilerScope};
use tracing::{debug, error, info, warn};

/// Running state carried from one step to the next
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Density `u`
    pub density: FieldData,
    /// Level set `φ` (negative inside the region)
    pub level_set: FieldData,
    /// Extended normal velocity of the last step
    pub velocity: FieldData,
    /// Simulation time
    pub time: f64,
    /// Completed steps
    pub step: usize,
}

/// Summary of one completed step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Completed steps after this one
    pub step: usize,
    /// Simulation time after this step
    pub time: f64,
    /// Interior unknowns solved for
    pub interior_points: usize,
    /// Interface-adjacent points
    pub interface_points: usize,
    /// Field solve outcome
    pub field: SolveReport,
    /// Largest extended speed magnitude
    pub max_speed: f64,
    /// Advective CFL number of this step
    pub cfl: f64,
    /// Front diagnostics after the step
    pub front: Option<FrontSample>,
    /// Wall time of the step
    pub elapsed_ms: f64,
}

/// Result of [`Simulation::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The state advanced by one step
    Advanced(StepReport),
    /// The interior or the interface is empty; nothing was changed
    Exhausted,
}

/// Why a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// All configured steps completed
    Completed,
    /// The front left or filled the domain
    DomainExhausted,
    /// A fatal error stopped the run; the state is the last valid one
    Failed(SimulationError),
}

/// Summary of [`Simulation::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Why the run ended
    pub stop_reason: StopReason,
    /// Completed steps
    pub steps: usize,
    /// Final simulation time
    pub time: f64,
    /// Snapshots handed to the sink
    pub snapshots: usize,
}

/// Porous-Fisher-Stefan moving-boundary simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    params: Params,
    grid: Grid,
    state: SimulationState,
    diagnostics: Diagnostics,
}

impl Simulation {
    /// Create a simulation from an initial condition and interface shape
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] or [`SimulationError::Grid`] if the
    /// parameters are rejected.
    pub fn new(
        params: Params,
        initial: &InitialCondition,
        perturbation: &Perturbation,
    ) -> Result<Self, SimulationError> {
        let grid = params.grid()?;
        let (density, level_set) = initial.build(&grid, &params, perturbation);
        Self::from_fields(params, density, level_set)
    }

    /// Create a simulation from caller-supplied initial fields
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Config`] for invalid parameters and
    /// [`SimulationError::Grid`] if a field does not match the grid.
    pub fn from_fields(
        params: Params,
        density: FieldData,
        level_set: FieldData,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let grid = params.grid()?;
        grid.check_shape("density", density.data.len())?;
        grid.check_shape("level_set", level_set.data.len())?;

        info!(
            "Simulation initialized: {}x{} grid, dx={:.4}, dy={:.4}, dt={}, m={}, κ={}, γ={}",
            grid.nx(),
            grid.ny(),
            grid.dx(),
            grid.dy(),
            params.dt,
            params.exponent,
            params.inverse_stefan,
            params.surface_tension
        );

        let mut diagnostics = Diagnostics::default();
        if let Some((position, amplitude)) = front_position(&grid, level_set.as_slice()) {
            diagnostics.push_sample(FrontSample {
                step: 0,
                time: 0.0,
                position,
                amplitude,
            });
        }

        let velocity = FieldData::new(grid.nx(), grid.ny());
        Ok(Self {
            params,
            grid,
            state: SimulationState {
                density,
                level_set,
                velocity,
                time: 0.0,
                step: 0,
            },
            diagnostics,
        })
    }

    /// Run parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Computational grid
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Current running state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Front samples and solver warnings so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// View of the current state for a sink
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            step: self.state.step,
            time: self.state.time,
            grid: &self.grid,
            density: &self.state.density,
            level_set: &self.state.level_set,
            velocity: &self.state.velocity,
            front: self
                .diagnostics
                .latest()
                .filter(|s| s.step == self.state.step)
                .copied(),
        }
    }

    /// Advance the simulation by one time step
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Geometry`] if the level set is unusable and
    /// [`SimulationError::FieldOutOfBounds`] if the density leaves its
    /// physical range. The running state is unchanged in both cases.
    pub fn step(&mut self) -> Result<StepOutcome, SimulationError> {
        let timer = ProfilerScope::new("step");
        let grid = &self.grid;
        let params = &self.params;
        let state = &mut self.state;

        let classification = {
            let _scope = ProfilerScope::new("classify");
            classify(grid, state.level_set.as_slice())?
        };
        if classification.is_exhausted() {
            info!(
                "Domain exhausted at step {}: {} interior, {} interface points",
                state.step,
                classification.interior().len(),
                classification.interface().len()
            );
            return Ok(StepOutcome::Exhausted);
        }

        let (field, velocity) = {
            let phi = state.level_set.as_slice();

            let mut geometry = {
                let _scope = ProfilerScope::new("geometry");
                InterfaceGeometry::build(grid, phi, &classification)?
            };
            let bounds = assign_interface_density(&mut geometry, params);

            let field = {
                let _scope = ProfilerScope::new("field");
                step_field(
                    grid,
                    params,
                    phi,
                    &mut state.density,
                    &classification,
                    &geometry,
                    bounds,
                )?
            };

            let _scope = ProfilerScope::new("velocity");
            let speeds = interface_speed(
                grid,
                params,
                phi,
                state.density.as_slice(),
                &classification,
                &geometry,
            );
            let (mut velocity, fixed) = seed_velocity(grid, &geometry, &speeds);
            extend_velocity(grid, phi, &mut velocity, &fixed, params.velocity_iterations);
            (field, velocity)
        };

        {
            let _scope = ProfilerScope::new("advect");
            advect_level_set(grid, &mut state.level_set, &velocity, params.dt);
        }
        if (state.step + 1) % params.reinit_every == 0 {
            let _scope = ProfilerScope::new("reinit");
            reinitialise(grid, &mut state.level_set, params.reinit_iterations);
        }

        state.velocity = velocity;
        state.step += 1;
        state.time = state.step as f64 * params.dt;

        if !field.converged {
            warn!(
                "Field solve not converged at step {}: {} sweeps, last update {:.3e}",
                state.step, field.iterations, field.last_update
            );
            self.diagnostics.push_warning(SolverWarning::FieldNotConverged {
                step: state.step,
                iterations: field.iterations,
                last_update: field.last_update,
            });
        }

        let max_speed = state
            .velocity
            .as_slice()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let cfl = params.cfl_number(max_speed);
        if cfl > 1.0 {
            warn!("CFL number {:.3} exceeds 1 at step {}", cfl, state.step);
            self.diagnostics
                .push_warning(SolverWarning::CflExceeded { step: state.step, cfl });
        }

        let front = front_position(grid, state.level_set.as_slice()).map(|(position, amplitude)| {
            FrontSample {
                step: state.step,
                time: state.time,
                position,
                amplitude,
            }
        });
        if let Some(sample) = front {
            self.diagnostics.push_sample(sample);
        }

        let report = StepReport {
            step: state.step,
            time: state.time,
            interior_points: classification.interior().len(),
            interface_points: classification.interface().len(),
            field,
            max_speed,
            cfl,
            front,
            elapsed_ms: timer.elapsed_ms(),
        };
        debug!(
            "Step {}: t={:.4}, front={:?}, field sweeps={}, max|V|={:.4}",
            report.step,
            report.time,
            report.front.map(|f| f.position),
            report.field.iterations,
            report.max_speed
        );
        Ok(StepOutcome::Advanced(report))
    }

    /// Run until `params.steps` steps have completed or the run stops early
    ///
    /// A snapshot is emitted after every `snapshot_every`-th step (never, if
    /// zero) and after the last completed step, including when the run stops
    /// early. No snapshot is emitted if this call completed no step.
    pub fn run(&mut self, sink: &mut dyn SnapshotSink, snapshot_every: usize) -> RunReport {
        info!(
            "Starting run: {} steps from step {}, snapshot every {}",
            self.params.steps, self.state.step, snapshot_every
        );
        let start_step = self.state.step;
        let mut snapshots = 0;
        let mut last_emitted = None;

        let mut stop_reason = loop {
            if self.state.step >= self.params.steps {
                break StopReason::Completed;
            }
            match self.step() {
                Ok(StepOutcome::Advanced(report)) => {
                    let due = snapshot_every > 0 && report.step % snapshot_every == 0;
                    if due {
                        if let Err(e) = sink.emit(&self.snapshot()) {
                            break StopReason::Failed(e.into());
                        }
                        snapshots += 1;
                        last_emitted = Some(report.step);
                    }
                }
                Ok(StepOutcome::Exhausted) => break StopReason::DomainExhausted,
                Err(e) => break StopReason::Failed(e),
            }
        };

        let sink_failed = matches!(stop_reason, StopReason::Failed(SimulationError::Sink(_)));
        if !sink_failed && self.state.step > start_step && last_emitted != Some(self.state.step) {
            match sink.emit(&self.snapshot()) {
                Ok(()) => snapshots += 1,
                Err(e) => stop_reason = StopReason::Failed(e.into()),
            }
        }

        match &stop_reason {
            StopReason::Failed(e) => error!("Run stopped at step {}: {}", self.state.step, e),
            reason => info!(
                "Run finished at step {} (t={:.4}): {:?}",
                self.state.step, self.state.time, reason
            ),
        }

        RunReport {
            stop_reason,
            steps: self.state.step,
            time: self.state.time,
            snapshots,
        }
    }
}
