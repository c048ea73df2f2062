//! Run configuration
//!
//! [`Params`] is the single immutable parameter record of a run. It is built
//! once (defaults, JSON file or command-line flags), validated, and then
//! shared read-only by every stage of the solver.

use crate::error::{ConfigError, GridError};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Physical and numerical parameters of a Porous-Fisher-Stefan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Diffusion coefficient `D` multiplying the nonlinear diffusivity `u^m`
    pub diffusion: f64,
    /// Nonlinear diffusion exponent `m` (0 = linear Fisher-KPP)
    pub exponent: f64,
    /// Logistic reaction rate `λ`
    pub reaction_rate: f64,
    /// Inverse Stefan number `κ` (sign selects advancing/receding fronts)
    pub inverse_stefan: f64,
    /// Surface tension coefficient `γ` acting on interface curvature
    pub surface_tension: f64,
    /// Mean initial interface position `L₀`
    pub initial_offset: f64,
    /// Background density `u_f` held at the interface and beyond it
    pub background_density: f64,
    /// Crossing fraction below which an interior point is pinned to the interface density
    pub interface_threshold: f64,
    /// Generalised minmod parameter `θ ∈ [1, 2]`
    pub limiter_theta: f64,
    /// Domain extent along x (`Lx`)
    pub domain_length: f64,
    /// Domain extent along y (`Ly`)
    pub domain_width: f64,
    /// Grid points along x
    pub nx: usize,
    /// Grid points along y
    pub ny: usize,
    /// Time step
    pub dt: f64,
    /// Number of time steps `Nt`
    pub steps: usize,
    /// Velocity extension sweeps per step
    pub velocity_iterations: usize,
    /// Reinitialisation sweeps per invocation
    pub reinit_iterations: usize,
    /// Reinitialise every this many steps
    pub reinit_every: usize,
    /// Max-norm update below which the field solve is converged
    pub field_tolerance: f64,
    /// Sweep budget of the field solve
    pub field_max_iterations: usize,
    /// Initial interface perturbation amplitude `ε`
    pub perturbation_amplitude: f64,
    /// Initial interface perturbation wavenumber `q`
    pub perturbation_wavenumber: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            diffusion: 1.0,
            exponent: 1.0,
            reaction_rate: 1.0,
            inverse_stefan: 0.5,
            surface_tension: 0.0,
            initial_offset: 10.0,
            background_density: 0.1,
            interface_threshold: 0.01,
            limiter_theta: 1.5,
            domain_length: 40.0,
            domain_width: 10.0,
            nx: 201,
            ny: 51,
            dt: 0.01,
            steps: 1000,
            velocity_iterations: 20,
            reinit_iterations: 10,
            reinit_every: 1,
            field_tolerance: 1e-9,
            field_max_iterations: 2000,
            perturbation_amplitude: 0.5,
            // One full period across the default domain width, compatible with
            // the mirror condition on the lateral edges.
            perturbation_wavenumber: std::f64::consts::PI / 5.0,
        }
    }
}

impl Params {
    /// Check every parameter against its admissible range
    ///
    /// A reaction step `λ·dt > 1` is accepted but logged, since the explicit
    /// reaction term can then overshoot the carrying capacity.
    ///
    /// # Errors
    ///
    /// Returns the first offending parameter as [`ConfigError::InvalidParameter`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("diffusion", self.diffusion)?;
        positive("dt", self.dt)?;
        positive("domain_length", self.domain_length)?;
        positive("domain_width", self.domain_width)?;
        positive("field_tolerance", self.field_tolerance)?;
        non_negative("exponent", self.exponent)?;
        non_negative("reaction_rate", self.reaction_rate)?;
        non_negative("surface_tension", self.surface_tension)?;
        non_negative("perturbation_amplitude", self.perturbation_amplitude)?;
        non_negative("perturbation_wavenumber", self.perturbation_wavenumber)?;
        finite("inverse_stefan", self.inverse_stefan)?;
        finite("initial_offset", self.initial_offset)?;
        in_range("limiter_theta", self.limiter_theta, 1.0, 2.0)?;
        in_range("interface_threshold", self.interface_threshold, 0.0, 0.5)?;

        if !(0.0..1.0).contains(&self.background_density) {
            return Err(ConfigError::InvalidParameter {
                name: "background_density",
                message: format!("must lie in [0, 1), got {}", self.background_density),
            });
        }
        if self.nx < 3 || self.ny < 3 {
            return Err(ConfigError::InvalidParameter {
                name: if self.nx < 3 { "nx" } else { "ny" },
                message: format!("need at least 3 points per axis, got {}x{}", self.nx, self.ny),
            });
        }
        if self.reinit_every == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "reinit_every",
                message: "must be at least 1".to_string(),
            });
        }
        if self.field_max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "field_max_iterations",
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=self.domain_length).contains(&self.initial_offset) {
            warn!(
                "initial_offset {} lies outside the domain [0, {}]",
                self.initial_offset, self.domain_length
            );
        }
        if self.reaction_rate * self.dt > 1.0 {
            warn!(
                "reaction_rate * dt = {:.3} > 1: explicit reaction may overshoot u = 1",
                self.reaction_rate * self.dt
            );
        }
        Ok(())
    }

    /// Build the uniform grid described by this configuration
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the extents or point counts are invalid.
    pub fn grid(&self) -> Result<Grid, GridError> {
        Grid::uniform(self.domain_length, self.domain_width, self.nx, self.ny)
    }

    /// Advective CFL number `v_max·dt/min(dx, dy)` for a given peak speed
    pub fn cfl_number(&self, v_max: f64) -> f64 {
        let dx = self.domain_length / (self.nx.max(2) - 1) as f64;
        let dy = self.domain_width / (self.ny.max(2) - 1) as f64;
        v_max.abs() * self.dt / dx.min(dy)
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            message: format!("must be finite, got {value}"),
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::not_positive(name, value))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            message: format!("must be finite and non-negative, got {value}"),
        })
    }
}

fn in_range(name: &'static str, value: f64, lo: f64, hi: f64) -> Result<(), ConfigError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(name, value, lo, hi))
    }
}
