//! Initial conditions
//!
//! The initial interface is the graph `x = L(y)` with `L(y) = L₀ + δ(y)`.
//! The level set is `φ = x − L(y)`, which is a signed distance for a flat
//! front and close to one for gentle perturbations.
//!
//! Perturbations are built from cosines `cos(kπy/Ly)` so they meet the
//! zero-flux condition on the lateral edges.

use crate::config::Params;
use crate::error::ConfigError;
use crate::grid::Grid;
use crate::solver::field_solver::enforce_dirichlet_columns;
use crate::solver::FieldData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of the initial interface around `L₀`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Perturbation {
    /// Flat front
    None,
    /// `ε cos(q y)`
    Cosine {
        /// ε
        amplitude: f64,
        /// q
        wavenumber: f64,
    },
    /// Seeded sum of the first `modes` lateral cosine modes, scaled to peak `amplitude`
    RandomModes {
        /// Peak displacement
        amplitude: f64,
        /// Number of lateral modes
        modes: usize,
        /// RNG seed for the mode weights
        seed: u64,
    },
}

impl Perturbation {
    /// Cosine perturbation from the run parameters
    pub fn from_params(params: &Params) -> Self {
        Perturbation::Cosine {
            amplitude: params.perturbation_amplitude,
            wavenumber: params.perturbation_wavenumber,
        }
    }

    /// Interface offset `δ(y)` at every row of `grid`
    pub fn offsets(&self, grid: &Grid) -> Vec<f64> {
        match *self {
            Perturbation::None => vec![0.0; grid.ny()],
            Perturbation::Cosine {
                amplitude,
                wavenumber,
            } => grid
                .y()
                .iter()
                .map(|&y| amplitude * (wavenumber * y).cos())
                .collect(),
            Perturbation::RandomModes {
                amplitude,
                modes,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(seed);
                let weights: Vec<f64> = (0..modes).map(|_| rng.random_range(-1.0..=1.0)).collect();
                let norm: f64 = weights.iter().map(|w: &f64| w.abs()).sum();
                if norm == 0.0 {
                    return vec![0.0; grid.ny()];
                }
                let base = std::f64::consts::PI / (grid.y()[grid.ny() - 1] - grid.y()[0]);
                grid.y()
                    .iter()
                    .map(|&y| {
                        let s: f64 = weights
                            .iter()
                            .enumerate()
                            .map(|(k, w)| w * ((k + 1) as f64 * base * (y - grid.y()[0])).cos())
                            .sum();
                        amplitude * s / norm
                    })
                    .collect()
            }
        }
    }
}

/// Sampled one-dimensional travelling-wave density `u(z)` behind the front
///
/// `z` is the signed distance `x − L(y)`, so samples live at `z ≤ 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravellingWaveProfile {
    z: Vec<f64>,
    u: Vec<f64>,
}

impl TravellingWaveProfile {
    /// Build a profile from `(z, u)` samples
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] unless there are at least two
    /// samples, `z` is strictly increasing and non-positive, and every `u`
    /// lies in `[0, 1]`.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidParameter {
            name: "profile",
            message,
        };
        if pairs.len() < 2 {
            return Err(invalid(format!("need at least 2 samples, got {}", pairs.len())));
        }
        for (k, pair) in pairs.windows(2).enumerate() {
            if pair[1].0.is_nan() || pair[0].0.is_nan() || pair[1].0 <= pair[0].0 {
                return Err(invalid(format!("z must be strictly increasing at sample {}", k + 1)));
            }
        }
        if let Some(&(z, _)) = pairs.last() {
            if z > 0.0 {
                return Err(invalid(format!("samples must lie behind the front (z <= 0), got {z}")));
            }
        }
        if let Some(&(_, u)) = pairs.iter().find(|(_, u)| !(0.0..=1.0).contains(u)) {
            return Err(invalid(format!("density must lie in [0, 1], got {u}")));
        }
        Ok(Self {
            z: pairs.iter().map(|p| p.0).collect(),
            u: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Linearly interpolated density at `z`, clamped to the end samples
    pub fn sample(&self, z: f64) -> f64 {
        let last = self.z.len() - 1;
        if z <= self.z[0] {
            return self.u[0];
        }
        if z >= self.z[last] {
            return self.u[last];
        }
        let k = self.z.partition_point(|&s| s <= z).saturating_sub(1).min(last - 1);
        let t = (z - self.z[k]) / (self.z[k + 1] - self.z[k]);
        self.u[k] + t * (self.u[k + 1] - self.u[k])
    }
}

/// Initial density inside the region
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    /// `u = 1` inside, background outside
    Step,
    /// Travelling-wave profile mapped onto `z = x − L(y)`
    Profile(TravellingWaveProfile),
}

impl InitialCondition {
    /// Build the initial `(density, level set)` pair
    pub fn build(
        &self,
        grid: &Grid,
        params: &Params,
        perturbation: &Perturbation,
    ) -> (FieldData, FieldData) {
        let offsets = perturbation.offsets(grid);
        let nx = grid.nx();
        let mut phi = FieldData::new(nx, grid.ny());
        for (j, row) in phi.data.chunks_exact_mut(nx).enumerate() {
            let front = params.initial_offset + offsets[j];
            for (value, &x) in row.iter_mut().zip(grid.x()) {
                *value = x - front;
            }
        }
        phi.mirror_edge_rows();

        let uf = params.background_density;
        let mut density = FieldData::with_value(nx, grid.ny(), uf);
        for (u, &z) in density.data.iter_mut().zip(&phi.data) {
            if z < 0.0 {
                *u = match self {
                    InitialCondition::Step => 1.0,
                    InitialCondition::Profile(profile) => profile.sample(z).max(uf),
                };
            }
        }
        enforce_dirichlet_columns(&mut density, params);
        (density, phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_params() -> Params {
        Params {
            domain_length: 10.0,
            domain_width: 2.0,
            nx: 51,
            ny: 11,
            initial_offset: 4.0,
            background_density: 0.1,
            ..Params::default()
        }
    }

    #[test]
    fn test_step_condition() {
        let params = small_params();
        let grid = params.grid().unwrap();
        let (u, phi) = InitialCondition::Step.build(&grid, &params, &Perturbation::None);
        for j in 0..grid.ny() {
            for i in 1..grid.nx() - 1 {
                let expected = if grid.x()[i] < 4.0 { 1.0 } else { 0.1 };
                assert_eq!(u.get(i, j), expected);
                assert_relative_eq!(phi.get(i, j), grid.x()[i] - 4.0, epsilon = 1e-12);
            }
            assert_eq!(u.get(0, j), 1.0);
            assert_eq!(u.get(grid.nx() - 1, j), 0.1);
        }
    }

    #[test]
    fn test_cosine_front_and_mirrored_rows() {
        let params = Params {
            domain_width: 10.0,
            ny: 21,
            ..small_params()
        };
        let grid = params.grid().unwrap();
        let perturbation = Perturbation::Cosine {
            amplitude: 0.5,
            wavenumber: std::f64::consts::PI / 5.0,
        };
        let (_, phi) = InitialCondition::Step.build(&grid, &params, &perturbation);
        let last = grid.ny() - 1;
        for i in 0..grid.nx() {
            assert_eq!(phi.get(i, 0), phi.get(i, 1));
            assert_eq!(phi.get(i, last), phi.get(i, last - 1));
        }
        // Middle row sits at L₀ + ε cos(π) = L₀ − ε
        assert_relative_eq!(phi.get(20, 10), grid.x()[20] - 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_random_modes_are_seeded_and_bounded() {
        let params = small_params();
        let grid = params.grid().unwrap();
        let perturbation = Perturbation::RandomModes {
            amplitude: 0.3,
            modes: 4,
            seed: 7,
        };
        let a = perturbation.offsets(&grid);
        let b = perturbation.offsets(&grid);
        assert_eq!(a, b);
        assert!(a.iter().all(|d| d.abs() <= 0.3 + 1e-12));
        assert!(a.iter().any(|d| d.abs() > 0.0));
    }

    #[test]
    fn test_profile_interpolation() {
        let profile = TravellingWaveProfile::from_pairs(&[(-2.0, 1.0), (-1.0, 0.6), (0.0, 0.2)]).unwrap();
        assert_eq!(profile.sample(-5.0), 1.0);
        assert_relative_eq!(profile.sample(-1.5), 0.8);
        assert_relative_eq!(profile.sample(-0.5), 0.4);
        assert_eq!(profile.sample(0.0), 0.2);
    }

    #[test]
    fn test_profile_validation() {
        assert!(TravellingWaveProfile::from_pairs(&[(-1.0, 1.0)]).is_err());
        assert!(TravellingWaveProfile::from_pairs(&[(-1.0, 1.0), (-1.0, 0.5)]).is_err());
        assert!(TravellingWaveProfile::from_pairs(&[(-1.0, 1.0), (0.5, 0.5)]).is_err());
        assert!(TravellingWaveProfile::from_pairs(&[(-1.0, 1.2), (0.0, 0.5)]).is_err());
    }

    #[test]
    fn test_profile_condition_respects_background() {
        let params = small_params();
        let grid = params.grid().unwrap();
        let profile = TravellingWaveProfile::from_pairs(&[(-4.0, 1.0), (0.0, 0.0)]).unwrap();
        let (u, _) = InitialCondition::Profile(profile).build(&grid, &params, &Perturbation::None);
        assert!(u.as_slice().iter().all(|&v| (0.1..=1.0).contains(&v)));
        // Halfway behind the front: z = -2
        assert_relative_eq!(u.get(10, 5), 0.5, epsilon = 1e-12);
    }
}
