//! Diffusion-reaction field solver
//!
//! Advances the density one backward-Euler step on the interior region:
//!
//! ```text
//! (u* − uⁿ)/dt = ∇·(D (uⁿ)ᵐ ∇u*) + λ uⁿ (1 − uⁿ)
//! ```
//!
//! # Discretisation
//!
//! - Diffusivity is lagged at `uⁿ` and evaluated on faces from a
//!   minmod-limited reconstruction (see [`super::limiter`]).
//! - A stencil arm that crosses the interface is shortened to `θ·h` and ends
//!   at the interface density (Shortley-Weller weights). Points whose
//!   crossing fraction falls below `interface_threshold` are pinned to the
//!   interface density instead, avoiding the `1/θ` blow-up.
//! - The left column holds the far-field density `1`, the right column the
//!   background density; bottom and top rows are zero-flux mirrors.
//!
//! Only interior points are unknowns. The reduced matrix is strictly
//! diagonally dominant with positive diagonal and non-positive off-diagonal
//! entries, so Jacobi converges and every iterate is a convex combination of
//! the data. That keeps the density inside `[min boundary value, 1]` even
//! when the sweep budget runs out.

use super::domain::{is_inside, Classification};
use super::fields::FieldData;
use super::geometry::{Direction, InterfaceGeometry};
use super::interface_density::FieldBounds;
use super::limiter::{diffusivity, face_diffusivity};
use crate::config::Params;
use crate::error::SimulationError;
use crate::grid::Grid;
use rayon::prelude::*;

/// Density held on the left (far-field) column
pub const FAR_FIELD_DENSITY: f64 = 1.0;

/// Slack allowed on the physical density bounds after a solve
pub const BOUND_TOLERANCE: f64 = 1e-9;

/// Sparse linear system over the interior unknowns, stored row-compressed
///
/// Row `k` reads `diagonal[k]·u_k − Σ weight·u_column = rhs[k]`.
#[derive(Debug, Clone, Default)]
pub struct ReducedSystem {
    /// Diagonal coefficient per row
    pub diagonal: Vec<f64>,
    /// Right-hand side per row (absorbs Dirichlet and interface values)
    pub rhs: Vec<f64>,
    /// Start of each row's off-diagonal entries, plus one trailing end entry
    pub offsets: Vec<usize>,
    /// Unknown number of each off-diagonal entry
    pub columns: Vec<usize>,
    /// Positive coupling weight of each off-diagonal entry
    pub weights: Vec<f64>,
}

impl ReducedSystem {
    /// Number of unknowns
    pub fn len(&self) -> usize {
        self.diagonal.len()
    }

    /// True if there are no unknowns
    pub fn is_empty(&self) -> bool {
        self.diagonal.is_empty()
    }

    /// Off-diagonal entries of row `k`
    #[inline]
    pub fn row(&self, k: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[k]..self.offsets[k + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// Close the current row; its off-diagonal entries were pushed already
    fn push_row(&mut self, diagonal: f64, rhs: f64) {
        self.diagonal.push(diagonal);
        self.rhs.push(rhs);
        self.offsets.push(self.columns.len());
    }

    /// Max-norm residual `‖b − A x‖∞`
    pub fn residual(&self, x: &[f64]) -> f64 {
        (0..self.len())
            .into_par_iter()
            .map(|k| {
                let off: f64 = self.row(k).map(|(c, w)| w * x[c]).sum();
                (self.rhs[k] - self.diagonal[k] * x[k] + off).abs()
            })
            .reduce(|| 0.0, f64::max)
    }
}

/// Outcome of an iterative field solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Sweeps performed
    pub iterations: usize,
    /// Max-norm change of the last sweep
    pub last_update: f64,
    /// True if `last_update` fell below the tolerance
    pub converged: bool,
}

/// Density value usable as stencil data at `(i, j)`, if any
///
/// Mirror rows resolve to the adjacent interior row; points outside the
/// region carry no usable value.
pub(crate) fn known_density(
    grid: &Grid,
    params: &Params,
    phi: &[f64],
    u: &[f64],
    classification: &Classification,
    i: isize,
    j: isize,
) -> Option<f64> {
    let nx = grid.nx() as isize;
    let ny = grid.ny() as isize;
    if i < 0 || i >= nx || j < 0 || j >= ny {
        return None;
    }
    let j = j.clamp(1, ny - 2) as usize;
    let i = i as usize;
    let idx = grid.idx(i, j);
    if !is_inside(phi[idx]) {
        return None;
    }
    if i == 0 {
        Some(FAR_FIELD_DENSITY)
    } else if i + 1 == grid.nx() {
        Some(params.background_density)
    } else {
        classification.unknown(idx).map(|_| u[idx])
    }
}

/// Assemble the reduced backward-Euler system for the current interior set
pub fn build_system(
    grid: &Grid,
    params: &Params,
    phi: &[f64],
    u: &[f64],
    classification: &Classification,
    geometry: &InterfaceGeometry,
) -> ReducedSystem {
    let mut system = ReducedSystem::default();
    let n = classification.interior().len();
    system.diagonal.reserve(n);
    system.rhs.reserve(n);
    system.offsets.reserve(n + 1);
    system.offsets.push(0);

    let nx = grid.nx();
    let ny = grid.ny();
    let coeff = params.dt * params.diffusion;
    let m = params.exponent;

    for &idx in classification.interior() {
        let (i, j) = grid.ij(idx);
        let u0 = u[idx];

        // Pin points sitting (almost) on the interface
        let nearest = Direction::ALL
            .iter()
            .filter_map(|&d| geometry.crossing(idx, d))
            .min_by(|a, b| a.theta.total_cmp(&b.theta));
        if let Some(crossing) = nearest {
            if crossing.theta < params.interface_threshold {
                system.push_row(1.0, crossing.density);
                continue;
            }
        }

        let reaction = params.dt * params.reaction_rate * u0 * (1.0 - u0);
        let mut diagonal = 1.0;
        let mut rhs = u0 + reaction;

        for (minus, plus) in [
            (Direction::West, Direction::East),
            (Direction::South, Direction::North),
        ] {
            let h = grid.spacing(minus.axis());
            let arm_length = |d: Direction| geometry.crossing(idx, d).map_or(h, |c| c.distance(grid));
            let (h_minus, h_plus) = (arm_length(minus), arm_length(plus));

            for d in [minus, plus] {
                let h_d = if d == minus { h_minus } else { h_plus };
                let scale = 2.0 * coeff / (h_d * (h_minus + h_plus));

                if let Some(crossing) = geometry.crossing(idx, d) {
                    let face = 0.5 * (diffusivity(u0, m) + diffusivity(crossing.density, m));
                    let w = scale * face;
                    diagonal += w;
                    rhs += w * crossing.density;
                    continue;
                }

                let q = d.step(grid, idx);
                let (qi, qj) = grid.ij(q);
                let (si, sj) = d.offset();

                let outer_p = known_density(
                    grid,
                    params,
                    phi,
                    u,
                    classification,
                    i as isize - si,
                    j as isize - sj,
                );

                // Zero-flux mirror: the ghost row is this row, so the arm couples
                // the unknown to itself and the row matches an interior one
                if qj == 0 || qj + 1 == ny {
                    if let Some(col) = classification.unknown(idx) {
                        let face =
                            face_diffusivity(params.limiter_theta, m, outer_p, u0, u0, Some(u0));
                        let w = scale * face;
                        diagonal += w;
                        system.columns.push(col);
                        system.weights.push(w);
                    }
                    continue;
                }

                let outer_q = known_density(
                    grid,
                    params,
                    phi,
                    u,
                    classification,
                    qi as isize + si,
                    qj as isize + sj,
                );

                if qi == 0 || qi + 1 == nx {
                    let value = if qi == 0 {
                        FAR_FIELD_DENSITY
                    } else {
                        params.background_density
                    };
                    let face = face_diffusivity(params.limiter_theta, m, outer_p, u0, value, outer_q);
                    let w = scale * face;
                    diagonal += w;
                    rhs += w * value;
                } else if let Some(col) = classification.unknown(q) {
                    let face = face_diffusivity(params.limiter_theta, m, outer_p, u0, u[q], outer_q);
                    let w = scale * face;
                    diagonal += w;
                    system.columns.push(col);
                    system.weights.push(w);
                }
            }
        }

        system.push_row(diagonal, rhs);
    }
    system
}

/// Double-buffered Jacobi iteration
///
/// Sweeps until the max-norm update drops below `tolerance` or the budget
/// is spent; the last iterate is returned either way.
pub fn solve_jacobi(
    system: &ReducedSystem,
    initial: Vec<f64>,
    tolerance: f64,
    max_iterations: usize,
) -> (Vec<f64>, SolveReport) {
    let mut current = initial;
    let mut next = vec![0.0; current.len()];
    let mut report = SolveReport {
        iterations: 0,
        last_update: f64::INFINITY,
        converged: system.is_empty(),
    };
    if system.is_empty() {
        report.last_update = 0.0;
        return (current, report);
    }

    while report.iterations < max_iterations {
        next.par_iter_mut()
            .with_min_len(256)
            .enumerate()
            .for_each(|(k, out)| {
                let off: f64 = system.row(k).map(|(c, w)| w * current[c]).sum();
                *out = (system.rhs[k] + off) / system.diagonal[k];
            });

        let update = current
            .par_iter()
            .zip(next.par_iter())
            .map(|(a, b)| (a - b).abs())
            .reduce(|| 0.0, f64::max);

        std::mem::swap(&mut current, &mut next);
        report.iterations += 1;
        report.last_update = update;
        if update < tolerance {
            report.converged = true;
            break;
        }
    }
    (current, report)
}

/// Hold the Dirichlet columns at their fixed values
pub fn enforce_dirichlet_columns(u: &mut FieldData, params: &Params) {
    let width = u.width;
    for row in u.data.chunks_exact_mut(width) {
        row[0] = FAR_FIELD_DENSITY;
        row[width - 1] = params.background_density;
    }
}

/// Advance the density one step on the current interior set
///
/// Points outside the interior are left untouched apart from the mirror
/// rows, which follow their adjacent row.
///
/// # Errors
///
/// Returns [`SimulationError::FieldOutOfBounds`] if any interior density
/// leaves `bounds` after the solve.
pub fn step_field(
    grid: &Grid,
    params: &Params,
    phi: &[f64],
    u: &mut FieldData,
    classification: &Classification,
    geometry: &InterfaceGeometry,
    bounds: FieldBounds,
) -> Result<SolveReport, SimulationError> {
    let system = build_system(grid, params, phi, u.as_slice(), classification, geometry);
    let initial: Vec<f64> = classification
        .interior()
        .iter()
        .map(|&idx| u.data[idx])
        .collect();

    let (solution, report) = solve_jacobi(
        &system,
        initial,
        params.field_tolerance,
        params.field_max_iterations,
    );

    for (&idx, &value) in classification.interior().iter().zip(&solution) {
        if !bounds.contains(value, BOUND_TOLERANCE) || !value.is_finite() {
            return Err(SimulationError::FieldOutOfBounds {
                index: idx,
                value,
                lower: bounds.lower,
                upper: bounds.upper,
            });
        }
    }
    for (&idx, &value) in classification.interior().iter().zip(&solution) {
        u.data[idx] = value;
    }
    u.mirror_edge_rows();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::domain::classify;
    use crate::solver::interface_density::assign_interface_density;
    use approx::assert_relative_eq;

    struct Setup {
        grid: Grid,
        params: Params,
        phi: Vec<f64>,
        u: FieldData,
    }

    fn planar_setup(front: f64, params: Params) -> Setup {
        let grid = params.grid().unwrap();
        let phi: Vec<f64> = (0..grid.len())
            .map(|idx| grid.x()[grid.ij(idx).0] - front)
            .collect();
        let uf = params.background_density;
        let mut u = FieldData::from_fn(&grid, |x, _| if x < front { 1.0 } else { uf });
        enforce_dirichlet_columns(&mut u, &params);
        Setup {
            grid,
            params,
            phi,
            u,
        }
    }

    fn small_params() -> Params {
        Params {
            domain_length: 10.0,
            domain_width: 2.0,
            nx: 51,
            ny: 11,
            dt: 0.01,
            ..Params::default()
        }
    }

    #[test]
    fn test_system_is_diagonally_dominant() {
        let s = planar_setup(5.03, small_params());
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        assign_interface_density(&mut geom, &s.params);
        let system = build_system(&s.grid, &s.params, &s.phi, s.u.as_slice(), &c, &geom);

        assert_eq!(system.len(), c.interior().len());
        for k in 0..system.len() {
            let off: f64 = system.row(k).map(|(_, w)| w).sum();
            assert!(system.row(k).all(|(_, w)| w > 0.0));
            assert!(system.diagonal[k] >= 1.0 + off - 1e-12);
        }
    }

    #[test]
    fn test_far_field_influence_decays() {
        // Flat state at the background density: only the far-field column injects mass
        let params = Params {
            background_density: 0.5,
            reaction_rate: 0.0,
            ..small_params()
        };
        let mut s = planar_setup(5.03, params);
        s.u.fill(0.5);
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        let bounds = assign_interface_density(&mut geom, &s.params);

        let system = build_system(&s.grid, &s.params, &s.phi, s.u.as_slice(), &c, &geom);
        let (x, report) = solve_jacobi(&system, vec![0.5; system.len()], 1e-12, 10_000);
        assert!(report.converged);
        for (&idx, &v) in c.interior().iter().zip(&x) {
            assert!(bounds.contains(v, 1e-9));
            let (i, _) = s.grid.ij(idx);
            if i > 10 {
                assert_relative_eq!(v, 0.5, epsilon = 1e-6);
            }
        }
        let near_edge = c.unknown(s.grid.idx(1, 5)).unwrap();
        assert!(x[near_edge] > 0.5);
    }

    #[test]
    fn test_step_keeps_density_in_bounds() {
        let params = Params {
            exponent: 1.0,
            reaction_rate: 1.0,
            ..small_params()
        };
        let mut s = planar_setup(4.97, params);
        for _ in 0..20 {
            let c = classify(&s.grid, &s.phi).unwrap();
            let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
            let bounds = assign_interface_density(&mut geom, &s.params);
            let report =
                step_field(&s.grid, &s.params, &s.phi, &mut s.u, &c, &geom, bounds).unwrap();
            assert!(report.converged);
            for &idx in c.interior() {
                let v = s.u.data[idx];
                assert!(v >= s.params.background_density - 1e-9 && v <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_solution_satisfies_system() {
        let s = planar_setup(5.03, small_params());
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        assign_interface_density(&mut geom, &s.params);
        let system = build_system(&s.grid, &s.params, &s.phi, s.u.as_slice(), &c, &geom);
        let initial: Vec<f64> = c.interior().iter().map(|&i| s.u.data[i]).collect();
        let (x, report) = solve_jacobi(&system, initial, 1e-13, 10_000);
        assert!(report.converged);
        assert!(system.residual(&x) < 1e-10);
    }

    #[test]
    fn test_points_outside_are_untouched() {
        let mut s = planar_setup(5.03, small_params());
        // Mark an outside point with a sentinel in the admissible range
        let outside = s.grid.idx(40, 5);
        s.u.data[outside] = 0.77;
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        let bounds = assign_interface_density(&mut geom, &s.params);
        step_field(&s.grid, &s.params, &s.phi, &mut s.u, &c, &geom, bounds).unwrap();
        assert_eq!(s.u.data[outside], 0.77);
    }

    #[test]
    fn test_point_near_interface_is_pinned() {
        // Front 0.001 cells past the column at x = 5.0
        let params = small_params();
        let s = planar_setup(5.0002, params);
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        assign_interface_density(&mut geom, &s.params);
        let system = build_system(&s.grid, &s.params, &s.phi, s.u.as_slice(), &c, &geom);

        let pinned = s.grid.idx(25, 5);
        let k = c.unknown(pinned).unwrap();
        assert_eq!(system.diagonal[k], 1.0);
        assert_eq!(system.row(k).count(), 0);
        assert_eq!(system.rhs[k], s.params.background_density);
    }

    #[test]
    fn test_out_of_bounds_is_fatal() {
        let mut s = planar_setup(5.03, small_params());
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        assign_interface_density(&mut geom, &s.params);
        // Claim an impossible upper bound so the unit plateau violates it
        let bounds = FieldBounds {
            lower: 0.1,
            upper: 0.5,
        };
        let err = step_field(&s.grid, &s.params, &s.phi, &mut s.u, &c, &geom, bounds).unwrap_err();
        assert!(matches!(err, SimulationError::FieldOutOfBounds { .. }));
    }

    #[test]
    fn test_jacobi_reports_non_convergence() {
        let s = planar_setup(5.03, small_params());
        let c = classify(&s.grid, &s.phi).unwrap();
        let mut geom = InterfaceGeometry::build(&s.grid, &s.phi, &c).unwrap();
        assign_interface_density(&mut geom, &s.params);
        let system = build_system(&s.grid, &s.params, &s.phi, s.u.as_slice(), &c, &geom);
        let (_, report) = solve_jacobi(&system, vec![0.0; system.len()], 1e-14, 2);
        assert_eq!(report.iterations, 2);
        assert!(!report.converged);
    }
}
