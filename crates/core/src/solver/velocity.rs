//! Interface speed and velocity extension
//!
//! # Stefan condition
//!
//! The normal speed of the interface is set by the diffusive flux arriving
//! at it:
//!
//! ```text
//! V_n = −κ D ∂Φ/∂n,    Φ = u^(m+1)/(m+1)
//! ```
//!
//! `∂Φ/∂n` is evaluated at every interface-adjacent point from one-sided
//! differences that end on the interface itself (distance `θ·h`, value
//! `Φ(u_I)`), so the estimate only uses data from inside the region.
//!
//! # Extension
//!
//! Advection needs a speed everywhere, not only on the contour. The interface
//! values are held fixed while
//!
//! ```text
//! ∂V/∂τ + S(φ) n·∇V = 0
//! ```
//!
//! is swept a fixed number of times, carrying them outward along the normals
//! on both sides of the interface. Points further from the interface than
//! the sweeps reach keep their last iterated value.

use super::domain::{is_inside, Classification};
use super::field_solver::known_density;
use super::fields::{mirror_edge_rows, FieldData};
use super::geometry::{normal_field, Crossing, Direction, InterfaceGeometry};
use super::limiter::transformed_density;
use crate::config::Params;
use crate::grid::Grid;
use nalgebra::Vector2;
use rayon::prelude::*;

/// Derivative of `Φ` along the positive axis from a crossing
///
/// A crossing closer than `interface_threshold` belongs to a pinned point
/// whose density already equals the interface value, so the difference is
/// taken from the point behind it instead.
#[inline]
fn crossing_derivative(
    grid: &Grid,
    params: &Params,
    phi: &[f64],
    u: &[f64],
    classification: &Classification,
    crossing: &Crossing,
) -> f64 {
    let m = params.exponent;
    let sign = crossing.direction.sign();
    let phi_interface = transformed_density(crossing.density, m);

    if crossing.theta < params.interface_threshold {
        let (i, j) = grid.ij(crossing.inside);
        let (di, dj) = crossing.direction.offset();
        let behind = known_density(
            grid,
            params,
            phi,
            u,
            classification,
            i as isize - di,
            j as isize - dj,
        );
        if let Some(value) = behind {
            let h = grid.spacing(crossing.direction.axis());
            return sign * (phi_interface - transformed_density(value, m))
                / (h + crossing.distance(grid));
        }
    }

    let phi_inside = transformed_density(u[crossing.inside], m);
    sign * (phi_interface - phi_inside) / crossing.distance(grid)
}

/// Pick the crossing on this axis that faces along the normal component
fn facing<'a>(
    candidates: [Option<&'a Crossing>; 2],
    normal_component: f64,
) -> Option<&'a Crossing> {
    match candidates {
        [Some(a), Some(b)] => {
            if (a.direction.sign() > 0.0) == (normal_component > 0.0) {
                Some(a)
            } else {
                Some(b)
            }
        }
        [a, b] => a.or(b),
    }
}

/// Stefan speed at every interface point, aligned with `geometry.points`
pub fn interface_speed(
    grid: &Grid,
    params: &Params,
    phi: &[f64],
    u: &[f64],
    classification: &Classification,
    geometry: &InterfaceGeometry,
) -> Vec<f64> {
    let m = params.exponent;
    geometry
        .points
        .iter()
        .map(|point| {
            let idx = point.index;
            let (i, j) = grid.ij(idx);
            let inside = is_inside(phi[idx]);
            let mut gradient = Vector2::zeros();

            for (axis_slot, (minus, plus)) in [
                (Direction::West, Direction::East),
                (Direction::South, Direction::North),
            ]
            .into_iter()
            .enumerate()
            {
                let candidates = if inside {
                    [geometry.crossing(idx, minus), geometry.crossing(idx, plus)]
                } else {
                    [
                        geometry.crossing(minus.step(grid, idx), plus),
                        geometry.crossing(plus.step(grid, idx), minus),
                    ]
                };

                let facing_crossing = facing(candidates, point.normal[axis_slot]);
                gradient[axis_slot] = if let Some(crossing) = facing_crossing {
                    crossing_derivative(grid, params, phi, u, classification, crossing)
                } else if inside {
                    // No crossing on this axis: difference over usable neighbours
                    let (di, dj) = plus.offset();
                    let h = grid.spacing(plus.axis());
                    let value = |s: isize| {
                        known_density(
                            grid,
                            params,
                            phi,
                            u,
                            classification,
                            i as isize + s * di,
                            j as isize + s * dj,
                        )
                        .map(|v| transformed_density(v, m))
                    };
                    let centre = transformed_density(u[idx], m);
                    match (value(-1), value(1)) {
                        (Some(a), Some(b)) => (b - a) / (2.0 * h),
                        (Some(a), None) => (centre - a) / h,
                        (None, Some(b)) => (b - centre) / h,
                        (None, None) => 0.0,
                    }
                } else {
                    0.0
                };
            }

            -params.inverse_stefan * params.diffusion * gradient.dot(&point.normal)
        })
        .collect()
}

/// Velocity field seeded with the interface speeds, plus the mask of seeded points
pub fn seed_velocity(
    grid: &Grid,
    geometry: &InterfaceGeometry,
    speeds: &[f64],
) -> (FieldData, Vec<bool>) {
    let mut velocity = FieldData::new(grid.nx(), grid.ny());
    let mut fixed = vec![false; grid.len()];
    for (point, &speed) in geometry.points.iter().zip(speeds) {
        velocity.data[point.index] = speed;
        fixed[point.index] = true;
    }
    apply_velocity_edges(&mut velocity.data, grid.nx(), grid.ny());
    (velocity, fixed)
}

/// Zero-gradient condition on all four edges
fn apply_velocity_edges(data: &mut [f64], width: usize, height: usize) {
    for row in data.chunks_exact_mut(width) {
        row[0] = row[1];
        row[width - 1] = row[width - 2];
    }
    mirror_edge_rows(data, width, height);
}

/// Extend the seeded velocity over the grid by `iterations` upwind sweeps
///
/// Seeded points are held fixed. `Δτ = ½·min(dx, dy)` keeps each sweep
/// within its CFL limit for unit normals.
pub fn extend_velocity(
    grid: &Grid,
    phi: &[f64],
    velocity: &mut FieldData,
    fixed: &[bool],
    iterations: usize,
) {
    let width = grid.nx();
    let height = grid.ny();
    let (dx, dy) = (grid.dx(), grid.dy());
    let h = grid.h_min();
    let dtau = 0.5 * h;
    let normals = normal_field(grid, phi);

    let mut back = velocity.clone();
    for _ in 0..iterations {
        let v_in = velocity.as_slice();
        back.data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let idx = y * width + x;
                    if fixed[idx] || x == 0 || x == width - 1 || y == 0 || y == height - 1 {
                        *out = v_in[idx];
                        continue;
                    }
                    let s = phi[idx] / (phi[idx] * phi[idx] + h * h).sqrt();
                    let a = s * normals[idx].x;
                    let b = s * normals[idx].y;
                    let v = v_in[idx];

                    let v_x = if a > 0.0 {
                        (v - v_in[idx - 1]) / dx
                    } else {
                        (v_in[idx + 1] - v) / dx
                    };
                    let v_y = if b > 0.0 {
                        (v - v_in[idx - width]) / dy
                    } else {
                        (v_in[idx + width] - v) / dy
                    };
                    *out = v - dtau * (a * v_x + b * v_y);
                }
            });
        apply_velocity_edges(&mut back.data, width, height);
        std::mem::swap(velocity, &mut back);
    }
}
