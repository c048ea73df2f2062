//! Level set reinitialisation
//!
//! Advection distorts φ away from a signed distance function. A fixed number
//! of pseudo-time sweeps of
//!
//! ```text
//! ∂φ/∂τ = S(φ₀)(1 − |∇φ|),    S(φ₀) = φ₀ / √(φ₀² + h²)
//! ```
//!
//! pull `|∇φ|` back towards one, with `φ₀` the field on entry and
//! `Δτ = ½·min(dx, dy)`.
//!
//! Points next to the zero contour use the subcell fix of Russo & Smereka
//! (2000): their target value is the distance estimate `φ₀ / g` taken from
//! the frozen field, so the contour does not drift between sweeps.

use super::domain::is_inside;
use super::fields::FieldData;
use super::level_set::{apply_level_set_edges, OneSided};
use crate::grid::Grid;
use rayon::prelude::*;

/// Subcell distance estimate for points adjacent to the zero contour of `phi0`
///
/// `None` for points whose 4-neighbours all share their sign class.
fn subcell_distance(phi0: &[f64], idx: usize, width: usize, dx: f64, dy: f64) -> Option<f64> {
    let p = phi0[idx];
    let (left, right) = (phi0[idx - 1], phi0[idx + 1]);
    let (down, up) = (phi0[idx - width], phi0[idx + width]);
    let inside = is_inside(p);
    if [left, right, down, up]
        .iter()
        .all(|&n| is_inside(n) == inside)
    {
        return None;
    }

    let centred = f64::hypot((right - left) / (2.0 * dx), (up - down) / (2.0 * dy));
    let g = [
        centred,
        (right - p).abs() / dx,
        (p - left).abs() / dx,
        (up - p).abs() / dy,
        (p - down).abs() / dy,
    ]
    .into_iter()
    .fold(f64::EPSILON, f64::max);
    Some(p / g)
}

/// Run `iterations` reinitialisation sweeps on `phi` in place
pub fn reinitialise(grid: &Grid, phi: &mut FieldData, iterations: usize) {
    if iterations == 0 {
        return;
    }
    let width = grid.nx();
    let height = grid.ny();
    let (dx, dy) = (grid.dx(), grid.dy());
    let h = grid.h_min();
    let dtau = 0.5 * h;

    let phi0 = phi.data.clone();
    let targets: Vec<Option<f64>> = (0..grid.len())
        .map(|idx| {
            let (i, j) = grid.ij(idx);
            if grid.is_boundary(i, j) {
                None
            } else {
                subcell_distance(&phi0, idx, width, dx, dy)
            }
        })
        .collect();

    let mut back = phi.clone();
    for _ in 0..iterations {
        let current = phi.as_slice();
        back.data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                if y == 0 || y == height - 1 {
                    return;
                }
                for x in 1..width - 1 {
                    let idx = y * width + x;
                    let p = current[idx];
                    let p0 = phi0[idx];
                    row[x] = if let Some(distance) = targets[idx] {
                        p - (dtau / h) * (p0.signum() * p.abs() - distance)
                    } else {
                        let s = p0 / (p0 * p0 + h * h).sqrt();
                        let grad_mag = OneSided::at(current, idx, width, dx, dy).godunov(s);
                        p - dtau * s * (grad_mag - 1.0)
                    };
                }
            });
        apply_level_set_edges(&mut back.data, width, height);
        std::mem::swap(phi, &mut back);
    }
}
