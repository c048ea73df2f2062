//! Domain classification
//!
//! Splits the grid into the evolving region `Ω = { φ < 0 }` and the points
//! whose 4-point stencil crosses the zero contour. The sets are re-derived
//! from the level set every step; nothing about the previous step's
//! partition is carried over.

use crate::error::GeometryError;
use crate::grid::Grid;

/// True if a level set value marks a point inside the region
#[inline]
pub fn is_inside(phi: f64) -> bool {
    phi < 0.0
}

/// Partition of the grid for one time step
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    interior: Vec<usize>,
    interface: Vec<usize>,
    unknown_of: Vec<Option<usize>>,
}

impl Classification {
    /// Interior points (`φ < 0`, off the physical boundary), row-major order
    pub fn interior(&self) -> &[usize] {
        &self.interior
    }

    /// Interface-adjacent points of either sign, row-major order
    pub fn interface(&self) -> &[usize] {
        &self.interface
    }

    /// Position of a grid point in [`Self::interior`], i.e. its unknown number
    #[inline]
    pub fn unknown(&self, idx: usize) -> Option<usize> {
        self.unknown_of[idx]
    }

    /// True when the front has left or filled the domain
    pub fn is_exhausted(&self) -> bool {
        self.interior.is_empty() || self.interface.is_empty()
    }
}

/// Classify every grid point against the level set
///
/// # Errors
///
/// Returns [`GeometryError::UnresolvedLevelSet`] if `phi` holds a non-finite value.
pub fn classify(grid: &Grid, phi: &[f64]) -> Result<Classification, GeometryError> {
    if let Some((index, &value)) = phi.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(GeometryError::UnresolvedLevelSet { index, value });
    }

    let nx = grid.nx();
    let ny = grid.ny();
    let mut interior = Vec::new();
    let mut interface = Vec::new();
    let mut unknown_of = vec![None; grid.len()];

    for j in 1..ny - 1 {
        for i in 1..nx - 1 {
            let idx = grid.idx(i, j);
            let inside = is_inside(phi[idx]);

            if inside {
                unknown_of[idx] = Some(interior.len());
                interior.push(idx);
            }

            let neighbours = [idx - 1, idx + 1, idx - nx, idx + nx];
            if neighbours.iter().any(|&n| is_inside(phi[n]) != inside) {
                interface.push(idx);
            }
        }
    }

    Ok(Classification {
        interior,
        interface,
        unknown_of,
    })
}
