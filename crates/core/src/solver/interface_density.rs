//! Interface density
//!
//! The density imposed on the moving boundary is the background density
//! raised by surface tension on outward bulges:
//!
//! ```text
//! u_I = clamp(u_f + γ·C, 0, 1)
//! ```
//!
//! A convex bulge (`C > 0`) carries a higher boundary density, flattening the
//! local gradient and slowing it through the Stefan condition. With `γ = 0`
//! the boundary value is exactly `u_f`.

use super::geometry::InterfaceGeometry;
use crate::config::Params;

/// Admissible density range for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    /// Smallest admissible density
    pub lower: f64,
    /// Largest admissible density (carrying capacity)
    pub upper: f64,
}

impl FieldBounds {
    /// True if `value` lies within the bounds up to `tolerance`
    #[inline]
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// Boundary density for a given interface curvature
#[inline]
pub fn interface_density(params: &Params, curvature: f64) -> f64 {
    (params.background_density + params.surface_tension * curvature).clamp(0.0, 1.0)
}

/// Set the density of every crossing and return this step's field bounds
///
/// The lower bound is the background density, lowered to the smallest
/// boundary density when surface tension pulls it further down.
pub fn assign_interface_density(geometry: &mut InterfaceGeometry, params: &Params) -> FieldBounds {
    for crossing in &mut geometry.crossings {
        crossing.density = interface_density(params, crossing.curvature);
    }
    let lower = geometry
        .min_density()
        .map_or(params.background_density, |d| d.min(params.background_density));
    FieldBounds { lower, upper: 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::solver::domain::classify;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_surface_tension_gives_background() {
        let params = Params {
            surface_tension: 0.0,
            background_density: 0.2,
            ..Params::default()
        };
        assert_eq!(interface_density(&params, 3.0), 0.2);
        assert_eq!(interface_density(&params, -3.0), 0.2);
    }

    #[test]
    fn test_surface_tension_raises_density_on_bulges() {
        let params = Params {
            surface_tension: 0.1,
            background_density: 0.2,
            ..Params::default()
        };
        assert_relative_eq!(interface_density(&params, 1.0), 0.3);
        assert_relative_eq!(interface_density(&params, -1.0), 0.1);
        assert_eq!(interface_density(&params, 100.0), 1.0);
        assert_eq!(interface_density(&params, -100.0), 0.0);
    }

    #[test]
    fn test_assign_sets_every_crossing_and_bounds() {
        let grid = Grid::uniform(4.0, 4.0, 41, 41).unwrap();
        let phi: Vec<f64> = (0..grid.len())
            .map(|idx| {
                let (i, j) = grid.ij(idx);
                ((grid.x()[i] - 2.0).powi(2) + (grid.y()[j] - 2.0).powi(2)).sqrt() - 1.0
            })
            .collect();
        let c = classify(&grid, &phi).unwrap();
        let mut geom = InterfaceGeometry::build(&grid, &phi, &c).unwrap();

        let params = Params {
            surface_tension: 0.05,
            background_density: 0.2,
            ..Params::default()
        };
        let bounds = assign_interface_density(&mut geom, &params);
        assert!(!geom.crossings.is_empty());
        for crossing in &geom.crossings {
            // Convex circle: every boundary value exceeds the background
            assert!(crossing.density > 0.2);
        }
        assert_eq!(bounds.lower, 0.2);
        assert_eq!(bounds.upper, 1.0);
        assert!(bounds.contains(0.2 - 1e-12, 1e-9));
        assert!(!bounds.contains(1.1, 1e-9));
    }
}
