//! Interface geometry
//!
//! For every interface-adjacent point this module locates the sub-cell
//! position of the zero contour along each stencil arm, and estimates the
//! outward normal `n = ∇φ/|∇φ|` and curvature `C = ∇·n` of the interface.
//!
//! # Sub-cell crossings
//!
//! Along an arm from an inside point `A` (`φ_A < 0`) to an outside neighbour
//! `B` (`φ_B ≥ 0`) the contour sits at fraction
//!
//! ```text
//! θ = φ_A / (φ_A − φ_B)      θ ∈ (0, 1]
//! ```
//!
//! of the spacing, measured from `A`. `θ = 1` means the contour passes
//! exactly through `B`.

use super::domain::{is_inside, Classification};
use crate::error::GeometryError;
use crate::grid::{Axis, Grid};
use nalgebra::Vector2;
use rustc_hash::FxHashMap;

/// Gradient magnitude below which a normal is considered undefined
pub const DEGENERATE_GRADIENT: f64 = 1e-8;

/// Stencil arm direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// −x
    West,
    /// +x
    East,
    /// −y
    South,
    /// +y
    North,
}

impl Direction {
    /// All four arms in stencil order
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    /// Axis the arm lies on
    pub fn axis(self) -> Axis {
        match self {
            Direction::West | Direction::East => Axis::X,
            Direction::South | Direction::North => Axis::Y,
        }
    }

    /// `+1.0` for arms pointing along the positive axis
    pub fn sign(self) -> f64 {
        match self {
            Direction::East | Direction::North => 1.0,
            Direction::West | Direction::South => -1.0,
        }
    }

    /// `(di, dj)` grid offset of the arm
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::North => (0, 1),
        }
    }

    /// Neighbour index of `idx` along this arm (caller guarantees it exists)
    #[inline]
    pub fn step(self, grid: &Grid, idx: usize) -> usize {
        match self {
            Direction::West => idx - 1,
            Direction::East => idx + 1,
            Direction::South => idx - grid.nx(),
            Direction::North => idx + grid.nx(),
        }
    }
}

/// Zero-contour crossing on one stencil arm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Inside end of the arm (always an interior point)
    pub inside: usize,
    /// Outside end of the arm
    pub outside: usize,
    /// Direction from `inside` to `outside`
    pub direction: Direction,
    /// Crossing fraction measured from `inside`
    pub theta: f64,
    /// Interface curvature interpolated at the crossing
    pub curvature: f64,
    /// Density imposed at the crossing (set by the interface density solver)
    pub density: f64,
}

impl Crossing {
    /// Distance from the inside point to the interface
    #[inline]
    pub fn distance(&self, grid: &Grid) -> f64 {
        self.theta * grid.spacing(self.direction.axis())
    }
}

/// Normal and curvature at an interface-adjacent grid point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfacePoint {
    /// Row-major grid index
    pub index: usize,
    /// Unit outward normal (towards `φ > 0`)
    pub normal: Vector2<f64>,
    /// Curvature `∇·n`, positive where the region bulges outward
    pub curvature: f64,
}

/// Interface description for one time step
#[derive(Debug, Clone, Default)]
pub struct InterfaceGeometry {
    /// One entry per interface-adjacent point, in classification order
    pub points: Vec<InterfacePoint>,
    /// One entry per sign-changing arm with an interior inside end
    pub crossings: Vec<Crossing>,
    crossing_of: FxHashMap<(usize, Direction), usize>,
}

impl InterfaceGeometry {
    /// Locate all crossings and evaluate normals and curvature
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NoSignChange`] if a classified arm does not
    /// straddle zero (an internal invariant violation).
    pub fn build(
        grid: &Grid,
        phi: &[f64],
        classification: &Classification,
    ) -> Result<Self, GeometryError> {
        let mut points = Vec::with_capacity(classification.interface().len());
        for &idx in classification.interface() {
            points.push(InterfacePoint {
                index: idx,
                normal: normal_with_fallback(grid, phi, idx),
                curvature: curvature_at(grid, phi, idx),
            });
        }

        let mut crossings = Vec::new();
        let mut crossing_of = FxHashMap::default();
        for &idx in classification.interface() {
            if !is_inside(phi[idx]) {
                continue;
            }
            for direction in Direction::ALL {
                let outside = direction.step(grid, idx);
                if is_inside(phi[outside]) {
                    continue;
                }
                let theta = crossing_fraction(phi[idx], phi[outside])?;
                let (io, jo) = grid.ij(outside);
                let curvature = if grid.is_boundary(io, jo) {
                    curvature_at(grid, phi, idx)
                } else {
                    (1.0 - theta) * curvature_at(grid, phi, idx)
                        + theta * curvature_at(grid, phi, outside)
                };
                crossing_of.insert((idx, direction), crossings.len());
                crossings.push(Crossing {
                    inside: idx,
                    outside,
                    direction,
                    theta,
                    curvature,
                    density: 0.0,
                });
            }
        }

        Ok(Self {
            points,
            crossings,
            crossing_of,
        })
    }

    /// Crossing on the arm leaving interior point `inside` along `direction`
    pub fn crossing(&self, inside: usize, direction: Direction) -> Option<&Crossing> {
        self.crossing_of
            .get(&(inside, direction))
            .map(|&k| &self.crossings[k])
    }

    /// Smallest interface density over all crossings
    pub fn min_density(&self) -> Option<f64> {
        self.crossings
            .iter()
            .map(|c| c.density)
            .reduce(f64::min)
    }
}

/// Sub-cell crossing fraction between an inside and an outside value
///
/// # Errors
///
/// Returns [`GeometryError::NoSignChange`] unless `phi_inside < 0 ≤ phi_outside`.
pub fn crossing_fraction(phi_inside: f64, phi_outside: f64) -> Result<f64, GeometryError> {
    if !(is_inside(phi_inside) && !is_inside(phi_outside)) {
        return Err(GeometryError::NoSignChange {
            phi_inside,
            phi_outside,
        });
    }
    Ok((phi_inside / (phi_inside - phi_outside)).clamp(0.0, 1.0))
}

/// Centred first derivatives, falling back to one-sided at the domain edge
#[inline]
fn gradient_at(grid: &Grid, phi: &[f64], idx: usize) -> Vector2<f64> {
    let (i, j) = grid.ij(idx);
    let nx = grid.nx();
    let (il, ir) = (i.saturating_sub(1), (i + 1).min(nx - 1));
    let (jd, ju) = (j.saturating_sub(1), (j + 1).min(grid.ny() - 1));
    let gx = (phi[grid.idx(ir, j)] - phi[grid.idx(il, j)]) / ((ir - il) as f64 * grid.dx());
    let gy = (phi[grid.idx(i, ju)] - phi[grid.idx(i, jd)]) / ((ju - jd) as f64 * grid.dy());
    Vector2::new(gx, gy)
}

/// Unit outward normal, or `None` where the gradient is degenerate
pub fn normal_at(grid: &Grid, phi: &[f64], idx: usize) -> Option<Vector2<f64>> {
    let g = gradient_at(grid, phi, idx);
    let mag = g.norm();
    if mag > DEGENERATE_GRADIENT {
        Some(g / mag)
    } else {
        None
    }
}

/// Unit normal with the degenerate-gradient guard applied
///
/// Falls back to the first valid 4-neighbour normal, then to `+x`.
pub fn normal_with_fallback(grid: &Grid, phi: &[f64], idx: usize) -> Vector2<f64> {
    if let Some(n) = normal_at(grid, phi, idx) {
        return n;
    }
    let (i, j) = grid.ij(idx);
    let neighbours = [
        (i > 0).then(|| idx - 1),
        (i + 1 < grid.nx()).then(|| idx + 1),
        (j > 0).then(|| idx - grid.nx()),
        (j + 1 < grid.ny()).then(|| idx + grid.nx()),
    ];
    neighbours
        .into_iter()
        .flatten()
        .find_map(|n| normal_at(grid, phi, n))
        .unwrap_or_else(Vector2::x)
}

/// Normal field over the whole grid, zero where the gradient is degenerate
pub fn normal_field(grid: &Grid, phi: &[f64]) -> Vec<Vector2<f64>> {
    (0..grid.len())
        .map(|idx| normal_at(grid, phi, idx).unwrap_or_else(Vector2::zeros))
        .collect()
}

/// Curvature `∇·(∇φ/|∇φ|)` at a point off the physical boundary
///
/// Zero on the boundary and where the gradient is degenerate. Clamped to
/// `±1/min(dx, dy)` since tighter bends are not resolved by the grid.
pub fn curvature_at(grid: &Grid, phi: &[f64], idx: usize) -> f64 {
    let (i, j) = grid.ij(idx);
    if grid.is_boundary(i, j) {
        return 0.0;
    }
    let nx = grid.nx();
    let (dx, dy) = (grid.dx(), grid.dy());

    let p = phi[idx];
    let left = phi[idx - 1];
    let right = phi[idx + 1];
    let down = phi[idx - nx];
    let up = phi[idx + nx];

    let phi_x = (right - left) / (2.0 * dx);
    let phi_y = (up - down) / (2.0 * dy);
    let grad_sq = phi_x * phi_x + phi_y * phi_y;
    if grad_sq.sqrt() <= DEGENERATE_GRADIENT {
        return 0.0;
    }

    let phi_xx = (right - 2.0 * p + left) / (dx * dx);
    let phi_yy = (up - 2.0 * p + down) / (dy * dy);
    let phi_xy = (phi[idx + nx + 1] - phi[idx + nx - 1] - phi[idx - nx + 1] + phi[idx - nx - 1])
        / (4.0 * dx * dy);

    // κ = (φ_xx φ_y² - 2φ_x φ_y φ_xy + φ_yy φ_x²) / (φ_x² + φ_y²)^(3/2)
    let numerator = phi_xx * phi_y * phi_y - 2.0 * phi_x * phi_y * phi_xy + phi_yy * phi_x * phi_x;
    let limit = 1.0 / grid.h_min();
    (numerator / grad_sq.powf(1.5)).clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::domain::classify;
    use approx::assert_relative_eq;

    fn circle_level_set(grid: &Grid, cx: f64, cy: f64, radius: f64) -> Vec<f64> {
        let mut phi = Vec::with_capacity(grid.len());
        for &y in grid.y() {
            for &x in grid.x() {
                phi.push(((x - cx).powi(2) + (y - cy).powi(2)).sqrt() - radius);
            }
        }
        phi
    }

    #[test]
    fn test_crossing_fraction_bounds() {
        assert_relative_eq!(crossing_fraction(-1.0, 1.0).unwrap(), 0.5);
        assert_relative_eq!(crossing_fraction(-0.25, 0.75).unwrap(), 0.25);
        // Contour exactly on the outside grid point
        assert_relative_eq!(crossing_fraction(-0.3, 0.0).unwrap(), 1.0);

        for k in 1..50 {
            let a = -(k as f64) * 0.37;
            for l in 0..50 {
                let b = l as f64 * 0.11;
                let theta = crossing_fraction(a, b).unwrap();
                assert!((0.0..=1.0).contains(&theta), "θ = {theta} for ({a}, {b})");
            }
        }
    }

    #[test]
    fn test_crossing_fraction_requires_sign_change() {
        assert!(matches!(
            crossing_fraction(0.5, 1.0),
            Err(GeometryError::NoSignChange { .. })
        ));
        assert!(crossing_fraction(-0.5, -1.0).is_err());
        assert!(crossing_fraction(0.0, 1.0).is_err());
    }

    #[test]
    fn test_planar_front_crossings() {
        let grid = Grid::uniform(10.0, 4.0, 11, 5).unwrap();
        let phi: Vec<f64> = (0..grid.len())
            .map(|idx| grid.x()[grid.ij(idx).0] - 4.3)
            .collect();
        let c = classify(&grid, &phi).unwrap();
        let geom = InterfaceGeometry::build(&grid, &phi, &c).unwrap();

        assert_eq!(geom.crossings.len(), 3);
        for crossing in &geom.crossings {
            assert_eq!(crossing.direction, Direction::East);
            assert_relative_eq!(crossing.theta, 0.3, epsilon = 1e-12);
            assert_relative_eq!(crossing.curvature, 0.0, epsilon = 1e-12);
        }
        for point in &geom.points {
            assert_relative_eq!(point.normal.x, 1.0, epsilon = 1e-12);
            assert_relative_eq!(point.normal.y, 0.0, epsilon = 1e-12);
        }
        let inside = grid.idx(4, 2);
        assert!(geom.crossing(inside, Direction::East).is_some());
        assert!(geom.crossing(inside, Direction::West).is_none());
    }

    #[test]
    fn test_circle_normals_point_outward() {
        let grid = Grid::uniform(4.0, 4.0, 41, 41).unwrap();
        let phi = circle_level_set(&grid, 2.0, 2.0, 1.0);
        let c = classify(&grid, &phi).unwrap();
        let geom = InterfaceGeometry::build(&grid, &phi, &c).unwrap();

        for point in &geom.points {
            let (i, j) = grid.ij(point.index);
            let radial = Vector2::new(grid.x()[i] - 2.0, grid.y()[j] - 2.0).normalize();
            assert!(point.normal.dot(&radial) > 0.99);
            assert_relative_eq!(point.normal.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_circle_curvature_is_inverse_radius() {
        let grid = Grid::uniform(4.0, 4.0, 81, 81).unwrap();
        let phi = circle_level_set(&grid, 2.0, 2.0, 1.0);
        let c = classify(&grid, &phi).unwrap();
        let geom = InterfaceGeometry::build(&grid, &phi, &c).unwrap();

        let mean: f64 =
            geom.crossings.iter().map(|c| c.curvature).sum::<f64>() / geom.crossings.len() as f64;
        assert_relative_eq!(mean, 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_degenerate_gradient_falls_back_to_neighbour() {
        let grid = Grid::uniform(4.0, 4.0, 5, 5).unwrap();
        let mut phi: Vec<f64> = (0..grid.len())
            .map(|idx| grid.x()[grid.ij(idx).0] - 2.0)
            .collect();
        // Flatten the stencil of (2, 2) so its centred gradient vanishes
        let centre = grid.idx(2, 2);
        phi[centre - 1] = phi[centre + 1];
        assert!(normal_at(&grid, &phi, centre).is_none());

        let n = normal_with_fallback(&grid, &phi, centre);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(curvature_at(&grid, &phi, centre), 0.0);
    }

    #[test]
    fn test_fully_flat_field_defaults_to_x_normal() {
        let grid = Grid::uniform(4.0, 4.0, 5, 5).unwrap();
        let phi = vec![0.0; grid.len()];
        let n = normal_with_fallback(&grid, &phi, grid.idx(2, 2));
        assert_eq!(n, Vector2::x());
    }
}
