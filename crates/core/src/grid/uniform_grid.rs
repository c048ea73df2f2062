//! Uniform rectangular grid
//!
//! All fields are stored row-major over this grid: `idx = j * nx + i`, with
//! `i` running along x (the invasion direction) and `j` along y.

use crate::error::GridError;

/// Relative tolerance used when checking uniform spacing
const SPACING_TOLERANCE: f64 = 1e-9;

/// Fixed uniform grid shared read-only by every solver stage
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    x: Vec<f64>,
    y: Vec<f64>,
    dx: f64,
    dy: f64,
}

impl Grid {
    /// Create a grid covering `[0, length] × [0, width]` with `nx × ny` points
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if an extent is not positive or an axis has fewer than 3 points.
    pub fn uniform(length: f64, width: f64, nx: usize, ny: usize) -> Result<Self, GridError> {
        let x = axis_points('x', length, nx)?;
        let y = axis_points('y', width, ny)?;
        Self::from_coordinates(x, y)
    }

    /// Create a grid from explicit coordinate vectors
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NonUniformSpacing`] unless both axes are strictly
    /// increasing with constant spacing.
    pub fn from_coordinates(x: Vec<f64>, y: Vec<f64>) -> Result<Self, GridError> {
        let dx = check_axis('x', &x)?;
        let dy = check_axis('y', &y)?;
        Ok(Self { x, y, dx, dy })
    }

    /// Points along x
    #[inline]
    pub fn nx(&self) -> usize {
        self.x.len()
    }

    /// Points along y
    #[inline]
    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// Total number of grid points
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len() * self.y.len()
    }

    /// Always false for a constructed grid
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spacing along x
    #[inline]
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Spacing along y
    #[inline]
    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Smaller of the two spacings
    #[inline]
    pub fn h_min(&self) -> f64 {
        self.dx.min(self.dy)
    }

    /// x coordinates
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// y coordinates
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Row-major index of `(i, j)`
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        j * self.x.len() + i
    }

    /// `(i, j)` of a row-major index
    #[inline]
    pub fn ij(&self, idx: usize) -> (usize, usize) {
        (idx % self.x.len(), idx / self.x.len())
    }

    /// True for points on the physical domain boundary
    #[inline]
    pub fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i + 1 == self.x.len() || j + 1 == self.y.len()
    }

    /// Spacing along an axis
    #[inline]
    pub fn spacing(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.dx,
            Axis::Y => self.dy,
        }
    }

    /// Check that a field has one value per grid point
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] otherwise.
    pub fn check_shape(&self, field: &'static str, len: usize) -> Result<(), GridError> {
        if len == self.len() {
            Ok(())
        } else {
            Err(GridError::ShapeMismatch {
                field,
                expected: self.len(),
                found: len,
            })
        }
    }
}

/// Grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Along rows (invasion direction)
    X,
    /// Along columns (lateral direction)
    Y,
}

fn axis_points(axis: char, extent: f64, count: usize) -> Result<Vec<f64>, GridError> {
    if !(extent.is_finite() && extent > 0.0) {
        return Err(GridError::InvalidExtent { axis, extent });
    }
    if count < 3 {
        return Err(GridError::TooFewPoints { axis, count });
    }
    let h = extent / (count - 1) as f64;
    Ok((0..count).map(|k| k as f64 * h).collect())
}

fn check_axis(axis: char, coords: &[f64]) -> Result<f64, GridError> {
    if coords.len() < 3 {
        return Err(GridError::TooFewPoints {
            axis,
            count: coords.len(),
        });
    }
    let h = coords[1] - coords[0];
    if !(h.is_finite() && h > 0.0) {
        return Err(GridError::NonUniformSpacing { axis, index: 1 });
    }
    for (k, pair) in coords.windows(2).enumerate() {
        let step = pair[1] - pair[0];
        if step.is_nan() || step <= 0.0 || ((step - h) / h).abs() > SPACING_TOLERANCE {
            return Err(GridError::NonUniformSpacing { axis, index: k + 1 });
        }
    }
    Ok(h)
}
