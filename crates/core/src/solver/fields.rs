//! Field data structures
//!
//! Every dense array of the simulation (density, level set, velocity) is a
//! [`FieldData`] stored row-major over the grid.

use crate::grid::Grid;

/// Dense 2D field over the grid
///
/// Stores field data as a flat `Vec<f64>` in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// Field values in row-major order (y * width + x)
    pub data: Vec<f64>,
    /// Points along x
    pub width: usize,
    /// Points along y
    pub height: usize,
}

impl FieldData {
    /// Create a new field with given dimensions, initialized to zero
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_value(width, height, 0.0)
    }

    /// Create a new field with given dimensions, initialized to a value
    #[must_use]
    pub fn with_value(width: usize, height: usize, value: f64) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Create a field on `grid` by evaluating `f(x, y)` at every point
    pub fn from_fn(grid: &Grid, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        let mut data = Vec::with_capacity(grid.len());
        for &y in grid.y() {
            for &x in grid.x() {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width: grid.nx(),
            height: grid.ny(),
        }
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Get value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[y * self.width + x]
    }

    /// Set value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[y * self.width + x] = value;
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Copy the first and last interior rows onto the edge rows (zero normal derivative)
    pub fn mirror_edge_rows(&mut self) {
        mirror_edge_rows(&mut self.data, self.width, self.height);
    }

    /// Largest absolute pointwise difference to another field of the same shape
    pub fn max_abs_diff(&self, other: &FieldData) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Zero-gradient condition on the bottom and top rows of a row-major field
pub(crate) fn mirror_edge_rows(data: &mut [f64], width: usize, height: usize) {
    if height < 3 {
        return;
    }
    data.copy_within(width..2 * width, 0);
    let last = (height - 1) * width;
    data.copy_within(last - width..last, last);
}

/// Linear extrapolation onto the left and right columns of a row-major field
pub(crate) fn extrapolate_edge_columns(data: &mut [f64], width: usize) {
    if width < 3 {
        return;
    }
    for row in data.chunks_exact_mut(width) {
        row[0] = 2.0 * row[1] - row[2];
        row[width - 1] = 2.0 * row[width - 2] - row[width - 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = FieldData::new(10, 20);
        assert_eq!(field.width, 10);
        assert_eq!(field.height, 20);
        assert_eq!(field.data.len(), 200);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_field_get_set() {
        let mut field = FieldData::new(10, 10);
        field.set(3, 4, 123.45);
        assert_eq!(field.get(3, 4), 123.45);

        // Verify row-major indexing
        let index = 4 * 10 + 3;
        assert_eq!(field.data[index], 123.45);
    }

    #[test]
    fn test_field_from_fn() {
        let grid = Grid::uniform(2.0, 1.0, 3, 3).unwrap();
        let field = FieldData::from_fn(&grid, |x, y| x + 10.0 * y);
        assert_eq!(field.get(2, 0), 2.0);
        assert_eq!(field.get(1, 2), 11.0);
    }

    #[test]
    fn test_mirror_edge_rows() {
        let mut field = FieldData::new(3, 4);
        for (k, v) in field.data.iter_mut().enumerate() {
            *v = k as f64;
        }
        field.mirror_edge_rows();
        assert_eq!(&field.data[0..3], &[3.0, 4.0, 5.0]);
        assert_eq!(&field.data[9..12], &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_extrapolate_edge_columns() {
        let mut data = vec![0.0, 1.0, 3.0, 4.0, 0.0, 0.0, 2.0, 4.0, 6.0, 0.0];
        extrapolate_edge_columns(&mut data, 5);
        assert_eq!(data[0], -1.0);
        assert_eq!(data[4], 5.0);
        assert_eq!(data[5], 0.0);
        assert_eq!(data[9], 8.0);
    }

    #[test]
    #[should_panic(expected = "Coordinates out of bounds")]
    fn test_field_bounds_check() {
        let field = FieldData::new(10, 10);
        let _ = field.get(10, 5); // Out of bounds
    }
}
