//! Quality presets for grid resolution
//!
//! A preset picks the cell size for a given domain and scales the time step
//! with it, so the advective CFL number stays comparable across resolutions.

use crate::config::Params;

/// Time step per unit cell size used by every preset
const DT_PER_CELL: f64 = 0.05;

/// Quality preset determining grid resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityPreset {
    /// 0.05 length units per cell
    Ultra,
    /// 0.1 length units per cell
    High,
    /// 0.2 length units per cell (the `Params` default)
    Medium,
    /// 0.4 length units per cell
    Low,
}

impl QualityPreset {
    /// Get target cell size for this quality preset
    #[must_use]
    pub const fn target_cell_size(&self) -> f64 {
        match self {
            Self::Ultra => 0.05,
            Self::High => 0.1,
            Self::Medium => 0.2,
            Self::Low => 0.4,
        }
    }

    /// Calculate `(nx, ny)` for a domain of the given extents
    ///
    /// Point counts are clamped to `[16, 4096]` per axis.
    #[must_use]
    pub fn grid_dimensions(&self, length: f64, width: f64) -> (usize, usize) {
        let h = self.target_cell_size();
        // Shave rounding noise so an exact multiple of the cell size is not bumped up
        let nx = ((length / h - 1e-9).ceil() as usize + 1).clamp(16, 4096);
        let ny = ((width / h - 1e-9).ceil() as usize + 1).clamp(16, 4096);
        (nx, ny)
    }

    /// Return `params` with grid size and time step set by this preset
    #[must_use]
    pub fn apply(&self, params: &Params) -> Params {
        let (nx, ny) = self.grid_dimensions(params.domain_length, params.domain_width);
        let h = (params.domain_length / (nx - 1) as f64).min(params.domain_width / (ny - 1) as f64);
        let steps_scale = params.dt / (DT_PER_CELL * h);
        Params {
            nx,
            ny,
            dt: DT_PER_CELL * h,
            // Keep the simulated end time unchanged
            steps: (params.steps as f64 * steps_scale).round() as usize,
            ..params.clone()
        }
    }

    /// Parse a preset name (`ultra`, `high`, `medium`, `low`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ultra" => Some(Self::Ultra),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}
