//! Error types for the moving-boundary solver
//!
//! Each stage reports failures through its own small enum. The driver folds
//! them into [`SimulationError`], which decides whether a run halts.
//!
//! Solver non-convergence is not an error: it is recorded as a
//! [`crate::simulation::SolverWarning`] and the run continues.

use std::fmt;

/// Invalid run configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A named parameter is outside its admissible range
    InvalidParameter {
        /// Parameter name as it appears in [`crate::Params`]
        name: &'static str,
        /// Why the value was rejected
        message: String,
    },
}

impl ConfigError {
    /// Create error for a parameter that must be finite and strictly positive.
    pub fn not_positive(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter {
            name,
            message: format!("must be finite and positive, got {value}"),
        }
    }

    /// Create error for a parameter outside a closed range.
    pub fn out_of_range(name: &'static str, value: f64, lo: f64, hi: f64) -> Self {
        Self::InvalidParameter {
            name,
            message: format!("must lie in [{lo}, {hi}], got {value}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter { name, message } => {
                write!(f, "Parameter {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Invalid grid construction
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Fewer than three points along an axis (no interior)
    TooFewPoints {
        /// `'x'` or `'y'`
        axis: char,
        /// Requested point count
        count: usize,
    },
    /// Domain extent is zero, negative or not finite
    InvalidExtent {
        /// `'x'` or `'y'`
        axis: char,
        /// Requested extent
        extent: f64,
    },
    /// Coordinates are not strictly increasing with constant spacing
    NonUniformSpacing {
        /// `'x'` or `'y'`
        axis: char,
        /// First offending coordinate index
        index: usize,
    },
    /// A field does not match the grid size
    ShapeMismatch {
        /// Field name
        field: &'static str,
        /// `nx * ny`
        expected: usize,
        /// Length supplied
        found: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::TooFewPoints { axis, count } => {
                write!(f, "Grid needs at least 3 points along {axis}, got {count}")
            }
            GridError::InvalidExtent { axis, extent } => {
                write!(f, "Grid extent along {axis} must be finite and positive, got {extent}")
            }
            GridError::NonUniformSpacing { axis, index } => {
                write!(f, "Grid spacing along {axis} is not uniform at index {index}")
            }
            GridError::ShapeMismatch {
                field,
                expected,
                found,
            } => write!(f, "Field {field} has {found} values, grid has {expected} points"),
        }
    }
}

impl std::error::Error for GridError {}

/// Internal invariant violations in classification or interface geometry
///
/// These indicate a logic bug or a corrupted level set and halt the run.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The level set holds a non-finite value
    UnresolvedLevelSet {
        /// Row-major grid index
        index: usize,
        /// Offending value
        value: f64,
    },
    /// A stencil pair used for interpolation does not straddle zero
    NoSignChange {
        /// Level set value on the supposed inside end
        phi_inside: f64,
        /// Level set value on the supposed outside end
        phi_outside: f64,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::UnresolvedLevelSet { index, value } => {
                write!(f, "Level set is not finite at grid index {index}: {value}")
            }
            GeometryError::NoSignChange {
                phi_inside,
                phi_outside,
            } => write!(
                f,
                "Interface stencil does not straddle zero: inside {phi_inside}, outside {phi_outside}"
            ),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Failure reported by a snapshot sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot sink failed: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Fatal simulation failure
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Configuration rejected before the run started
    Config(ConfigError),
    /// Grid or state shape rejected before the run started
    Grid(GridError),
    /// Classification or interface geometry invariant violated
    Geometry(GeometryError),
    /// Density left its physical bounds (unstable step or broken discretisation)
    FieldOutOfBounds {
        /// Row-major grid index
        index: usize,
        /// Offending density
        value: f64,
        /// Admissible lower bound this step
        lower: f64,
        /// Admissible upper bound this step
        upper: f64,
    },
    /// The snapshot sink refused a snapshot
    Sink(SinkError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "Invalid configuration: {e}"),
            SimulationError::Grid(e) => write!(f, "Invalid grid: {e}"),
            SimulationError::Geometry(e) => write!(f, "Interface geometry failure: {e}"),
            SimulationError::FieldOutOfBounds {
                index,
                value,
                lower,
                upper,
            } => write!(
                f,
                "Density {value} at grid index {index} left bounds [{lower}, {upper}]"
            ),
            SimulationError::Sink(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Grid(e) => Some(e),
            SimulationError::Geometry(e) => Some(e),
            SimulationError::Sink(e) => Some(e),
            SimulationError::FieldOutOfBounds { .. } => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<GridError> for SimulationError {
    fn from(e: GridError) -> Self {
        SimulationError::Grid(e)
    }
}

impl From<GeometryError> for SimulationError {
    fn from(e: GeometryError) -> Self {
        SimulationError::Geometry(e)
    }
}

impl From<SinkError> for SimulationError {
    fn from(e: SinkError) -> Self {
        SimulationError::Sink(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::not_positive("dt", -1.0);
        assert_eq!(err.to_string(), "Parameter dt: must be finite and positive, got -1");

        let err = ConfigError::out_of_range("limiter_theta", 3.0, 1.0, 2.0);
        assert_eq!(err.to_string(), "Parameter limiter_theta: must lie in [1, 2], got 3");
    }

    #[test]
    fn test_simulation_error_source_chain() {
        use std::error::Error;

        let err: SimulationError = GeometryError::NoSignChange {
            phi_inside: 1.0,
            phi_outside: 2.0,
        }
        .into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("does not straddle zero"));

        let err = SimulationError::FieldOutOfBounds {
            index: 3,
            value: 1.5,
            lower: 0.1,
            upper: 1.0,
        };
        assert!(err.source().is_none());
    }
}
