//! Resampling configuration.

use serde::{Deserialize, Serialize};
use crate::error::{ResampleError, Result};
use crate::validation::GeometryCheck;

/// Interpolation kernel used to sample the floating image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    /// Keys cubic convolution.
    Cubic,
    /// Lanczos-windowed sinc. Forward only.
    Sinc,
}

impl Interpolation {
    /// Integer code used by callers that configure the kernel by order.
    pub fn code(self) -> i32 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
            Self::Cubic => 3,
            Self::Sinc => 4,
        }
    }

    /// Parse an integer kernel code (0 nearest, 1 linear, 3 cubic, 4 sinc).
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Nearest),
            1 => Ok(Self::Linear),
            3 => Ok(Self::Cubic),
            4 => Ok(Self::Sinc),
            other => Err(ResampleError::unsupported_interpolation(format!(
                "unknown interpolation code {other}"
            ))),
        }
    }

    /// Whether the adjoint scatter can use this kernel.
    pub fn supports_adjoint(self) -> bool {
        !matches!(self, Self::Sinc)
    }
}

/// Which operator `process` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformDirection {
    /// Floating image to the reference grid.
    #[default]
    Forward,
    /// Reference-grid image back to the floating grid.
    Adjoint,
}

impl TransformDirection {
    /// The grid a field for this direction is naturally expressed on: the
    /// grid the operator writes to.
    pub fn sampling_grid<'a, T>(self, reference: &'a T, floating: &'a T) -> &'a T {
        match self {
            Self::Forward => reference,
            Self::Adjoint => floating,
        }
    }
}

/// Resampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub interpolation: Interpolation,
    /// Value written where the transformed position falls outside the floating image.
    pub padding_value: f32,
    pub direction: TransformDirection,
    /// Tolerance used when comparing grids.
    pub geometry_tolerance: f64,
    /// What to do when operator inputs do not match the expected grid.
    pub geometry_check: GeometryCheck,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            padding_value: 0.0,
            direction: TransformDirection::Forward,
            geometry_tolerance: 1e-4,
            geometry_check: GeometryCheck::Strict,
        }
    }
}

impl ResampleConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpolation kernel.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the padding value.
    pub fn with_padding_value(mut self, value: f32) -> Self {
        self.padding_value = value;
        self
    }

    /// Set the direction used by `process`.
    pub fn with_direction(mut self, direction: TransformDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the grid comparison tolerance.
    pub fn with_geometry_tolerance(mut self, tolerance: f64) -> Self {
        self.geometry_tolerance = tolerance;
        self
    }

    /// Warn instead of failing on grid mismatches.
    pub fn tolerant(mut self) -> Self {
        self.geometry_check = GeometryCheck::Tolerant;
        self
    }
}
