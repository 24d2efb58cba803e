//! Error types for resampling operations.

use thiserror::Error;
use warpkit_core::ImageError;

/// Main error type for resampling operations.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// An externally supplied image has no usable geometry.
    #[error("Geometry conversion error: {0}")]
    GeometryConversion(String),

    /// Two grids that must agree do not.
    #[error("Incompatible geometry: {0}")]
    IncompatibleGeometry(String),

    /// The requested interpolation is not available on this path.
    #[error("Unsupported interpolation: {0}")]
    UnsupportedInterpolation(String),

    /// A required input has not been set.
    #[error("Uninitialized context: {0}")]
    UninitializedContext(String),

    /// Degenerate transformation data.
    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    /// Error from the image and transformation primitives.
    #[error(transparent)]
    Image(ImageError),
}

impl From<ImageError> for ResampleError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidTransformation(msg) => Self::InvalidTransformation(msg),
            other => Self::Image(other),
        }
    }
}

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

impl ResampleError {
    /// Create a geometry conversion error.
    pub fn geometry_conversion(msg: impl Into<String>) -> Self {
        Self::GeometryConversion(msg.into())
    }

    /// Create an incompatible geometry error.
    pub fn incompatible_geometry(msg: impl Into<String>) -> Self {
        Self::IncompatibleGeometry(msg.into())
    }

    /// Create an unsupported interpolation error.
    pub fn unsupported_interpolation(msg: impl Into<String>) -> Self {
        Self::UnsupportedInterpolation(msg.into())
    }

    /// Create an uninitialized context error.
    pub fn uninitialized(msg: impl Into<String>) -> Self {
        Self::UninitializedContext(msg.into())
    }

    /// Create an invalid transformation error.
    pub fn invalid_transformation(msg: impl Into<String>) -> Self {
        Self::InvalidTransformation(msg.into())
    }
}
