//! Error types for image and transformation primitives.

use thiserror::Error;

/// Errors raised by the core image and transformation types.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Tensor payload could not be read back as `f32` voxels.
    #[error("Tensor data error: {0}")]
    Data(String),

    /// Payload shape does not match the image geometry.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Geometry cannot describe a voxel grid (zero size, bad spacing, singular direction).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Transformation data is malformed (singular matrix, wrong component count).
    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ImageError>;

impl ImageError {
    /// Create a tensor data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create an invalid transformation error.
    pub fn invalid_transformation(msg: impl Into<String>) -> Self {
        Self::InvalidTransformation(msg.into())
    }
}
