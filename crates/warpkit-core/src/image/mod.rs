//! Image types and operations.
//!
//! This module provides the Image type, the voxel grid geometry it lives on
//! and the intensity metadata that interprets its values.

pub mod geometry;
pub mod grid;
pub mod image;
pub mod intensity;

pub use geometry::ImageGeometry;
pub use grid::{generate_grid, grid_indices};
pub use image::Image;
pub use intensity::{IntensityMetadata, PixelType};
