//! Image, geometry and transformation primitives for volumetric resampling.

pub mod error;
pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;

pub use error::{ImageError, Result};
pub use image::{Image, ImageGeometry, IntensityMetadata, PixelType};
pub use spatial::{Point, Vector, Spacing, Direction};
pub use transform::{Transform, Transformation, DeformationField};
