//! Forward and adjoint resampling of 3D volumes.
//!
//! A [`ResampleEngine`] maps a floating image onto the grid of a reference
//! image through a list of transformations composed into one deformation
//! field. The adjoint operator scatters reference-grid data back onto the
//! floating grid with the same interpolation weights, so that
//! `<forward(x), y> == <x, adjoint(y)>` up to rounding.

pub mod adjoint;
pub mod cache;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod forward;
pub mod kernel;
pub mod reconcile;
pub mod validation;

pub use adjoint::{resample_adjoint, ControlPointTransformation, SplatPlan};
pub use cache::{AdjointWeights, CacheState};
pub use compose::compose;
pub use config::{Interpolation, ResampleConfig, TransformDirection};
pub use engine::{ResampleEngine, ResamplingContext};
pub use error::{ResampleError, Result};
pub use forward::resample_forward;
pub use reconcile::{ImageHandle, ImageSource};
pub use validation::GeometryCheck;
