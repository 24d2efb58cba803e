//! Interpolation on burn tensors.
//!
//! Used to sample dense vector fields at arbitrary points. Image resampling
//! kernels live with the resampling engine.

pub mod trait_;
pub mod linear;

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
