//! Geometry comparison utilities.
//!
//! Operator inputs must live on the grid the operator was set up for. How a
//! mismatch is handled is a policy choice of the caller.

use serde::{Deserialize, Serialize};
use warpkit_core::image::{Image, ImageGeometry};
use burn::tensor::backend::Backend;
use crate::error::{ResampleError, Result};

/// Policy for grid mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryCheck {
    /// Fail with `IncompatibleGeometry`.
    #[default]
    Strict,
    /// Log a warning and continue.
    Tolerant,
}

/// Check that `actual` matches `expected` within `tolerance`.
///
/// `role` names the input in the error message.
pub fn check_geometry(
    expected: &ImageGeometry<3>,
    actual: &ImageGeometry<3>,
    tolerance: f64,
    policy: GeometryCheck,
    role: &str,
) -> Result<()> {
    let Some(reason) = expected.mismatch(actual, tolerance) else {
        return Ok(());
    };

    // A different voxel count cannot be resampled under any policy.
    if expected.shape() != actual.shape() {
        return Err(ResampleError::incompatible_geometry(format!("{role}: {reason}")));
    }

    match policy {
        GeometryCheck::Strict => Err(ResampleError::incompatible_geometry(format!("{role}: {reason}"))),
        GeometryCheck::Tolerant => {
            tracing::warn!(role, %reason, "geometry mismatch tolerated");
            Ok(())
        }
    }
}

/// Check that an image lives on `expected`.
pub fn check_image<B: Backend>(
    image: &Image<B, 3>,
    expected: &ImageGeometry<3>,
    tolerance: f64,
    policy: GeometryCheck,
    role: &str,
) -> Result<()> {
    check_geometry(expected, image.geometry(), tolerance, policy, role)
}
