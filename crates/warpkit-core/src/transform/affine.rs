//! Affine transform implementation.
//!
//! An affine transform maps `x` to `A x + t`. Parameters live on the host
//! (nalgebra); points are mapped in batches on the tensor backend.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::{Rotation3, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::spatial::direction::determinant;
use crate::spatial::{Point, Vector};
use super::trait_::Transform;

/// Tolerance on the last row of a homogeneous matrix.
const HOMOGENEOUS_TOLERANCE: f64 = 1e-9;

/// Affine Transform (Linear transformation + Translation).
///
/// `T(x) = A x + t` where `A` is a D×D matrix (rotation, scale, shear) and
/// `t` a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: SVector<f64, D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create a new affine transform.
    pub fn new(matrix: SMatrix<f64, D, D>, translation: SVector<f64, D>) -> Self {
        Self { matrix, translation }
    }

    /// Create an identity affine transform.
    pub fn identity() -> Self {
        Self::new(SMatrix::identity(), SVector::zeros())
    }

    /// Pure translation.
    pub fn from_translation(offset: Vector<D>) -> Self {
        Self::new(SMatrix::identity(), offset.0)
    }

    /// `T(x) = A (x - c) + c + t`, folded into a plain affine map.
    pub fn with_center(matrix: SMatrix<f64, D, D>, translation: SVector<f64, D>, center: Point<D>) -> Self {
        let c = center.0.coords;
        Self::new(matrix, translation + c - matrix * c)
    }

    /// Get the transformation matrix.
    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    /// Get the translation vector.
    pub fn translation(&self) -> &SVector<f64, D> {
        &self.translation
    }

    /// Fail if the linear part cannot be inverted.
    pub fn validate(&self) -> Result<()> {
        let det = determinant(&self.matrix);
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return Err(ImageError::invalid_transformation(format!(
                "affine matrix is singular (determinant {det:.3e})"
            )));
        }
        Ok(())
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Result<Self> {
        self.validate()?;
        let inv = self
            .matrix
            .try_inverse()
            .ok_or_else(|| ImageError::invalid_transformation("affine matrix is singular"))?;
        Ok(Self::new(inv, -(inv * self.translation)))
    }

    /// `self` applied after `first`.
    pub fn then_after(&self, first: &Self) -> Self {
        Self::new(
            self.matrix * first.matrix,
            self.matrix * first.translation + self.translation,
        )
    }

    /// Map a single point.
    pub fn transform_point(&self, point: &Point<D>) -> Point<D> {
        let mapped = self.matrix * point.0.coords + self.translation;
        Point::new(std::array::from_fn(|i| mapped[i]))
    }
}

impl AffineTransform<3> {
    /// Rotation by Euler angles (radians, applied about x, then y, then z)
    /// followed by a translation.
    pub fn rigid(angles: [f64; 3], translation: Vector<3>) -> Self {
        let rotation = Rotation3::from_euler_angles(angles[0], angles[1], angles[2]);
        Self::new(*rotation.matrix(), translation.0)
    }

    /// Import a 4x4 homogeneous matrix (row-major).
    pub fn from_homogeneous(m: [[f64; 4]; 4]) -> Result<Self> {
        let last = m[3];
        let expected = [0.0, 0.0, 0.0, 1.0];
        if last
            .iter()
            .zip(expected.iter())
            .any(|(a, b)| (a - b).abs() > HOMOGENEOUS_TOLERANCE)
        {
            return Err(ImageError::invalid_transformation(format!(
                "last row of homogeneous matrix must be [0, 0, 0, 1], got {last:?}"
            )));
        }
        let matrix = SMatrix::<f64, 3, 3>::from_fn(|r, c| m[r][c]);
        let translation = SVector::<f64, 3>::new(m[0][3], m[1][3], m[2][3]);
        Ok(Self::new(matrix, translation))
    }

    /// Export as a 4x4 homogeneous matrix (row-major).
    pub fn to_homogeneous(&self) -> [[f64; 4]; 4] {
        let mut m = [[0.0; 4]; 4];
        for (r, row) in m.iter_mut().take(3).enumerate() {
            for (c, value) in row.iter_mut().take(3).enumerate() {
                *value = self.matrix[(r, c)];
            }
            row[3] = self.translation[r];
        }
        m[3][3] = 1.0;
        m
    }
}

impl<const D: usize> Default for AffineTransform<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let device = points.device();

        // Row vectors: y = x @ A^T + t
        let mut at = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                at.push(self.matrix[(c, r)] as f32);
            }
        }
        let a_t = Tensor::<B, 2>::from_data(TensorData::new(at, [D, D]), &device);
        let t: Vec<f32> = self.translation.iter().map(|&v| v as f32).collect();
        let t = Tensor::<B, 2>::from_data(TensorData::new(t, [1, D]), &device);

        Ok(points.matmul(a_t) + t)
    }
}
