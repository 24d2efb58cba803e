//! Direction type for representing image orientation.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Direction matrix representing image orientation.
///
/// Column `i` is the direction of the i-th image axis in physical space.
/// Thin wrapper around nalgebra's `SMatrix`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Create from row-major entries.
    pub fn from_rows(rows: [[f64; D]; D]) -> Self {
        Self(SMatrix::from_fn(|r, c| rows[r][c]))
    }

    /// Row-major entries.
    pub fn to_rows(&self) -> [[f64; D]; D] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.0[(r, c)]))
    }

    /// Check if the direction matrix is orthogonal.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = SMatrix::<f64, D, D>::identity();
        (product - identity).abs().max() < 1e-6
    }

    /// Determinant of the matrix.
    pub fn determinant(&self) -> f64 {
        determinant(&self.0)
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Largest entry-wise absolute difference to `other`.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        (self.0 - other.0).abs().max()
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

/// Determinant of a static square matrix.
///
/// nalgebra only provides `determinant` for dimensions it can map to type-level
/// numbers, so generic `D` goes through cofactor expansion (D <= 3) or
/// elimination with partial pivoting.
pub(crate) fn determinant<const D: usize>(m: &SMatrix<f64, D, D>) -> f64 {
    match D {
        0 => 1.0,
        1 => m[(0, 0)],
        2 => m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        3 => {
            m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
        }
        _ => {
            let mut m = *m;
            let mut det = 1.0;
            for i in 0..D {
                let pivot = (i..D)
                    .max_by(|&a, &b| m[(a, i)].abs().total_cmp(&m[(b, i)].abs()))
                    .unwrap_or(i);
                if m[(pivot, i)] == 0.0 {
                    return 0.0;
                }
                if pivot != i {
                    m.swap_rows(i, pivot);
                    det = -det;
                }
                det *= m[(i, i)];
                for r in (i + 1)..D {
                    let factor = m[(r, i)] / m[(i, i)];
                    for c in i..D {
                        m[(r, c)] -= factor * m[(i, c)];
                    }
                }
            }
            det
        }
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
