//! Trilinear interpolation on burn tensors.
//!
//! Indices outside the volume are clamped to the border, so a dense field
//! sampled off its lattice extends its edge values.

use burn::tensor::{Tensor, Int};
use burn::tensor::backend::Backend;
use serde::{Serialize, Deserialize};
use super::trait_::Interpolator;

/// Linear Interpolator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

/// Lower corner, upper corner and fraction along one axis of length `n`.
fn axis_bounds<B: Backend>(
    coord: Tensor<B, 1>,
    n: usize,
) -> (Tensor<B, 1, Int>, Tensor<B, 1, Int>, Tensor<B, 1>) {
    let upper_limit = (n - 1) as f64;
    // Fractions are taken against the clamped floor so that positions
    // beyond the border reproduce the border value.
    let coord = coord.clamp(0.0, upper_limit);
    let lower = coord.clone().floor();
    let fraction = coord - lower.clone();
    let upper = (lower.clone() + 1.0).clamp(0.0, upper_limit);
    (lower.int(), upper.int(), fraction)
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [nz, ny, nx] = data.dims();
        let flat = data.clone().reshape([nz * ny * nx]);

        let column = |axis: usize| indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
        let (x0, x1, fx) = axis_bounds(column(0), nx);
        let (y0, y1, fy) = axis_bounds(column(1), ny);
        let (z0, z1, fz) = axis_bounds(column(2), nz);

        let mut result: Option<Tensor<B, 1>> = None;
        for corner in 0..8 {
            let (xi, wx) = if corner & 1 == 0 { (&x0, fx.clone().neg() + 1.0) } else { (&x1, fx.clone()) };
            let (yi, wy) = if corner & 2 == 0 { (&y0, fy.clone().neg() + 1.0) } else { (&y1, fy.clone()) };
            let (zi, wz) = if corner & 4 == 0 { (&z0, fz.clone().neg() + 1.0) } else { (&z1, fz.clone()) };

            // [Z, Y, X] layout, x fastest
            let offset = zi.clone() * (ny * nx) as i32 + yi.clone() * nx as i32 + xi.clone();
            let term = flat.clone().gather(0, offset) * wx * wy * wz;
            result = Some(match result {
                Some(sum) => sum + term,
                None => term,
            });
        }
        result.unwrap_or_else(|| Tensor::zeros([indices.dims()[0]], &indices.device()))
    }
}
