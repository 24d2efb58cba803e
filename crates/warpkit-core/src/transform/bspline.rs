//! Cubic B-spline transform over a control-point lattice.
//!
//! The lattice is an [`ImageGeometry`]: control point `(i, j, k)` sits at the
//! physical position of voxel `(i, j, k)` of that geometry. Coefficients are
//! either displacements added to the input point, or absolute positions.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::image::ImageGeometry;
use super::deformation_field::DeformationField;
use super::trait_::Transform;

/// How control-point coefficients are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoefficientKind {
    /// `T(x) = x + Σ w c`
    #[default]
    Displacement,
    /// `T(x) = Σ w c`
    Position,
}

/// B-Spline Transform (Free-form deformation).
#[derive(Debug, Clone)]
pub struct BSplineTransform<B: Backend> {
    lattice: ImageGeometry<3>,
    /// One row per control point in memory order, `[num_control_points, 3]`
    coefficients: Tensor<B, 2>,
    kind: CoefficientKind,
}

impl<B: Backend> BSplineTransform<B> {
    /// Create a B-spline transform on `lattice`.
    pub fn new(lattice: ImageGeometry<3>, coefficients: Tensor<B, 2>, kind: CoefficientKind) -> Result<Self> {
        lattice.validate()?;
        check_coefficients(&lattice, &coefficients)?;
        Ok(Self {
            lattice,
            coefficients,
            kind,
        })
    }

    /// Zero displacement on `lattice`.
    pub fn zeros(lattice: ImageGeometry<3>, device: &B::Device) -> Result<Self> {
        let coefficients = Tensor::zeros([lattice.num_voxels(), 3], device);
        Self::new(lattice, coefficients, CoefficientKind::Displacement)
    }

    /// Use the positions of a dense field directly as coefficients.
    pub fn from_deformation(field: &DeformationField<B>) -> Result<Self> {
        Self::new(field.geometry().clone(), field.points(), CoefficientKind::Position)
    }

    pub fn lattice(&self) -> &ImageGeometry<3> {
        &self.lattice
    }

    /// Get the coefficients.
    pub fn coefficients(&self) -> Tensor<B, 2> {
        self.coefficients.clone()
    }

    pub fn kind(&self) -> CoefficientKind {
        self.kind
    }

    /// Replace the coefficients, keeping lattice and kind.
    pub fn set_coefficients(&mut self, coefficients: Tensor<B, 2>) -> Result<()> {
        check_coefficients(&self.lattice, &coefficients)?;
        self.coefficients = coefficients;
        Ok(())
    }

    /// Evaluate at every voxel of `grid`.
    pub fn evaluate_at_grid(&self, grid: &ImageGeometry<3>) -> Result<DeformationField<B>> {
        let points = grid.physical_grid::<B>(&self.coefficients.device());
        let mapped = self.transform_points(points)?;
        DeformationField::from_points(mapped, grid.clone())
    }

    /// Cubic B-spline basis stacked as `[Batch, 4]`, for `u` in `[0, 1)`.
    fn compute_basis_tensor(u: Tensor<B, 1>) -> Tensor<B, 2> {
        // B0 = (1-u)^3 / 6
        let one_minus_u = u.clone().neg().add_scalar(1.0);
        let b0 = one_minus_u.powf_scalar(3.0) / 6.0;

        // B1 = (3u^3 - 6u^2 + 4) / 6
        let u2 = u.clone().powf_scalar(2.0);
        let u3 = u.clone().powf_scalar(3.0);
        let b1 = (u3.clone().mul_scalar(3.0) - u2.clone().mul_scalar(6.0)).add_scalar(4.0) / 6.0;

        // B2 = (-3u^3 + 3u^2 + 3u + 1) / 6
        let b2 = (u3.clone().mul_scalar(-3.0) + u2.mul_scalar(3.0) + u.mul_scalar(3.0)).add_scalar(1.0) / 6.0;

        // B3 = u^3 / 6
        let b3 = u3 / 6.0;

        Tensor::cat(
            vec![
                b0.unsqueeze_dim::<2>(1),
                b1.unsqueeze_dim::<2>(1),
                b2.unsqueeze_dim::<2>(1),
                b3.unsqueeze_dim::<2>(1),
            ],
            1,
        )
    }

    fn weighted_sum(&self, grid_coords: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = grid_coords.device();
        let batch_size = grid_coords.dims()[0];

        let grid_indices_float = grid_coords.clone().floor();
        let u_vec = grid_coords - grid_indices_float.clone();
        let base_index = grid_indices_float.int() - 1;

        let ux = u_vec.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let uy = u_vec.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let uz = u_vec.narrow(1, 2, 1).squeeze::<1>(1);

        let bx = Self::compute_basis_tensor(ux);
        let by = Self::compute_basis_tensor(uy);
        let bz = Self::compute_basis_tensor(uz);

        // W[b, i, j, k] = Bx[b, i] * By[b, j] * Bz[b, k]
        let weights = bx.unsqueeze_dim::<3>(2).unsqueeze_dim::<4>(3)
            * by.unsqueeze_dim::<3>(1).unsqueeze_dim::<4>(3)
            * bz.unsqueeze_dim::<3>(1).unsqueeze_dim::<4>(1);
        let weights = weights.reshape([batch_size, 64, 1]);

        let [nx, ny, nz] = self.lattice.index_dims().map(|n| n as i32);

        let range = Tensor::<B, 1, Int>::from_ints([0, 1, 2, 3], &device);
        let i_idx = range.clone().reshape([1, 4, 1, 1]);
        let j_idx = range.clone().reshape([1, 1, 4, 1]);
        let k_idx = range.reshape([1, 1, 1, 4]);

        let base_x = base_index.clone().narrow(1, 0, 1).unsqueeze_dim::<3>(2).unsqueeze_dim::<4>(3);
        let base_y = base_index.clone().narrow(1, 1, 1).unsqueeze_dim::<3>(2).unsqueeze_dim::<4>(3);
        let base_z = base_index.narrow(1, 2, 1).unsqueeze_dim::<3>(2).unsqueeze_dim::<4>(3);

        // Broadcast [Batch, 4, 1, 1] etc. to [Batch, 4, 4, 4] by adding zeros
        let zeros = Tensor::<B, 4, Int>::zeros([1, 4, 4, 4], &device);
        let idx_x = (base_x + i_idx + zeros.clone()).reshape([batch_size, 64]).clamp(0, nx - 1);
        let idx_y = (base_y + j_idx + zeros.clone()).reshape([batch_size, 64]).clamp(0, ny - 1);
        let idx_z = (base_z + k_idx + zeros).reshape([batch_size, 64]).clamp(0, nz - 1);

        let flat_indices = idx_z * (nx * ny) + idx_y * nx + idx_x;
        let coeffs = self
            .coefficients
            .clone()
            .select(0, flat_indices.reshape([batch_size * 64]))
            .reshape([batch_size, 64, 3]);

        (coeffs * weights).sum_dim(1).squeeze::<2>(1)
    }
}

impl<B: Backend> Transform<B, 3> for BSplineTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let grid_coords = self.lattice.world_to_index_tensor(points.clone())?;
        let sum = self.weighted_sum(grid_coords);
        Ok(match self.kind {
            CoefficientKind::Displacement => points + sum,
            CoefficientKind::Position => sum,
        })
    }
}

fn check_coefficients<B: Backend>(lattice: &ImageGeometry<3>, coefficients: &Tensor<B, 2>) -> Result<()> {
    let [n, c] = coefficients.dims();
    if c != 3 {
        return Err(ImageError::invalid_transformation(format!(
            "control points must have 3 components, got {c}"
        )));
    }
    if n != lattice.num_voxels() {
        return Err(ImageError::ShapeMismatch {
            expected: vec![lattice.num_voxels(), 3],
            actual: vec![n, c],
        });
    }
    Ok(())
}
