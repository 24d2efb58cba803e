//! Voxel grid geometry.
//!
//! An `ImageGeometry` describes a voxel grid in physical space: its size,
//! the physical position of the first voxel, the voxel spacing and the
//! orientation of the index axes. It is the grid half of a canonical image and
//! the target grid handed to the transformation composer.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use crate::error::{ImageError, Result};
use crate::image::grid::generate_grid;
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Geometry of a D-dimensional voxel grid.
///
/// `shape` is stored in tensor order (slowest axis first, `[Z, Y, X]` in 3D),
/// while `origin`, `spacing`, `direction` and continuous indices use index
/// order (`x` first). The mapping between the two is
/// `point = origin + direction * (index ⊙ spacing)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    shape: [usize; D],
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<const D: usize> ImageGeometry<D> {
    /// Create a geometry. No validation is performed; see [`ImageGeometry::validate`].
    pub fn new(
        shape: [usize; D],
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            shape,
            origin,
            spacing,
            direction,
        }
    }

    /// Unit spacing, zero origin and identity orientation for `shape`.
    pub fn from_shape(shape: [usize; D]) -> Self {
        Self::new(shape, Point::origin(), Spacing::uniform(1.0), Direction::identity())
    }

    /// Grid size in tensor order (`[Z, Y, X]`).
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Grid size in index order (`[nx, ny, nz]`).
    pub fn index_dims(&self) -> [usize; D] {
        std::array::from_fn(|i| self.shape[D - 1 - i])
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.shape.iter().product()
    }

    /// Physical coordinate of the first voxel.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Physical distance between voxels along each index axis.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Orientation of the index axes.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Check the geometry describes a usable grid.
    pub fn validate(&self) -> Result<()> {
        if self.shape.iter().any(|&n| n == 0) {
            return Err(ImageError::invalid_geometry(format!(
                "zero-sized dimension in shape {:?}",
                self.shape
            )));
        }
        if !self.spacing.is_valid() {
            return Err(ImageError::invalid_geometry(format!(
                "spacing must be finite and positive, got {:?}",
                self.spacing.to_array()
            )));
        }
        if self.direction.try_inverse().is_none() {
            return Err(ImageError::invalid_geometry("direction matrix is singular"));
        }
        Ok(())
    }

    /// Compare size, origin, spacing and orientation within `tolerance`.
    ///
    /// Returns a description of the first mismatch, or `None` when compatible.
    pub fn mismatch(&self, other: &Self, tolerance: f64) -> Option<String> {
        if self.shape != other.shape {
            return Some(format!("shape {:?} vs {:?}", self.shape, other.shape));
        }
        let origin_diff = self.origin.max_abs_difference(&other.origin);
        if origin_diff > tolerance {
            return Some(format!(
                "origin {:?} vs {:?}",
                self.origin.to_array(),
                other.origin.to_array()
            ));
        }
        let spacing_diff = self.spacing.max_abs_difference(&other.spacing);
        if spacing_diff > tolerance {
            return Some(format!(
                "spacing {:?} vs {:?}",
                self.spacing.to_array(),
                other.spacing.to_array()
            ));
        }
        let direction_diff = self.direction.max_abs_difference(&other.direction);
        if direction_diff > tolerance {
            return Some(format!("direction differs by {direction_diff:.3e}"));
        }
        None
    }

    /// True if size, origin, spacing and orientation match within `tolerance`.
    pub fn is_compatible(&self, other: &Self, tolerance: f64) -> bool {
        self.mismatch(other, tolerance).is_none()
    }

    /// Convert a continuous index to a physical point.
    pub fn index_to_physical(&self, index: &Point<D>) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }

    /// Convert a physical point to a continuous index.
    ///
    /// `index = (Direction^-1 * (point - origin)) / spacing`
    pub fn physical_to_index(&self, point: &Point<D>) -> Result<Point<D>> {
        let inv_dir = self.inverse_direction()?;
        let rotated = inv_dir * (*point - self.origin);
        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        Ok(index)
    }

    /// Batch transform continuous indices `[N, D]` to physical points `[N, D]`.
    pub fn index_to_world_tensor<B: Backend>(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        let origin_tensor = self.origin_tensor::<B>(&device);

        // P = O + I @ M with M_rc = S_r * D_cr
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(TensorData::new(m_data, [D, D]), &device);

        indices.matmul(m_tensor) + origin_tensor
    }

    /// Batch transform physical points `[N, D]` to continuous indices `[N, D]`.
    pub fn world_to_index_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let device = points.device();
        let origin_tensor = self.origin_tensor::<B>(&device);
        let inv_dir = self.inverse_direction()?;

        // I = (P - O) @ T with T_rc = (D^-1)_cr / S_c
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(TensorData::new(t_data, [D, D]), &device);

        Ok((points - origin_tensor).matmul(t_tensor))
    }

    /// Physical position of every voxel, `[N, D]`, in memory order.
    pub fn physical_grid<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let indices = generate_grid::<B, D>(self.shape, device);
        self.index_to_world_tensor(indices)
    }

    fn inverse_direction(&self) -> Result<Direction<D>> {
        self.direction
            .try_inverse()
            .ok_or_else(|| ImageError::invalid_geometry("direction matrix is singular"))
    }

    fn origin_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin_vec: Vec<f32> = self.origin.to_f32().to_vec();
        Tensor::<B, 1>::from_data(TensorData::new(origin_vec, [D]), device).reshape([1, D])
    }
}
