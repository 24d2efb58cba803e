//! Dense displacement field transform.
//!
//! Each voxel of the field's grid carries an offset; a point is mapped to
//! itself plus the offset interpolated at its position.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::ImageGeometry;
use crate::interpolation::{Interpolator, LinearInterpolator};
use super::deformation_field::{check_field_shape, DeformationField};
use super::trait_::Transform;

/// Dense displacement field for 3D volumes.
///
/// The displacement field has shape `[3, Z, Y, X]` and lives on `geometry`.
#[derive(Debug, Clone)]
pub struct DisplacementFieldTransform<B: Backend> {
    displacement: Tensor<B, 4>,
    geometry: ImageGeometry<3>,
}

impl<B: Backend> DisplacementFieldTransform<B> {
    /// Create a displacement field transform.
    ///
    /// # Arguments
    /// * `displacement` - Tensor of shape `[3, Z, Y, X]` containing offsets
    /// * `geometry` - Grid the offsets are sampled on
    pub fn new(displacement: Tensor<B, 4>, geometry: ImageGeometry<3>) -> Result<Self> {
        check_field_shape(&displacement, &geometry)?;
        Ok(Self::from_parts(displacement, geometry))
    }

    pub(crate) fn from_parts(displacement: Tensor<B, 4>, geometry: ImageGeometry<3>) -> Self {
        Self {
            displacement,
            geometry,
        }
    }

    /// Zero displacement on `geometry`.
    pub fn zeros(geometry: ImageGeometry<3>, device: &B::Device) -> Self {
        let [z, y, x] = geometry.shape();
        Self::from_parts(Tensor::zeros([3, z, y, x], device), geometry)
    }

    /// Get the displacement field.
    pub fn displacement(&self) -> Tensor<B, 4> {
        self.displacement.clone()
    }

    pub fn geometry(&self) -> &ImageGeometry<3> {
        &self.geometry
    }

    /// Add the identity: offsets become positions.
    pub fn to_deformation(&self) -> DeformationField<B> {
        let identity = DeformationField::identity(self.geometry.clone(), &self.displacement.device());
        let data = identity.data().clone() + self.displacement.clone();
        DeformationField::from_parts(data, self.geometry.clone())
    }
}

impl<B: Backend> Transform<B, 3> for DisplacementFieldTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let indices = self.geometry.world_to_index_tensor(points.clone())?;
        let offsets = LinearInterpolator.interpolate_components(&self.displacement, indices);
        Ok(points + offsets)
    }
}
