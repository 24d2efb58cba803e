//! Dense deformation fields.
//!
//! A deformation field stores, for every voxel of its grid, the physical
//! position that voxel maps to. It is the common currency of the resampling
//! engine: every transformation can be evaluated into one, and a list of
//! transformations is composed into a single field.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::{Image, ImageGeometry};
use crate::interpolation::{Interpolator, LinearInterpolator};
use super::displacement_field::DisplacementFieldTransform;
use super::trait_::Transform;

/// Per-voxel physical positions, `[3, Z, Y, X]`, on `geometry`.
///
/// Component 0 is the x coordinate. Evaluated between voxels with trilinear
/// interpolation; beyond the grid the border vectors are extended.
#[derive(Debug, Clone)]
pub struct DeformationField<B: Backend> {
    data: Tensor<B, 4>,
    geometry: ImageGeometry<3>,
}

impl<B: Backend> DeformationField<B> {
    /// Wrap a `[3, Z, Y, X]` tensor of positions.
    pub fn new(data: Tensor<B, 4>, geometry: ImageGeometry<3>) -> Result<Self> {
        check_field_shape(&data, &geometry)?;
        Ok(Self { data, geometry })
    }

    /// Build from one row of positions per voxel, `[N, 3]` in memory order.
    pub fn from_points(points: Tensor<B, 2>, geometry: ImageGeometry<3>) -> Result<Self> {
        let [n, c] = points.dims();
        if n != geometry.num_voxels() || c != 3 {
            return Err(ImageError::ShapeMismatch {
                expected: vec![geometry.num_voxels(), 3],
                actual: vec![n, c],
            });
        }
        let [z, y, x] = geometry.shape();
        let data = points.transpose().reshape([3, z, y, x]);
        Ok(Self { data, geometry })
    }

    /// Field mapping every voxel of `geometry` to its own physical position.
    pub fn identity(geometry: ImageGeometry<3>, device: &B::Device) -> Self {
        let [z, y, x] = geometry.shape();
        let data = geometry.physical_grid::<B>(device).transpose().reshape([3, z, y, x]);
        Self { data, geometry }
    }

    /// Identity field on the grid of `image`.
    pub fn identity_like(image: &Image<B, 3>) -> Self {
        Self::identity(image.geometry().clone(), &image.device())
    }

    /// Assemble from three scalar images holding the x, y and z coordinates.
    pub fn from_components(components: [&Image<B, 3>; 3]) -> Result<Self> {
        let geometry = components[0].geometry().clone();
        for other in &components[1..] {
            if let Some(reason) = geometry.mismatch(other.geometry(), 1e-6) {
                return Err(ImageError::invalid_geometry(format!(
                    "field components disagree: {reason}"
                )));
            }
        }
        let data = Tensor::stack(components.iter().map(|c| c.data().clone()).collect(), 0);
        Ok(Self { data, geometry })
    }

    pub(crate) fn from_parts(data: Tensor<B, 4>, geometry: ImageGeometry<3>) -> Self {
        Self { data, geometry }
    }

    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    pub fn geometry(&self) -> &ImageGeometry<3> {
        &self.geometry
    }

    /// Positions as one row per voxel, `[N, 3]` in memory order.
    pub fn points(&self) -> Tensor<B, 2> {
        self.data.clone().reshape([3, self.geometry.num_voxels()]).transpose()
    }

    /// One coordinate of the field as a scalar image.
    pub fn component(&self, axis: usize) -> Result<Image<B, 3>> {
        check_axis(axis)?;
        let component = self.data.clone().narrow(0, axis, 1).reshape(self.geometry.shape());
        Image::from_geometry(component, self.geometry.clone())
    }

    /// Negate one coordinate of the field.
    pub fn flip_component(&mut self, axis: usize) -> Result<()> {
        check_axis(axis)?;
        let mut signs = vec![1.0f32; 3];
        signs[axis] = -1.0;
        let signs = Tensor::<B, 4>::from_data(TensorData::new(signs, [3, 1, 1, 1]), &self.data.device());
        self.data = self.data.clone() * signs;
        Ok(())
    }

    /// Subtract the identity: positions become offsets.
    pub fn to_displacement(&self) -> DisplacementFieldTransform<B> {
        let identity = Self::identity(self.geometry.clone(), &self.data.device());
        DisplacementFieldTransform::from_parts(self.data.clone() - identity.data, self.geometry.clone())
    }

    /// Copy the positions to host memory, component-major (`[3, Z, Y, X]`).
    pub fn to_voxels(&self) -> Result<Vec<f32>> {
        self.data
            .to_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ImageError::data(format!("{e:?}")))
    }
}

impl<B: Backend> Transform<B, 3> for DeformationField<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let indices = self.geometry.world_to_index_tensor(points)?;
        Ok(LinearInterpolator.interpolate_components(&self.data, indices))
    }
}

pub(crate) fn check_field_shape<B: Backend>(data: &Tensor<B, 4>, geometry: &ImageGeometry<3>) -> Result<()> {
    let [c, z, y, x] = data.dims();
    if c != 3 {
        return Err(ImageError::invalid_transformation(format!(
            "vector field must have 3 components, got {c}"
        )));
    }
    if [z, y, x] != geometry.shape() {
        return Err(ImageError::ShapeMismatch {
            expected: geometry.shape().to_vec(),
            actual: vec![z, y, x],
        });
    }
    Ok(())
}

fn check_axis(axis: usize) -> Result<()> {
    if axis >= 3 {
        return Err(ImageError::invalid_transformation(format!(
            "field component {axis} out of range"
        )));
    }
    Ok(())
}
