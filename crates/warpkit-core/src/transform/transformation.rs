//! The closed set of transformations accepted by the resampling engine.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::ImageGeometry;
use super::affine::AffineTransform;
use super::bspline::BSplineTransform;
use super::deformation_field::DeformationField;
use super::displacement_field::DisplacementFieldTransform;
use super::trait_::Transform;

/// A spatial transformation in physical space.
#[derive(Debug, Clone)]
pub enum Transformation<B: Backend> {
    Identity,
    /// Rigid or affine map.
    Affine(AffineTransform<3>),
    /// Dense field of absolute positions.
    Deformation(DeformationField<B>),
    /// Dense field of offsets.
    Displacement(DisplacementFieldTransform<B>),
    /// Control-point lattice.
    BSpline(BSplineTransform<B>),
}

impl<B: Backend> Transformation<B> {
    /// Short name for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Affine(_) => "affine",
            Self::Deformation(_) => "deformation",
            Self::Displacement(_) => "displacement",
            Self::BSpline(_) => "bspline",
        }
    }

    /// Reject degenerate transformation data.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Affine(affine) => affine.validate(),
            Self::Deformation(field) => field.geometry().validate(),
            Self::Displacement(field) => field.geometry().validate(),
            Self::BSpline(bspline) => bspline.lattice().validate(),
            Self::Identity => Ok(()),
        }
    }

    /// Evaluate at every voxel of `grid`, producing a dense field of positions.
    pub fn evaluate_at_grid(&self, grid: &ImageGeometry<3>, device: &B::Device) -> Result<DeformationField<B>> {
        match self {
            Self::Identity => Ok(DeformationField::identity(grid.clone(), device)),
            Self::BSpline(bspline) => bspline.evaluate_at_grid(grid),
            _ => {
                let points = grid.physical_grid::<B>(device);
                DeformationField::from_points(self.transform_points(points)?, grid.clone())
            }
        }
    }
}

impl<B: Backend> Transform<B, 3> for Transformation<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        match self {
            Self::Identity => Ok(points),
            Self::Affine(affine) => Transform::<B, 3>::transform_points(affine, points),
            Self::Deformation(field) => field.transform_points(points),
            Self::Displacement(field) => field.transform_points(points),
            Self::BSpline(bspline) => bspline.transform_points(points),
        }
    }
}

impl<B: Backend> From<AffineTransform<3>> for Transformation<B> {
    fn from(affine: AffineTransform<3>) -> Self {
        Self::Affine(affine)
    }
}

impl<B: Backend> From<DeformationField<B>> for Transformation<B> {
    fn from(field: DeformationField<B>) -> Self {
        Self::Deformation(field)
    }
}

impl<B: Backend> From<DisplacementFieldTransform<B>> for Transformation<B> {
    fn from(field: DisplacementFieldTransform<B>) -> Self {
        Self::Displacement(field)
    }
}

impl<B: Backend> From<BSplineTransform<B>> for Transformation<B> {
    fn from(bspline: BSplineTransform<B>) -> Self {
        Self::BSpline(bspline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Vector;
    use nalgebra::{SMatrix, SVector};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_affine_evaluates_on_grid() {
        let device = Default::default();
        let grid = ImageGeometry::<3>::from_shape([2, 2, 2]);
        let shift: Transformation<TestBackend> = AffineTransform::from_translation(Vector::new([1.0, 0.0, -2.0])).into();
        let field = shift.evaluate_at_grid(&grid, &device).unwrap();
        let x = field.component(0).unwrap().to_voxels().unwrap();
        let z = field.component(2).unwrap().to_voxels().unwrap();
        assert_eq!(&x[0..2], &[1.0, 2.0]);
        assert_eq!(z[0], -2.0);
        assert_eq!(z[7], -1.0);
    }

    #[test]
    fn test_identity_and_displacement_agree() {
        let device = Default::default();
        let grid = ImageGeometry::<3>::from_shape([2, 3, 2]);
        let identity = Transformation::<TestBackend>::Identity.evaluate_at_grid(&grid, &device).unwrap();
        let zero: Transformation<TestBackend> = DisplacementFieldTransform::zeros(grid.clone(), &device).into();
        let field = zero.evaluate_at_grid(&grid, &device).unwrap();
        assert_eq!(identity.to_voxels().unwrap(), field.to_voxels().unwrap());
    }

    #[test]
    fn test_validate_rejects_singular_affine() {
        let singular: Transformation<TestBackend> = AffineTransform::new(SMatrix::zeros(), SVector::zeros()).into();
        assert!(singular.validate().is_err());
        assert_eq!(singular.kind_name(), "affine");
        assert!(Transformation::<TestBackend>::Identity.validate().is_ok());
    }
}
