//! Composition of a transformation list into one deformation field.

use burn::tensor::backend::Backend;
use warpkit_core::image::ImageGeometry;
use warpkit_core::transform::{DeformationField, Transform, Transformation};
use crate::error::Result;

/// Compose `transformations` on `grid`.
///
/// Each voxel's physical position is passed through the transformations in
/// list order; the final positions form the field. An empty list behaves as
/// the identity.
pub fn compose<B: Backend>(
    transformations: &[Transformation<B>],
    grid: &ImageGeometry<3>,
    device: &B::Device,
) -> Result<DeformationField<B>> {
    for transformation in transformations {
        transformation.validate()?;
    }

    match transformations {
        [] => {
            tracing::info!("no transformations set, using identity");
            Ok(DeformationField::identity(grid.clone(), device))
        }
        [single] => Ok(single.evaluate_at_grid(grid, device)?),
        _ => {
            let mut points = grid.physical_grid::<B>(device);
            for transformation in transformations {
                tracing::debug!(kind = transformation.kind_name(), "applying transformation");
                points = transformation.transform_points(points)?;
            }
            Ok(DeformationField::from_points(points, grid.clone())?)
        }
    }
}
