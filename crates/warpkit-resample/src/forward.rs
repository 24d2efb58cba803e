//! Forward resampling: gather from the floating image onto the reference grid.

use burn::tensor::backend::Backend;
use rayon::prelude::*;
use warpkit_core::image::{Image, ImageGeometry};
use warpkit_core::transform::DeformationField;
use warpkit_core::ImageError;
use crate::config::Interpolation;
use crate::error::{ResampleError, Result};
use crate::kernel;

/// Continuous floating-image indices of every field position, `[N * 3]`.
pub fn field_to_indices<B: Backend>(
    floating: &ImageGeometry<3>,
    field: &DeformationField<B>,
) -> Result<Vec<f32>> {
    let indices = floating.world_to_index_tensor(field.points())?;
    indices
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ResampleError::from(ImageError::data(format!("{e:?}"))))
}

/// Resample `floating` at `positions` onto `output_geometry`.
///
/// `positions` holds one continuous floating index `(x, y, z)` per output
/// voxel, in memory order. Positions outside the floating image receive
/// `padding`. The output carries the floating image's intensity metadata.
pub fn resample_forward<B: Backend>(
    floating: &Image<B, 3>,
    positions: &[f32],
    output_geometry: &ImageGeometry<3>,
    interpolation: Interpolation,
    padding: f32,
) -> Result<Image<B, 3>> {
    if positions.len() != output_geometry.num_voxels() * 3 {
        return Err(ResampleError::incompatible_geometry(format!(
            "{} sample positions for {} output voxels",
            positions.len() / 3,
            output_geometry.num_voxels()
        )));
    }

    let voxels = floating.to_voxels()?;
    let dims = floating.geometry().index_dims();

    let output: Vec<f32> = positions
        .par_chunks_exact(3)
        .map(|p| {
            let index = [p[0] as f64, p[1] as f64, p[2] as f64];
            kernel::sample(interpolation, &voxels, dims, index)
                .map(|v| v as f32)
                .unwrap_or(padding)
        })
        .collect();

    let image = Image::from_voxels(output, output_geometry.clone(), &floating.device())?
        .with_intensity(floating.intensity().clone());
    Ok(image)
}
