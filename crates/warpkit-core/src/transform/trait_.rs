//! Transform trait for spatial coordinate transformations.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::error::Result;

/// Maps points from one physical space to another.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality
pub trait Transform<B: Backend, const D: usize> {
    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, D]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, D]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>>;
}
