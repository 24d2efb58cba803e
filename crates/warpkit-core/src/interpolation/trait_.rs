//! Interpolator trait for sampling volumes at continuous indices.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a volume at continuous indices.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate a `[Z, Y, X]` volume at `indices` `[Batch, 3]` given as `(x, y, z)`.
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;

    /// Interpolate every component of a `[C, Z, Y, X]` field.
    ///
    /// # Returns
    /// Tensor of sampled vectors `[Batch, C]`
    fn interpolate_components(&self, field: &Tensor<B, 4>, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let [c, z, y, x] = field.dims();
        let samples: Vec<Tensor<B, 1>> = (0..c)
            .map(|i| {
                let component = field.clone().narrow(0, i, 1).reshape([z, y, x]);
                self.interpolate(&component, indices.clone())
            })
            .collect();
        Tensor::stack(samples, 1)
    }
}
