use burn::tensor::{Tensor, TensorData, Shape};
use burn::tensor::backend::Backend;

/// Continuous indices of every voxel of a grid, in memory order.
///
/// `shape` is given in tensor order (`[Z, Y, X]` in 3D). The result is a
/// `[N, D]` tensor whose rows are index-order coordinates (`x` first), with
/// `x` varying fastest.
pub fn generate_grid<B, const D: usize>(
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, 2>
where
    B: Backend,
{
    let grid = grid_indices(shape);
    let total = grid.len() / D.max(1);
    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * D])), device)
        .reshape([total, D])
}

/// Host-side version of [`generate_grid`], flattened `[N * D]`.
pub fn grid_indices<const D: usize>(shape: [usize; D]) -> Vec<f32> {
    let total: usize = shape.iter().product();
    let mut grid = Vec::with_capacity(total * D);
    let mut counter = [0usize; D];

    for _ in 0..total {
        // counter is in tensor order; emit it reversed
        for axis in (0..D).rev() {
            grid.push(counter[axis] as f32);
        }
        for axis in (0..D).rev() {
            counter[axis] += 1;
            if counter[axis] < shape[axis] {
                break;
            }
            counter[axis] = 0;
        }
    }

    grid
}
