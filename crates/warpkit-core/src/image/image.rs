//! Image type with physical geometry and intensity metadata.
//!
//! An `Image` pairs a voxel tensor with the [`ImageGeometry`] that places it in
//! physical space and the [`IntensityMetadata`] that interprets its values.
//! Geometry is fixed at construction; the payload may be replaced in place as
//! long as its shape is unchanged.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::geometry::ImageGeometry;
use crate::image::intensity::IntensityMetadata;
use crate::spatial::{Point, Spacing, Direction};

/// Volume with physical metadata.
///
/// # Type Parameters
/// * `B` - The backend for tensor operations
/// * `D` - The dimensionality of the image
///
/// # Examples
/// ```rust
/// use warpkit_core::Image;
/// use warpkit_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity());
/// assert_eq!(image.shape(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    geometry: ImageGeometry<D>,
    intensity: IntensityMetadata,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create an image whose grid size is taken from `data`.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        let geometry = ImageGeometry::new(data.dims(), origin, spacing, direction);
        Self {
            data,
            geometry,
            intensity: IntensityMetadata::default(),
        }
    }

    /// Create an image on an existing geometry. Fails if the shapes disagree.
    pub fn from_geometry(data: Tensor<B, D>, geometry: ImageGeometry<D>) -> Result<Self> {
        check_shape(&geometry, data.dims())?;
        Ok(Self {
            data,
            geometry,
            intensity: IntensityMetadata::default(),
        })
    }

    /// Create an image from flat voxels in memory order (`x` fastest).
    pub fn from_voxels(
        voxels: Vec<f32>,
        geometry: ImageGeometry<D>,
        device: &B::Device,
    ) -> Result<Self> {
        if voxels.len() != geometry.num_voxels() {
            return Err(ImageError::ShapeMismatch {
                expected: geometry.shape().to_vec(),
                actual: vec![voxels.len()],
            });
        }
        let data = Tensor::<B, D>::from_data(TensorData::new(voxels, geometry.shape()), device);
        Ok(Self {
            data,
            geometry,
            intensity: IntensityMetadata::default(),
        })
    }

    /// Image of zeros on `geometry`.
    pub fn zeros(geometry: ImageGeometry<D>, device: &B::Device) -> Self {
        Self::filled(geometry, 0.0, device)
    }

    /// Image with every voxel set to `value` on `geometry`.
    pub fn filled(geometry: ImageGeometry<D>, value: f32, device: &B::Device) -> Self {
        let data = Tensor::<B, D>::full(geometry.shape(), value, device);
        Self {
            data,
            geometry,
            intensity: IntensityMetadata::default(),
        }
    }

    /// Replace the intensity metadata.
    pub fn with_intensity(mut self, intensity: IntensityMetadata) -> Self {
        self.intensity = intensity;
        self
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    pub fn intensity(&self) -> &IntensityMetadata {
        &self.intensity
    }

    /// Get the origin (physical coordinate of first voxel).
    pub fn origin(&self) -> &Point<D> {
        self.geometry.origin()
    }

    /// Get the spacing (physical distance between voxels).
    pub fn spacing(&self) -> &Spacing<D> {
        self.geometry.spacing()
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        self.geometry.direction()
    }

    /// Get the image shape in tensor order.
    pub fn shape(&self) -> [usize; D] {
        self.geometry.shape()
    }

    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Replace the payload. The new tensor must have the same shape.
    pub fn set_data(&mut self, data: Tensor<B, D>) -> Result<()> {
        check_shape(&self.geometry, data.dims())?;
        self.data = data;
        Ok(())
    }

    /// Replace the payload from flat voxels in memory order.
    pub fn set_voxels(&mut self, voxels: Vec<f32>) -> Result<()> {
        if voxels.len() != self.geometry.num_voxels() {
            return Err(ImageError::ShapeMismatch {
                expected: self.geometry.shape().to_vec(),
                actual: vec![voxels.len()],
            });
        }
        let device = self.data.device();
        self.data = Tensor::from_data(TensorData::new(voxels, self.geometry.shape()), &device);
        Ok(())
    }

    /// Set every voxel to `value`.
    pub fn fill(&mut self, value: f32) {
        let device = self.data.device();
        self.data = Tensor::full(self.geometry.shape(), value, &device);
    }

    /// Copy the payload to host memory, `x` fastest.
    pub fn to_voxels(&self) -> Result<Vec<f32>> {
        self.data
            .to_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ImageError::data(format!("{e:?}")))
    }

    /// Convert a physical point to a continuous index.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Result<Point<D>> {
        self.geometry.physical_to_index(point)
    }

    /// Convert a continuous index to a physical point.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.geometry.index_to_physical(index)
    }

    /// Batch transform physical points `[N, D]` to continuous indices.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        self.geometry.world_to_index_tensor(points)
    }

    /// Batch transform continuous indices `[N, D]` to physical points.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        self.geometry.index_to_world_tensor(indices)
    }
}

fn check_shape<const D: usize>(geometry: &ImageGeometry<D>, actual: [usize; D]) -> Result<()> {
    if geometry.shape() != actual {
        return Err(ImageError::ShapeMismatch {
            expected: geometry.shape().to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::intensity::PixelType;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn geometry() -> ImageGeometry<3> {
        ImageGeometry::new(
            [2, 3, 4],
            Point::new([1.0, 2.0, 3.0]),
            Spacing::new([0.5, 1.0, 2.0]),
            Direction::identity(),
        )
    }

    #[test]
    fn test_from_voxels_roundtrip() {
        let device = Default::default();
        let voxels: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let image = Image::<Backend, 3>::from_voxels(voxels.clone(), geometry(), &device).unwrap();
        assert_eq!(image.shape(), [2, 3, 4]);
        assert_eq!(image.to_voxels().unwrap(), voxels);
    }

    #[test]
    fn test_from_voxels_rejects_wrong_length() {
        let device = Default::default();
        let result = Image::<Backend, 3>::from_voxels(vec![0.0; 10], geometry(), &device);
        assert!(matches!(result, Err(ImageError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_set_data_keeps_geometry() {
        let device = Default::default();
        let mut image = Image::<Backend, 3>::zeros(geometry(), &device);
        image.fill(2.5);
        assert!(image.to_voxels().unwrap().iter().all(|&v| v == 2.5));

        let wrong = Tensor::<Backend, 3>::zeros([2, 3, 5], &device);
        assert!(image.set_data(wrong).is_err());
        assert_eq!(image.geometry(), &geometry());
    }

    #[test]
    fn test_intensity_travels_with_clone() {
        let device = Default::default();
        let meta = IntensityMetadata::default().with_pixel_type(PixelType::Int16);
        let image = Image::<Backend, 3>::zeros(geometry(), &device).with_intensity(meta.clone());
        let copy = image.clone();
        assert_eq!(copy.intensity(), &meta);
    }

    #[test]
    fn test_physical_point_mapping() {
        let device = Default::default();
        let image = Image::<Backend, 3>::zeros(geometry(), &device);
        let point = image.transform_continuous_index_to_physical_point(&Point::new([2.0, 1.0, 1.0]));
        assert_eq!(point.to_array(), [2.0, 3.0, 5.0]);
        let index = image.transform_physical_point_to_continuous_index(&point).unwrap();
        assert!(index.max_abs_difference(&Point::new([2.0, 1.0, 1.0])) < 1e-12);
    }
}
