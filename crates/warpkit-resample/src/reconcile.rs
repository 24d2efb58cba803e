//! Conversion of caller-supplied images into canonical images.
//!
//! The engine accepts either an [`Image`] it can use as-is, or any foreign
//! representation implementing [`ImageSource`], which is copied once into a
//! canonical image. The caller's image is never modified.

use std::sync::Arc;
use burn::tensor::backend::Backend;
use warpkit_core::image::{Image, ImageGeometry, IntensityMetadata};
use warpkit_core::spatial::{Direction, Point, Spacing};
use crate::error::{ResampleError, Result};

/// A volume held in some other representation.
///
/// Sizes and coordinates are in index order (`x` first); voxels are
/// returned with `x` varying fastest.
pub trait ImageSource {
    /// Number of voxels along x, y and z.
    fn dims(&self) -> [usize; 3];

    /// Voxel spacing, if the source records one.
    fn spacing(&self) -> Option<[f64; 3]>;

    fn origin(&self) -> [f64; 3];

    /// Row-major orientation matrix; column `i` is the direction of index axis `i`.
    fn direction(&self) -> [[f64; 3]; 3];

    /// Copy of the voxel values.
    fn voxels(&self) -> Vec<f32>;

    fn intensity(&self) -> IntensityMetadata {
        IntensityMetadata::default()
    }
}

/// An image as handed to the engine.
#[derive(Clone)]
pub enum ImageHandle<B: Backend> {
    Canonical(Arc<Image<B, 3>>),
    External(Arc<dyn ImageSource + Send + Sync>),
}

impl<B: Backend> ImageHandle<B> {
    /// Wrap a foreign image.
    pub fn external<S>(source: S) -> Self
    where
        S: ImageSource + Send + Sync + 'static,
    {
        Self::External(Arc::new(source))
    }
}

impl<B: Backend> std::fmt::Debug for ImageHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canonical(image) => f.debug_tuple("Canonical").field(&image.shape()).finish(),
            Self::External(source) => f.debug_tuple("External").field(&source.dims()).finish(),
        }
    }
}

impl<B: Backend> From<Image<B, 3>> for ImageHandle<B> {
    fn from(image: Image<B, 3>) -> Self {
        Self::Canonical(Arc::new(image))
    }
}

impl<B: Backend> From<Arc<Image<B, 3>>> for ImageHandle<B> {
    fn from(image: Arc<Image<B, 3>>) -> Self {
        Self::Canonical(image)
    }
}

/// Produce a canonical image for `handle`.
///
/// Canonical handles share the caller's allocation; external handles are copied
/// onto `device`.
pub fn reconcile<B: Backend>(handle: &ImageHandle<B>, device: &B::Device) -> Result<Arc<Image<B, 3>>> {
    match handle {
        ImageHandle::Canonical(image) => {
            image
                .geometry()
                .validate()
                .map_err(|e| ResampleError::geometry_conversion(e.to_string()))?;
            Ok(Arc::clone(image))
        }
        ImageHandle::External(source) => convert_external(source.as_ref(), device).map(Arc::new),
    }
}

fn convert_external<B: Backend>(source: &(dyn ImageSource + Send + Sync), device: &B::Device) -> Result<Image<B, 3>> {
    let [nx, ny, nz] = source.dims();
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(ResampleError::geometry_conversion(format!(
            "zero-sized dimension in {:?}",
            [nx, ny, nz]
        )));
    }

    let spacing = source
        .spacing()
        .ok_or_else(|| ResampleError::geometry_conversion("source has no voxel spacing"))?;

    let geometry = ImageGeometry::new(
        [nz, ny, nx],
        Point::new(source.origin()),
        Spacing::new(spacing),
        Direction::from_rows(source.direction()),
    );
    geometry
        .validate()
        .map_err(|e| ResampleError::geometry_conversion(e.to_string()))?;

    let voxels = source.voxels();
    if voxels.len() != geometry.num_voxels() {
        return Err(ResampleError::geometry_conversion(format!(
            "expected {} voxels, source provided {}",
            geometry.num_voxels(),
            voxels.len()
        )));
    }

    tracing::debug!(dims = ?[nx, ny, nz], "converted external image");
    Ok(Image::from_voxels(voxels, geometry, device)?.with_intensity(source.intensity()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use warpkit_core::image::PixelType;

    type Backend = NdArray<f32>;

    struct RawVolume {
        dims: [usize; 3],
        spacing: Option<[f64; 3]>,
        direction: [[f64; 3]; 3],
        voxels: Vec<f32>,
    }

    impl RawVolume {
        fn new(dims: [usize; 3]) -> Self {
            let count = dims.iter().product();
            Self {
                dims,
                spacing: Some([1.0, 2.0, 3.0]),
                direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                voxels: (0..count).map(|v| v as f32).collect(),
            }
        }
    }

    impl ImageSource for RawVolume {
        fn dims(&self) -> [usize; 3] {
            self.dims
        }
        fn spacing(&self) -> Option<[f64; 3]> {
            self.spacing
        }
        fn origin(&self) -> [f64; 3] {
            [5.0, 0.0, -5.0]
        }
        fn direction(&self) -> [[f64; 3]; 3] {
            self.direction
        }
        fn voxels(&self) -> Vec<f32> {
            self.voxels.clone()
        }
        fn intensity(&self) -> IntensityMetadata {
            IntensityMetadata::default().with_pixel_type(PixelType::Int16)
        }
    }

    #[test]
    fn test_canonical_is_shared() {
        let device = Default::default();
        let image = Arc::new(Image::<Backend, 3>::zeros(ImageGeometry::from_shape([2, 2, 2]), &device));
        let handle = ImageHandle::from(Arc::clone(&image));
        let canonical = reconcile(&handle, &device).unwrap();
        assert!(Arc::ptr_eq(&image, &canonical));
    }

    #[test]
    fn test_external_is_copied_with_geometry() {
        let device = Default::default();
        let handle = ImageHandle::<Backend>::external(RawVolume::new([4, 3, 2]));
        let image = reconcile(&handle, &device).unwrap();
        assert_eq!(image.shape(), [2, 3, 4]);
        assert_eq!(image.spacing().to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(image.origin().to_array(), [5.0, 0.0, -5.0]);
        assert_eq!(image.to_voxels().unwrap()[5], 5.0);
        assert_eq!(image.intensity().pixel_type, PixelType::Int16);
    }

    #[test]
    fn test_external_without_spacing_fails() {
        let device = Default::default();
        let mut raw = RawVolume::new([2, 2, 2]);
        raw.spacing = None;
        let err = reconcile(&ImageHandle::<Backend>::external(raw), &device).unwrap_err();
        assert!(matches!(err, ResampleError::GeometryConversion(_)));
    }

    #[test]
    fn test_external_degenerate_inputs_fail() {
        let device = Default::default();

        let zero = RawVolume::new([0, 2, 2]);
        assert!(matches!(
            reconcile(&ImageHandle::<Backend>::external(zero), &device),
            Err(ResampleError::GeometryConversion(_))
        ));

        let mut negative = RawVolume::new([2, 2, 2]);
        negative.spacing = Some([1.0, -1.0, 1.0]);
        assert!(reconcile(&ImageHandle::<Backend>::external(negative), &device).is_err());

        let mut singular = RawVolume::new([2, 2, 2]);
        singular.direction = [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(reconcile(&ImageHandle::<Backend>::external(singular), &device).is_err());

        let mut short = RawVolume::new([2, 2, 2]);
        short.voxels.pop();
        assert!(matches!(
            reconcile(&ImageHandle::<Backend>::external(short), &device),
            Err(ResampleError::GeometryConversion(_))
        ));
    }
}
