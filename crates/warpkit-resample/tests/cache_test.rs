use std::sync::Arc;
use burn_ndarray::NdArray;
use warpkit_core::image::{Image, ImageGeometry};
use warpkit_core::spatial::Vector;
use warpkit_core::transform::AffineTransform;
use warpkit_resample::{
    CacheState, ImageHandle, ImageSource, Interpolation, ResampleEngine, ResampleError, TransformDirection,
};

type B = NdArray<f32>;

fn geometry() -> ImageGeometry<3> {
    ImageGeometry::from_shape([4, 4, 4])
}

fn engine() -> ResampleEngine<B> {
    let device = Default::default();
    let voxels = (0..64).map(|v| (v % 7) as f32).collect();
    let floating = Image::from_voxels(voxels, geometry(), &device).unwrap();

    let mut engine = ResampleEngine::new(device);
    engine.set_reference_image(Image::zeros(geometry(), &Default::default()));
    engine.set_floating_image(floating);
    engine.add_transformation(AffineTransform::from_translation(Vector::new([0.4, 0.1, -0.3])));
    engine
}

#[test]
fn test_repeated_process_composes_once() {
    let mut engine = engine();
    let first = engine.process().unwrap().to_voxels().unwrap();
    let second = engine.process().unwrap().to_voxels().unwrap();

    assert_eq!(engine.composition_count(), 1);
    assert_eq!(engine.state(), CacheState::ForwardReady);
    assert!(first.iter().zip(&second).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn test_adjoint_reuses_forward_setup() {
    let mut engine = engine();
    engine.process().unwrap();
    let generation = engine.generation();

    engine.set_adjoint_input(Image::filled(geometry(), 1.0, &Default::default()));
    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.state(), CacheState::ForwardReady);

    engine.set_direction(TransformDirection::Adjoint);
    engine.process().unwrap();
    assert_eq!(engine.state(), CacheState::AdjointReady);
    // Changing direction invalidates, so the field is composed a second time
    assert_eq!(engine.composition_count(), 2);

    engine.process().unwrap();
    let ones = Image::filled(geometry(), 1.0, &Default::default());
    engine.adjoint(&ones).unwrap();
    engine.forward(&ones).unwrap();
    assert_eq!(engine.composition_count(), 2);
    assert_eq!(engine.state(), CacheState::AdjointReady);
}

#[test]
fn test_changing_transformations_recomposes() {
    let mut engine = engine();
    let before = engine.process().unwrap().to_voxels().unwrap();

    engine.clear_transformations();
    engine.add_transformation(AffineTransform::from_translation(Vector::new([1.0, 0.0, 0.0])));
    assert_eq!(engine.state(), CacheState::Uninitialized);

    let after = engine.process().unwrap().to_voxels().unwrap();
    assert_eq!(engine.composition_count(), 2);
    assert_ne!(before, after);
    assert!(engine.deformation_field().is_some());
}

#[test]
fn test_option_setters_reset_cache() {
    let mut engine = engine();
    engine.process().unwrap();

    let generation = engine.generation();
    engine.set_interpolation(Interpolation::Cubic);
    assert_eq!(engine.state(), CacheState::Uninitialized);
    assert!(engine.generation() > generation);

    engine.process().unwrap();
    engine.set_padding_value(3.0);
    assert_eq!(engine.state(), CacheState::Uninitialized);
    assert!(engine.deformation_field().is_none());

    engine.process().unwrap();
    assert_eq!(engine.composition_count(), 3);
}

#[test]
fn test_missing_images_are_reported() {
    let mut engine = ResampleEngine::<B>::new(Default::default());
    engine.set_reference_image(Image::zeros(geometry(), &Default::default()));
    let err = engine.process().unwrap_err();
    assert!(matches!(err, ResampleError::UninitializedContext(_)));
    assert!(err.to_string().contains("floating"));

    let mut engine = ResampleEngine::<B>::new(Default::default());
    engine.set_floating_image(Image::zeros(geometry(), &Default::default()));
    let err = engine.process().unwrap_err();
    assert!(err.to_string().contains("reference"));
    assert_eq!(engine.state(), CacheState::Uninitialized);
}

struct FlatVolume(Vec<f32>);

impl ImageSource for FlatVolume {
    fn dims(&self) -> [usize; 3] {
        [4, 4, 4]
    }
    fn spacing(&self) -> Option<[f64; 3]> {
        Some([1.0, 1.0, 1.0])
    }
    fn origin(&self) -> [f64; 3] {
        [0.0, 0.0, 0.0]
    }
    fn direction(&self) -> [[f64; 3]; 3] {
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
    }
    fn voxels(&self) -> Vec<f32> {
        self.0.clone()
    }
}

#[test]
fn test_external_images_are_reconciled() {
    let device = Default::default();
    let voxels: Vec<f32> = (0..64).map(|v| v as f32).collect();

    let mut engine = ResampleEngine::<B>::new(device);
    engine.set_reference_image(ImageHandle::external(FlatVolume(vec![0.0; 64])));
    engine.set_floating_image(ImageHandle::external(FlatVolume(voxels.clone())));
    engine.set_interpolation(Interpolation::Nearest);

    assert_eq!(engine.process().unwrap().to_voxels().unwrap(), voxels);
}

#[test]
fn test_shared_canonical_image_is_not_copied() {
    let device = Default::default();
    let floating = Arc::new(Image::<B, 3>::filled(geometry(), 2.0, &device));

    let mut engine = ResampleEngine::<B>::new(device);
    engine.set_reference_image(Image::zeros(geometry(), &Default::default()));
    engine.set_floating_image(Arc::clone(&floating));
    engine.process().unwrap();

    // The caller's image is untouched and still shared with the engine
    assert!(Arc::strong_count(&floating) > 1);
    assert!(floating.to_voxels().unwrap().iter().all(|&v| v == 2.0));
}
