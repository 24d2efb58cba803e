use burn_ndarray::NdArray;
use warpkit_core::image::{Image, ImageGeometry, IntensityMetadata};
use warpkit_core::spatial::{Direction, Point, Spacing, Vector};
use warpkit_core::transform::AffineTransform;
use warpkit_resample::{Interpolation, ResampleEngine};

type B = NdArray<f32>;

fn ramp(geometry: ImageGeometry<3>) -> Image<B, 3> {
    let voxels = (0..geometry.num_voxels()).map(|v| (v as f32).sin() * 10.0).collect();
    Image::from_voxels(voxels, geometry, &Default::default()).unwrap()
}

#[test]
fn test_identity_forward_reproduces_floating() {
    let geometry = ImageGeometry::new(
        [4, 5, 6],
        Point::new([-3.0, 1.0, 7.5]),
        Spacing::new([0.5, 1.0, 2.0]),
        Direction::identity(),
    );
    let floating = ramp(geometry.clone());
    let expected = floating.to_voxels().unwrap();

    for kind in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic, Interpolation::Sinc] {
        let mut engine = ResampleEngine::<B>::new(Default::default());
        engine.set_reference_image(Image::zeros(geometry.clone(), &Default::default()));
        engine.set_floating_image(floating.clone());
        engine.set_interpolation(kind);

        let output = engine.process().unwrap().to_voxels().unwrap();
        for (i, (a, b)) in output.iter().zip(&expected).enumerate() {
            assert!((a - b).abs() < 1e-5, "{kind:?} voxel {i}: {a} vs {b}");
        }
    }
}

#[test]
fn test_outside_positions_receive_padding() {
    let device = Default::default();
    let floating = ramp(ImageGeometry::from_shape([4, 4, 4]));
    let reference = Image::<B, 3>::zeros(ImageGeometry::from_shape([6, 6, 6]), &device);

    let mut engine = ResampleEngine::new(device);
    engine.set_reference_image(reference);
    engine.set_floating_image(floating.clone());
    engine.add_transformation(AffineTransform::from_translation(Vector::new([3.0, 0.0, 0.0])));
    engine.set_interpolation(Interpolation::Nearest);
    engine.set_padding_value(-7.0);

    let output = engine.process().unwrap().to_voxels().unwrap();
    let source = floating.to_voxels().unwrap();

    // Reference voxel (x=5, y=5, z=5) maps to floating (8, 5, 5)
    assert_eq!(output[(5 * 6 + 5) * 6 + 5], -7.0);
    // Reference voxel (x=0, y=1, z=1) maps to floating (3, 1, 1)
    assert_eq!(output[(6 + 1) * 6], source[(4 + 1) * 4 + 3]);
    // Reference voxel (x=1, y=0, z=0) maps to floating (4, 0, 0), one past the edge
    assert_eq!(output[1], -7.0);
}

#[test]
fn test_linear_shift_between_voxels() {
    let device = Default::default();
    let geometry = ImageGeometry::from_shape([1, 1, 4]);
    let floating = Image::<B, 3>::from_voxels(vec![0.0, 2.0, 4.0, 6.0], geometry.clone(), &device).unwrap();

    let mut engine = ResampleEngine::new(device);
    engine.set_reference_image(Image::zeros(geometry, &Default::default()));
    engine.set_floating_image(floating);
    engine.add_transformation(AffineTransform::from_translation(Vector::new([0.25, 0.0, 0.0])));
    engine.set_padding_value(0.0);

    let output = engine.process().unwrap().to_voxels().unwrap();
    assert!((output[0] - 0.5).abs() < 1e-5);
    assert!((output[2] - 4.5).abs() < 1e-5);
    // 3.25 lies beyond the last voxel
    assert_eq!(output[3], 0.0);
}

#[test]
fn test_output_carries_floating_intensity() {
    let device = Default::default();
    let geometry = ImageGeometry::from_shape([2, 2, 2]);
    let intensity = IntensityMetadata::default()
        .with_scaling(2.0, -1.0)
        .with_intent(1007, "vector");
    let floating = ramp(geometry.clone()).with_intensity(intensity.clone());

    let mut engine = ResampleEngine::<B>::new(device);
    engine.set_reference_image(Image::zeros(geometry, &Default::default()));
    engine.set_floating_image(floating);

    let output = engine.process().unwrap();
    assert_eq!(output.intensity(), &intensity);
    assert_eq!(engine.output().unwrap().intensity(), &intensity);
}

#[test]
fn test_forward_of_new_floating_data_reuses_setup() {
    let device = Default::default();
    let geometry = ImageGeometry::from_shape([3, 3, 3]);
    let mut engine = ResampleEngine::<B>::new(device);
    engine.set_reference_image(Image::zeros(geometry.clone(), &Default::default()));
    engine.set_floating_image(ramp(geometry.clone()));
    engine.process().unwrap();

    let other = Image::filled(geometry, 4.0, &Default::default());
    let output = engine.forward(&other).unwrap();
    assert!(output.to_voxels().unwrap().iter().all(|&v| (v - 4.0).abs() < 1e-6));
    assert_eq!(engine.composition_count(), 1);
}
