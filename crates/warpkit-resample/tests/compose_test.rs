use burn_ndarray::NdArray;
use nalgebra::{SMatrix, SVector};
use warpkit_core::image::{Image, ImageGeometry};
use warpkit_core::spatial::Vector;
use warpkit_core::transform::{AffineTransform, DeformationField, Transformation};
use warpkit_resample::{compose, Interpolation, ResampleEngine};

type B = NdArray<f32>;

const N: usize = 8;

fn grid() -> ImageGeometry<3> {
    ImageGeometry::from_shape([N, N, N])
}

fn ramp() -> Image<B, 3> {
    let mut voxels = Vec::with_capacity(N * N * N);
    for z in 0..N {
        for y in 0..N {
            for x in 0..N {
                voxels.push(2.0 * x as f32 + 3.0 * y as f32 + z as f32);
            }
        }
    }
    Image::from_voxels(voxels, grid(), &Default::default()).unwrap()
}

fn resample(floating: Image<B, 3>, transformations: Vec<Transformation<B>>) -> Vec<f32> {
    let mut engine = ResampleEngine::<B>::new(Default::default());
    engine.set_reference_image(Image::zeros(grid(), &Default::default()));
    engine.set_floating_image(floating);
    engine.set_transformations(transformations);
    engine.set_interpolation(Interpolation::Linear);
    engine.process().unwrap().to_voxels().unwrap()
}

#[test]
fn test_chained_resampling_matches_composition() {
    let a: Transformation<B> = AffineTransform::from_translation(Vector::new([0.5, 0.25, 0.0])).into();
    let b: Transformation<B> = AffineTransform::new(
        SMatrix::from_diagonal(&SVector::from([0.9, 1.0, 1.0])),
        SVector::from([0.75, 0.0, 0.5]),
    )
    .into();

    let composed = resample(ramp(), vec![a.clone(), b.clone()]);

    let intermediate = Image::from_voxels(resample(ramp(), vec![b]), grid(), &Default::default()).unwrap();
    let chained = resample(intermediate, vec![a]);

    // Linear interpolation of a linear ramp is exact wherever every tap is inside
    for z in 0..6 {
        for y in 0..6 {
            for x in 0..6 {
                let i = (z * N + y) * N + x;
                assert!(
                    (composed[i] - chained[i]).abs() < 1e-3,
                    "voxel ({x}, {y}, {z}): {} vs {}",
                    composed[i],
                    chained[i]
                );
            }
        }
    }
}

#[test]
fn test_empty_list_is_identity() {
    let device = Default::default();
    let field = compose::<B>(&[], &grid(), &device).unwrap();
    let identity = DeformationField::<B>::identity(grid(), &device);
    assert_eq!(field.to_voxels().unwrap(), identity.to_voxels().unwrap());

    assert_eq!(resample(ramp(), Vec::new()), ramp().to_voxels().unwrap());
}
