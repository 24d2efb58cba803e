use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use warpkit_core::image::{Image, ImageGeometry, IntensityMetadata, PixelType};
use warpkit_core::spatial::{Point, Spacing, Direction};
use warpkit_core::ImageError;
use nalgebra::{Vector3, Rotation3};
use std::f64::consts::PI;

type Backend = NdArray<f32>;
type Point3 = Point<3>;
type Spacing3 = Spacing<3>;
type Direction3 = Direction<3>;

#[test]
fn test_rotated_image_transform() {
    let device = Default::default();
    let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);

    // Rotate 90 degrees around Z axis: X -> Y, Y -> -X
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
    let direction = Direction(rotation.into_inner());

    let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), direction);

    // Physical (1, 0, 0) lies along the negative second index axis
    let point = Point3::new([1.0, 0.0, 0.0]);
    let index = image.transform_physical_point_to_continuous_index(&point).unwrap();

    assert!((index[0] - 0.0).abs() < 1e-5, "Expected index[0] to be 0.0, got {}", index[0]);
    assert!((index[1] - (-1.0)).abs() < 1e-5, "Expected index[1] to be -1.0, got {}", index[1]);
    assert!((index[2] - 0.0).abs() < 1e-5, "Expected index[2] to be 0.0, got {}", index[2]);

    let points_tensor = Tensor::<Backend, 2>::from_floats([[1.0, 0.0, 0.0]], &device);
    let indices_data = image.world_to_index_tensor(points_tensor).unwrap().into_data();
    let indices = indices_data.as_slice::<f32>().unwrap();

    assert!((indices[0] - 0.0).abs() < 1e-5, "Tensor: Expected index[0] to be 0.0, got {}", indices[0]);
    assert!((indices[1] - (-1.0)).abs() < 1e-5, "Tensor: Expected index[1] to be -1.0, got {}", indices[1]);
    assert!((indices[2] - 0.0).abs() < 1e-5, "Tensor: Expected index[2] to be 0.0, got {}", indices[2]);
}

#[test]
fn test_singular_direction_is_reported() {
    let device = Default::default();
    let geometry = ImageGeometry::new(
        [2, 2, 2],
        Point3::origin(),
        Spacing3::uniform(1.0),
        Direction3::from_rows([[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
    );
    assert!(matches!(geometry.validate(), Err(ImageError::InvalidGeometry(_))));

    let image = Image::<Backend, 3>::zeros(geometry, &device);
    assert!(image.transform_physical_point_to_continuous_index(&Point3::origin()).is_err());
}

#[test]
fn test_payload_replacement_is_shape_checked() {
    let device = Default::default();
    let geometry = ImageGeometry::<3>::from_shape([2, 3, 4]);
    let mut image = Image::<Backend, 3>::zeros(geometry.clone(), &device)
        .with_intensity(IntensityMetadata::default().with_pixel_type(PixelType::UInt8));

    image.set_voxels((0..24).map(|v| v as f32).collect()).unwrap();
    assert_eq!(image.to_voxels().unwrap()[23], 23.0);

    let err = image.set_voxels(vec![0.0; 23]).unwrap_err();
    assert!(matches!(err, ImageError::ShapeMismatch { .. }));

    // Geometry and intensity survive payload changes
    image.fill(1.0);
    assert_eq!(image.geometry(), &geometry);
    assert_eq!(image.intensity().pixel_type, PixelType::UInt8);
}
