//! Spatial transformations.
//!
//! Every transformation maps batches of physical points and can be evaluated
//! on a voxel grid into a [`DeformationField`].

pub mod trait_;
pub mod affine;
pub mod bspline;
pub mod deformation_field;
pub mod displacement_field;
pub mod transformation;

pub use trait_::Transform;
pub use affine::AffineTransform;
pub use bspline::{BSplineTransform, CoefficientKind};
pub use deformation_field::DeformationField;
pub use displacement_field::DisplacementFieldTransform;
pub use transformation::Transformation;
