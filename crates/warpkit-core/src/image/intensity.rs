//! Intensity metadata carried alongside the voxel payload.
//!
//! Geometry decides where voxels are; intensity metadata decides how their
//! stored values are interpreted. Resampling output takes its grid from one
//! image and its intensity metadata from another, so the two are kept apart.

use serde::{Deserialize, Serialize};

/// Storage type of the voxel values as declared by the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelType {
    UInt8,
    Int16,
    Int32,
    #[default]
    Float32,
    Float64,
}

/// Scaling, calibration and intent of voxel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityMetadata {
    /// Multiplier applied to stored values.
    pub scale_slope: f32,
    /// Offset applied after scaling.
    pub scale_intercept: f32,
    /// Display window minimum.
    pub cal_min: f32,
    /// Display window maximum.
    pub cal_max: f32,
    pub pixel_type: PixelType,
    pub intent_code: i16,
    pub intent_name: String,
}

impl Default for IntensityMetadata {
    fn default() -> Self {
        Self {
            scale_slope: 1.0,
            scale_intercept: 0.0,
            cal_min: 0.0,
            cal_max: 0.0,
            pixel_type: PixelType::Float32,
            intent_code: 0,
            intent_name: String::new(),
        }
    }
}

impl IntensityMetadata {
    /// Set the value scaling.
    pub fn with_scaling(mut self, slope: f32, intercept: f32) -> Self {
        self.scale_slope = slope;
        self.scale_intercept = intercept;
        self
    }

    /// Set the display window.
    pub fn with_calibration(mut self, cal_min: f32, cal_max: f32) -> Self {
        self.cal_min = cal_min;
        self.cal_max = cal_max;
        self
    }

    /// Set the pixel type.
    pub fn with_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.pixel_type = pixel_type;
        self
    }

    /// Set the intent code and name.
    pub fn with_intent(mut self, code: i16, name: impl Into<String>) -> Self {
        self.intent_code = code;
        self.intent_name = name.into();
        self
    }

    /// Apply slope and intercept to a stored value.
    pub fn calibrate(&self, stored: f32) -> f32 {
        stored * self.scale_slope + self.scale_intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity_scaling() {
        let meta = IntensityMetadata::default();
        assert_eq!(meta.calibrate(3.5), 3.5);
        assert_eq!(meta.pixel_type, PixelType::Float32);
    }

    #[test]
    fn test_builders() {
        let meta = IntensityMetadata::default()
            .with_scaling(2.0, -1.0)
            .with_calibration(0.0, 100.0)
            .with_pixel_type(PixelType::Int16)
            .with_intent(1007, "vector");
        assert_eq!(meta.calibrate(3.0), 5.0);
        assert_eq!(meta.cal_max, 100.0);
        assert_eq!(meta.intent_name, "vector");
    }
}
