//! Spacing type for physical distances between voxels.

use super::Vector;

/// Spacing between adjacent voxels along each axis.
///
/// Type alias to `Vector` for semantic clarity.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    /// True when every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }

    /// Get the minimum spacing value.
    pub fn min_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        assert_eq!(Spacing3::uniform(1.5), Spacing3::new([1.5, 1.5, 1.5]));
    }

    #[test]
    fn test_spacing_validity() {
        assert!(Spacing3::new([1.0, 2.0, 3.0]).is_valid());
        assert!(!Spacing3::new([1.0, 0.0, 3.0]).is_valid());
        assert!(!Spacing3::new([1.0, f64::NAN, 3.0]).is_valid());
        assert_eq!(Spacing3::new([1.0, 0.5, 3.0]).min_spacing(), 0.5);
    }
}
