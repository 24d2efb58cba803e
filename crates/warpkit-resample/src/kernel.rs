//! Interpolation stencils on host voxel buffers.
//!
//! A stencil turns a continuous index into a set of `(voxel, weight)` taps.
//! The forward resampler gathers through these taps and the adjoint scatters
//! through the very same taps, which is what makes the two operators
//! transposes of each other.

use std::f64::consts::PI;
use crate::config::Interpolation;

/// Taps per axis of the widest kernel.
pub const MAX_TAPS: usize = 6;

/// Lanczos window radius of the sinc kernel.
pub const SINC_RADIUS: i64 = 3;

/// Keys cubic convolution parameter.
const CUBIC_A: f64 = -0.5;

/// Slack, in voxels, on the valid extent `[0, n - 1]`.
pub const EXTENT_TOLERANCE: f64 = 1e-3;

/// Distance below which a position is treated as lying on a voxel centre.
const SNAP_TOLERANCE: f64 = 1e-5;

/// Taps along one axis.
#[derive(Debug, Clone, Copy)]
pub struct AxisTaps {
    index: [usize; MAX_TAPS],
    weight: [f64; MAX_TAPS],
    len: usize,
}

impl AxisTaps {
    fn single(index: usize) -> Self {
        let mut taps = Self::empty();
        taps.push(index, 1.0);
        taps
    }

    fn empty() -> Self {
        Self {
            index: [0; MAX_TAPS],
            weight: [0.0; MAX_TAPS],
            len: 0,
        }
    }

    fn push(&mut self, index: usize, weight: f64) {
        self.index[self.len] = index;
        self.weight[self.len] = weight;
        self.len += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.index[..self.len]
            .iter()
            .copied()
            .zip(self.weight[..self.len].iter().copied())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn clamp_index(i: i64, n: usize) -> usize {
    i.clamp(0, n as i64 - 1) as usize
}

fn snap(pos: f64) -> f64 {
    let nearest = pos.round();
    if (pos - nearest).abs() < SNAP_TOLERANCE {
        nearest
    } else {
        pos
    }
}

fn keys_cubic(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        ((CUBIC_A + 2.0) * t - (CUBIC_A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((CUBIC_A * t - 5.0 * CUBIC_A) * t + 8.0 * CUBIC_A) * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn lanczos(t: f64) -> f64 {
    if t.abs() >= SINC_RADIUS as f64 {
        0.0
    } else {
        sinc(t) * sinc(t / SINC_RADIUS as f64)
    }
}

/// Taps along an axis of `n` voxels at continuous index `pos`.
///
/// Returns `None` when `pos` is outside the kernel's valid extent; the caller
/// then writes the padding value. Taps that fall off the volume while `pos`
/// is inside are clamped to the border voxel.
pub fn axis_taps(kind: Interpolation, pos: f64, n: usize) -> Option<AxisTaps> {
    if n == 0 || !pos.is_finite() {
        return None;
    }
    let pos = snap(pos);

    if kind == Interpolation::Nearest {
        let rounded = pos.round();
        if rounded < 0.0 || rounded > (n - 1) as f64 {
            return None;
        }
        return Some(AxisTaps::single(rounded as usize));
    }

    if pos < -EXTENT_TOLERANCE || pos > (n - 1) as f64 + EXTENT_TOLERANCE {
        return None;
    }

    let base = pos.floor();
    let frac = pos - base;
    let base = base as i64;
    if frac == 0.0 {
        return Some(AxisTaps::single(clamp_index(base, n)));
    }

    let mut taps = AxisTaps::empty();
    match kind {
        Interpolation::Nearest | Interpolation::Linear => {
            taps.push(clamp_index(base, n), 1.0 - frac);
            taps.push(clamp_index(base + 1, n), frac);
        }
        Interpolation::Cubic => {
            for offset in -1..=2 {
                let tap = base + offset;
                taps.push(clamp_index(tap, n), keys_cubic(pos - tap as f64));
            }
        }
        Interpolation::Sinc => {
            let mut total = 0.0;
            for offset in (1 - SINC_RADIUS)..=SINC_RADIUS {
                let tap = base + offset;
                let w = lanczos(pos - tap as f64);
                total += w;
                taps.push(clamp_index(tap, n), w);
            }
            for w in &mut taps.weight[..taps.len] {
                *w /= total;
            }
        }
    }
    Some(taps)
}

/// Visit every tap of the 3D stencil at continuous index `(x, y, z)`.
///
/// `dims` is `[nx, ny, nz]`; `visit` receives the flat voxel offset (x
/// fastest) and the weight. Returns `false`, visiting nothing, when the
/// position lies outside the volume.
pub fn for_each_tap<F>(kind: Interpolation, index: [f64; 3], dims: [usize; 3], mut visit: F) -> bool
where
    F: FnMut(usize, f64),
{
    let Some(tx) = axis_taps(kind, index[0], dims[0]) else {
        return false;
    };
    let Some(ty) = axis_taps(kind, index[1], dims[1]) else {
        return false;
    };
    let Some(tz) = axis_taps(kind, index[2], dims[2]) else {
        return false;
    };

    let [nx, ny, _] = dims;
    for (z, wz) in tz.iter() {
        for (y, wy) in ty.iter() {
            let row = (z * ny + y) * nx;
            let wzy = wz * wy;
            for (x, wx) in tx.iter() {
                let w = wzy * wx;
                if w != 0.0 {
                    visit(row + x, w);
                }
            }
        }
    }
    true
}

/// Interpolate `voxels` at `index`, or `None` if outside.
pub fn sample(kind: Interpolation, voxels: &[f32], dims: [usize; 3], index: [f64; 3]) -> Option<f64> {
    let mut value = 0.0;
    let inside = for_each_tap(kind, index, dims, |offset, w| value += w * voxels[offset] as f64);
    inside.then_some(value)
}
