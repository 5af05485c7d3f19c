//! Scalar helpers shared by the volumetric pass.
//!
//! Clamping, smooth thresholds, byte packing and
//! the screen-space dither used to offset ray start positions.

use glam::DMat4;

/// Clamp a value to [min, max] range.
#[inline(always)]
pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    if v < min { min } else if v > max { max } else { v }
}

/// Smooth step (Hermite interpolation).
///
/// Returns exactly 0 for `x <= edge0` and exactly 1 for `x >= edge1`.
#[inline(always)]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pack a float to a byte [0, 255].
#[inline(always)]
pub fn float_to_byte(v: f64) -> u8 {
    let vi = (v * 255.0) as i32;
    if vi < 0 { 0 } else if vi > 255 { 255 } else { vi as u8 }
}

/// Interleaved gradient noise in [0, 1) for integer pixel coordinates.
///
/// Pure function of the pixel, so every worker computes the same offset
/// for the same pixel regardless of scanline assignment.
#[inline]
pub fn interleaved_gradient_noise(x: u32, y: u32) -> f64 {
    let f = 0.067_110_56 * x as f64 + 0.005_837_15 * y as f64;
    (52.982_918_9 * f.fract()).fract()
}

/// Read a column-major 4×4 matrix from 16 consecutive floats.
///
/// Matches the element order of `Matrix4.elements` on the JS side.
pub fn mat4_from_slice(data: &[f64]) -> Option<DMat4> {
    if data.len() < 16 {
        return None;
    }
    let mut cols = [0.0f64; 16];
    cols.copy_from_slice(&data[..16]);
    Some(DMat4::from_cols_array(&cols))
}

/// Texel count of a `width`×`height` image.
///
/// `None` unless both sides are non-zero, the count fits in `u32` and
/// `count * 4` RGBA channels fit in `usize`.
pub fn checked_pixel_count(width: u32, height: u32) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }
    let count = width.checked_mul(height)?;
    let count = usize::try_from(count).ok()?;
    count.checked_mul(4)?;
    Some(count)
}

/// True when the matrix has a usable inverse.
#[inline]
pub fn is_invertible(m: &DMat4) -> bool {
    let det = m.determinant();
    det.is_finite() && det.abs() > 1e-300
}
