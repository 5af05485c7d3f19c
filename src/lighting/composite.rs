//! Compositing of scattered light over the scene, and display packing.
//!
//! Radiance stays linear and unclamped through `composite`; values above 1
//! are left for the host's tone mapping. Clamping happens only when packing
//! to 8-bit for a preview canvas.

use glam::{DVec3, DVec4};

use crate::math::utils;

/// Add the scattered radiance to the scene color; alpha is fully opaque.
#[inline(always)]
pub fn composite(scene_rgb: DVec3, radiance: DVec3) -> DVec4 {
    (scene_rgb + radiance).extend(1.0)
}

/// Reinhard tone map, per channel.
#[inline]
pub fn reinhard(c: DVec3) -> DVec3 {
    c / (DVec3::ONE + c.max(DVec3::ZERO))
}

/// Pack a linear RGBA `f32` buffer into RGBA bytes for display.
pub fn encode_rgba8(hdr: &[f32], rgba_out: &mut [u8], tone_map: bool) {
    for (src, dst) in hdr.chunks_exact(4).zip(rgba_out.chunks_exact_mut(4)) {
        let mut rgb = DVec3::new(src[0] as f64, src[1] as f64, src[2] as f64);
        if tone_map {
            rgb = reinhard(rgb);
        }
        dst[0] = utils::float_to_byte(rgb.x);
        dst[1] = utils::float_to_byte(rgb.y);
        dst[2] = utils::float_to_byte(rgb.z);
        dst[3] = utils::float_to_byte(src[3] as f64);
    }
}
