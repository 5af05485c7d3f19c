//! Screen-space → world-space reconstruction.
//!
//! Converts a pixel UV and its depth-buffer value back into the world
//! position that was rasterized there, using the inverse camera transforms.
//! Depth is the normalized value stored by the rasterizer: 0 at the near
//! plane, 1 at the far plane.

use glam::{DMat4, DVec2, DVec3, DVec4};

/// Pixel centre UV for integer coordinates, with v = 0 on the first row.
#[inline]
pub fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> DVec2 {
    DVec2::new(
        (x as f64 + 0.5) / width.max(1) as f64,
        (y as f64 + 0.5) / height.max(1) as f64,
    )
}

/// Map UV + depth into normalized device coordinates.
#[inline]
pub fn uv_to_ndc(uv: DVec2, depth: f64) -> DVec4 {
    DVec4::new(uv.x * 2.0 - 1.0, uv.y * 2.0 - 1.0, depth * 2.0 - 1.0, 1.0)
}

/// Reconstruct the world-space position for `uv` at `depth`.
///
/// Both matrices must be invertible inverses of the camera transforms;
/// `FrameUniforms` checks that once per frame.
#[inline]
pub fn world_position(uv: DVec2, depth: f64, inv_projection: &DMat4, inv_view: &DMat4) -> DVec3 {
    let view = *inv_projection * uv_to_ndc(uv, depth);
    let view = view / view.w;
    (*inv_view * view).truncate()
}
