//! Shadow visibility at a march sample.
//!
//! The raymarcher only asks "how visible is the light from here?"; the
//! shadow map itself is rendered by the host from the light's viewpoint
//! and handed over as a read-only depth buffer.

use glam::{DMat4, DVec3};

/// Visibility of the light at a world-space position, in [0, 1].
pub trait ShadowTest {
    fn visibility(&self, world_pos: DVec3) -> f64;
}

/// No occluders: every sample sees the light.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unshadowed;

impl ShadowTest for Unshadowed {
    #[inline(always)]
    fn visibility(&self, _world_pos: DVec3) -> f64 {
        1.0
    }
}

impl<F> ShadowTest for F
where
    F: Fn(DVec3) -> f64,
{
    #[inline(always)]
    fn visibility(&self, world_pos: DVec3) -> f64 {
        self(world_pos)
    }
}

/// Depth-map shadow test.
///
/// Texel (0, 0) is the first element of `depth` and maps to light-space
/// UV (0, 0); rows are `width` texels long.
#[derive(Clone, Debug)]
pub struct ShadowMap<'a> {
    /// Light projection × light view
    pub view_projection: DMat4,
    /// Stored nearest-occluder depth, normalized [0, 1]
    pub depth: &'a [f32],
    pub width: u32,
    pub height: u32,
    /// Added to the stored depth before comparing
    pub bias: f64,
    /// PCF kernel radius in texels (0 = single binary tap)
    pub pcf_radius: u32,
}

impl<'a> ShadowMap<'a> {
    /// Project a world position into the light's [0, 1]³ box.
    ///
    /// `None` when the point is behind the light or outside its frustum.
    pub fn light_space(&self, world_pos: DVec3) -> Option<DVec3> {
        let clip = self.view_projection * world_pos.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let coord = clip.truncate() / clip.w * 0.5 + DVec3::splat(0.5);
        let inside = (0.0..=1.0).contains(&coord.x)
            && (0.0..=1.0).contains(&coord.y)
            && (0.0..=1.0).contains(&coord.z);
        inside.then_some(coord)
    }

    #[inline]
    fn stored_depth(&self, x: i64, y: i64) -> f64 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.depth
            .get(y * self.width as usize + x)
            .map(|&d| d as f64)
            .unwrap_or(1.0)
    }
}

impl ShadowTest for ShadowMap<'_> {
    fn visibility(&self, world_pos: DVec3) -> f64 {
        if self.width == 0 || self.height == 0 {
            return 1.0;
        }
        let Some(coord) = self.light_space(world_pos) else {
            return 1.0;
        };

        let tx = ((coord.x * self.width as f64) as i64).min(self.width as i64 - 1);
        let ty = ((coord.y * self.height as f64) as i64).min(self.height as i64 - 1);
        let r = self.pcf_radius as i64;

        let mut lit = 0u32;
        let mut taps = 0u32;
        for dy in -r..=r {
            for dx in -r..=r {
                if coord.z <= self.stored_depth(tx + dx, ty + dy) + self.bias {
                    lit += 1;
                }
                taps += 1;
            }
        }

        lit as f64 / taps as f64
    }
}
