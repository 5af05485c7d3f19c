//! Core types of the volumetric pass.
//!
//! Per-frame inputs (`FrameUniforms`, `LightCone`) are built and validated
//! once, then shared read-only by every pixel. Per-pixel state (`Ray`,
//! `MarchState`, `SampleResult`) lives on the stack of a single march.

use glam::{DMat4, DVec3};

use crate::engine::config::ConfigError;
use crate::math::utils;
use crate::volume::cone;

/// Tolerance on |axis| before a light direction counts as non-unit.
pub const AXIS_UNIT_TOLERANCE: f64 = 1e-3;

/// Camera ray for one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Camera position (world space)
    pub origin: DVec3,
    /// Unit direction through the pixel
    pub direction: DVec3,
    /// min(distance to the rasterized surface, camera far)
    pub max_length: f64,
}

impl Ray {
    #[inline(always)]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// The lit cone volume of a spot light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightCone {
    /// Apex (light position, world space)
    pub apex: DVec3,
    /// Unit axis from the apex into the scene
    pub axis: DVec3,
    /// Half of the configured full cone angle, radians
    pub half_angle: f64,
    /// Length of the cone along its axis; unbounded when `None`
    pub range: Option<f64>,
}

impl LightCone {
    /// Number of values in the flat parameter layout.
    pub const BUFFER_LEN: usize = 8;

    /// Build a cone from its full opening angle in degrees.
    pub fn new(
        apex: DVec3,
        axis: DVec3,
        cone_angle_deg: f64,
        range: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if !(cone_angle_deg > 0.0 && cone_angle_deg < 180.0) {
            return Err(ConfigError::InvalidConeAngle(cone_angle_deg));
        }
        let len = axis.length();
        if !len.is_finite() || (len - 1.0).abs() > AXIS_UNIT_TOLERANCE {
            return Err(ConfigError::NonUnitAxis(len));
        }
        if let Some(r) = range {
            if !(r.is_finite() && r > 0.0) {
                return Err(ConfigError::InvalidRange(r));
            }
        }
        Ok(Self {
            apex,
            axis: axis / len,
            half_angle: (cone_angle_deg * 0.5).to_radians(),
            range,
        })
    }

    /// Parse `[apex xyz, axis xyz, cone_angle_deg, range]`; range <= 0 is unbounded.
    pub fn from_buffer(data: &[f64]) -> Result<Self, ConfigError> {
        if data.len() < Self::BUFFER_LEN {
            return Err(ConfigError::ParamsTooShort {
                name: "light",
                expected: Self::BUFFER_LEN,
                got: data.len(),
            });
        }
        let range = (data[7] > 0.0).then_some(data[7]);
        Self::new(
            DVec3::new(data[0], data[1], data[2]),
            DVec3::new(data[3], data[4], data[5]),
            data[6],
            range,
        )
    }

    /// Signed distance from `p` to the cone volume.
    #[inline]
    pub fn distance(&self, p: DVec3) -> f64 {
        match self.range {
            Some(range) => {
                cone::capped_cone_distance(p, self.apex, self.axis, self.half_angle, range)
            }
            None => cone::cone_distance(p, self.apex, self.axis, self.half_angle),
        }
    }

    /// Unit direction from `p` toward the light.
    #[inline]
    pub fn direction_to_light(&self, p: DVec3) -> DVec3 {
        let to_apex = self.apex - p;
        let len = to_apex.length();
        if len > 1e-9 { to_apex / len } else { -self.axis }
    }
}

/// Camera state shared by every pixel of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUniforms {
    pub width: u32,
    pub height: u32,
    pub camera_position: DVec3,
    pub camera_far: f64,
    pub inv_projection: DMat4,
    pub inv_view: DMat4,
}

impl FrameUniforms {
    /// Number of values in the flat parameter layout.
    pub const BUFFER_LEN: usize = 38;

    /// Build from the forward camera transforms, inverting them once.
    pub fn new(
        width: u32,
        height: u32,
        camera_position: DVec3,
        camera_far: f64,
        view: DMat4,
        projection: DMat4,
    ) -> Result<Self, ConfigError> {
        if utils::checked_pixel_count(width, height).is_none() {
            return Err(ConfigError::InvalidImageSize { width, height });
        }
        if !(camera_far.is_finite() && camera_far > 0.0) {
            return Err(ConfigError::InvalidFar(camera_far));
        }
        if !utils::is_invertible(&view) {
            return Err(ConfigError::SingularTransform("view"));
        }
        if !utils::is_invertible(&projection) {
            return Err(ConfigError::SingularTransform("projection"));
        }
        Ok(Self {
            width,
            height,
            camera_position,
            camera_far,
            inv_projection: projection.inverse(),
            inv_view: view.inverse(),
        })
    }

    /// Parse `[width, height, camera xyz, far, view (16), projection (16)]`.
    ///
    /// Matrices are column-major, as in `Matrix4.elements`.
    pub fn from_buffer(data: &[f64]) -> Result<Self, ConfigError> {
        if data.len() < Self::BUFFER_LEN {
            return Err(ConfigError::ParamsTooShort {
                name: "frame",
                expected: Self::BUFFER_LEN,
                got: data.len(),
            });
        }
        let view =
            utils::mat4_from_slice(&data[6..22]).ok_or(ConfigError::SingularTransform("view"))?;
        let projection = utils::mat4_from_slice(&data[22..38])
            .ok_or(ConfigError::SingularTransform("projection"))?;
        Self::new(
            data[0] as u32,
            data[1] as u32,
            DVec3::new(data[2], data[3], data[4]),
            data[5],
            view,
            projection,
        )
    }

    /// Pixel count; saturates for sizes `new` would have rejected.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        utils::checked_pixel_count(self.width, self.height).unwrap_or(usize::MAX)
    }
}

/// Accumulators of one march.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchState {
    /// Distance travelled along the ray
    pub t: f64,
    /// Cumulative transmittance, in [0, T₀]
    pub transmittance: f64,
    /// Accumulated scattered radiance
    pub radiance: DVec3,
}

impl MarchState {
    pub fn new(initial_transmittance: f64, start_t: f64) -> Self {
        Self {
            t: start_t,
            transmittance: initial_transmittance,
            radiance: DVec3::ZERO,
        }
    }
}

/// Values computed for one accumulated sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleResult {
    pub position: DVec3,
    /// Signed distance to the cone
    pub distance: f64,
    pub shape: f64,
    pub visibility: f64,
    pub density: f64,
    pub step_transmittance: f64,
    /// color × intensity × attenuation × phase × visibility
    pub luminance: DVec3,
}
