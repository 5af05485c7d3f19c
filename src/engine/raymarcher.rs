//! Volumetric cone raymarcher.
//!
//! Marches a camera ray in fixed steps from the eye toward the rasterized
//! surface and integrates light scattered toward the camera inside the
//! light cone:
//! - Henyey-Greenstein phase weighting
//! - Beer's-law extinction along the march
//! - exponential falloff with distance from the light
//! - optional shadow-map occlusion
//!
//! Each sample is in one of three states: skipped because the light is
//! occluded, skipped because it lies outside the cone, or accumulated.
//! Transmittance is multiplied in before the sample's contribution is
//! added, so every accumulated sample is also extinguished by its own step:
//!
//! ```text
//! T_k = T_{k-1} · exp(-density_k · step · absorption)
//! L  += color · intensity · atten_k · phase_k · visibility_k · T_k · density_k · step
//! ```

use glam::{DVec2, DVec3};

use crate::engine::config::VolumetricConfig;
use crate::engine::types::*;
use crate::lighting::extinction;
use crate::lighting::phase;
use crate::lighting::shadow::ShadowTest;
use crate::math::reconstruct;
use crate::volume::shape;

/// Result of a single march.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarchOutcome {
    /// Scattered radiance reaching the camera
    pub radiance: DVec3,
    /// Cumulative transmittance at termination
    pub transmittance: f64,
    /// Samples evaluated before termination
    pub iterations: u32,
    /// Samples that contributed
    pub accumulated: u32,
    pub skipped_shadowed: u32,
    pub skipped_outside: u32,
}

/// Build the camera ray through `uv` that stops at the surface at `depth`.
pub fn build_ray(uv: DVec2, depth: f64, frame: &FrameUniforms) -> Ray {
    let origin = frame.camera_position;
    let far_point = reconstruct::world_position(uv, 1.0, &frame.inv_projection, &frame.inv_view);
    let surface = reconstruct::world_position(
        uv,
        depth.clamp(0.0, 1.0),
        &frame.inv_projection,
        &frame.inv_view,
    );

    Ray {
        origin,
        direction: (far_point - origin).normalize_or_zero(),
        max_length: surface.distance(origin).min(frame.camera_far),
    }
}

/// Evaluate the light arriving from one sample inside the cone.
#[inline]
fn sample_light(
    ray: &Ray,
    position: DVec3,
    distance: f64,
    shape_factor: f64,
    visibility: f64,
    light: &LightCone,
    config: &VolumetricConfig,
) -> SampleResult {
    let attenuation = (-config.attenuation * position.distance(light.apex)).exp();
    let mu = ray.direction.dot(light.direction_to_light(position));
    let phase = phase::henyey_greenstein(mu, config.anisotropy);

    let density = (config.base_density * shape_factor).max(0.0);
    let step_transmittance = extinction::transmittance(extinction::optical_depth(
        density,
        config.step_size,
        config.absorption,
    ));

    let color = DVec3::from_array(config.light_color);
    SampleResult {
        position,
        distance,
        shape: shape_factor,
        visibility,
        density,
        step_transmittance,
        luminance: color * config.light_intensity * attenuation * phase * visibility,
    }
}

/// March `ray` through the light cone.
///
/// `start_offset` in [0, 1) shifts the first sample by that fraction of a
/// step. The loop never runs more than `config.max_steps` iterations.
pub fn march<S: ShadowTest + ?Sized>(
    ray: &Ray,
    light: &LightCone,
    config: &VolumetricConfig,
    shadow: &S,
    start_offset: f64,
) -> MarchOutcome {
    let step = config.step_size;
    let mut state = MarchState::new(config.initial_transmittance, start_offset * step);
    let mut outcome = MarchOutcome::default();

    for _ in 0..config.max_steps {
        let position = ray.at(state.t);
        if state.t > ray.max_length {
            break;
        }
        outcome.iterations += 1;

        let visibility = shadow.visibility(position);
        if visibility <= 0.0 {
            outcome.skipped_shadowed += 1;
            state.t += step;
            continue;
        }

        let distance = light.distance(position);
        let shape_factor = shape::shape_factor(distance, config.edge_width);
        if shape_factor < config.shape_threshold {
            outcome.skipped_outside += 1;
            state.t += step;
            continue;
        }

        let sample = sample_light(ray, position, distance, shape_factor, visibility, light, config);
        state.transmittance *= sample.step_transmittance;
        state.radiance += sample.luminance * state.transmittance * sample.density * step;
        outcome.accumulated += 1;
        state.t += step;
    }

    outcome.radiance = state.radiance;
    outcome.transmittance = state.transmittance;
    outcome
}

/// Additive radiance contribution of the light cone for one pixel.
///
/// `scene_depth` is the normalized depth-buffer value at `uv`. The march
/// always starts at the ray origin: `config.jitter` needs integer pixel
/// coordinates and is only applied by the frame pass
/// ([`crate::engine::pass::render_rows`]). Call [`build_ray`] and [`march`]
/// directly to supply a start offset.
pub fn compute_volumetric_contribution<S: ShadowTest + ?Sized>(
    uv: DVec2,
    scene_depth: f64,
    frame: &FrameUniforms,
    light: &LightCone,
    config: &VolumetricConfig,
    shadow: &S,
) -> DVec3 {
    let ray = build_ray(uv, scene_depth, frame);
    march(&ray, light, config, shadow, 0.0).radiance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::shadow::Unshadowed;

    fn cone() -> LightCone {
        LightCone::new(DVec3::ZERO, DVec3::NEG_Z, 30.0, None).unwrap()
    }

    fn axial_ray(x_offset: f64) -> Ray {
        Ray {
            origin: DVec3::new(x_offset, 0.0, 5.0),
            direction: DVec3::NEG_Z,
            max_length: 10.0,
        }
    }

    #[test]
    fn test_on_axis_accumulates() {
        let out = march(&axial_ray(0.0), &cone(), &VolumetricConfig::default(), &Unshadowed, 0.0);
        assert!(out.radiance.min_element() > 0.0, "got {:?}", out.radiance);
        assert!(out.accumulated > 0);
        assert!(out.skipped_outside > 0, "samples in front of the apex are outside");
        assert!(out.transmittance < 1.0);
    }

    #[test]
    fn test_far_outside_adds_nothing() {
        let out = march(&axial_ray(100.0), &cone(), &VolumetricConfig::default(), &Unshadowed, 0.0);
        assert_eq!(out.radiance, DVec3::ZERO);
        assert_eq!(out.accumulated, 0);
        assert_eq!(out.transmittance, 1.0);
    }

    #[test]
    fn test_always_shadowed_adds_nothing() {
        let blocked = |_p: DVec3| 0.0;
        let out = march(&axial_ray(0.0), &cone(), &VolumetricConfig::default(), &blocked, 0.0);
        assert_eq!(out.radiance, DVec3::ZERO);
        assert_eq!(out.skipped_shadowed, out.iterations);
    }

    #[test]
    fn test_partial_visibility_scales_radiance() {
        let config = VolumetricConfig::default();
        let full = march(&axial_ray(0.0), &cone(), &config, &Unshadowed, 0.0);
        let half = march(&axial_ray(0.0), &cone(), &config, &|_p: DVec3| 0.5, 0.0);
        assert!((half.radiance - full.radiance * 0.5).length() < 1e-12);
        assert_eq!(half.transmittance, full.transmittance);
    }

    #[test]
    fn test_iteration_cap() {
        let config = VolumetricConfig {
            max_steps: 7,
            ..Default::default()
        };
        let ray = Ray {
            max_length: 1.0e6,
            ..axial_ray(0.0)
        };
        let out = march(&ray, &cone(), &config, &Unshadowed, 0.0);
        assert_eq!(out.iterations, 7);
    }

    #[test]
    fn test_terminates_at_max_length() {
        let config = VolumetricConfig {
            step_size: 1.0,
            ..Default::default()
        };
        let ray = Ray {
            max_length: 3.5,
            ..axial_ray(0.0)
        };
        let out = march(&ray, &cone(), &config, &Unshadowed, 0.0);
        // Samples at t = 0, 1, 2, 3.
        assert_eq!(out.iterations, 4);
    }

    #[test]
    fn test_transmittance_non_increasing() {
        let mut prev = f64::INFINITY;
        for steps in 1..=110 {
            let config = VolumetricConfig {
                max_steps: steps,
                ..Default::default()
            };
            let out = march(&axial_ray(0.0), &cone(), &config, &Unshadowed, 0.0);
            assert!(out.transmittance <= prev, "T rose at step {}", steps);
            assert!(out.transmittance >= 0.0 && out.transmittance <= config.initial_transmittance);
            prev = out.transmittance;
        }
    }

    #[test]
    fn test_radiance_non_decreasing() {
        let mut prev = DVec3::ZERO;
        for steps in 1..=110 {
            let config = VolumetricConfig {
                max_steps: steps,
                ..Default::default()
            };
            let out = march(&axial_ray(0.0), &cone(), &config, &Unshadowed, 0.0);
            assert!(out.radiance.cmpge(prev).all(), "L fell at step {}", steps);
            prev = out.radiance;
        }
    }

    #[test]
    fn test_multiply_then_accumulate() {
        // A single accumulated sample sees its own extinction.
        let config = VolumetricConfig {
            max_steps: 1,
            attenuation: 0.0,
            anisotropy: 0.0,
            ..Default::default()
        };
        let ray = Ray {
            origin: DVec3::new(0.0, 0.0, -5.0),
            direction: DVec3::NEG_Z,
            max_length: 1.0,
        };
        let out = march(&ray, &cone(), &config, &Unshadowed, 0.0);
        let density = config.base_density;
        let t = (-density * config.step_size * config.absorption).exp();
        let expected = t * density * config.step_size;
        assert!((out.radiance.x - expected).abs() < 1e-12, "{} vs {}", out.radiance.x, expected);
    }

    #[test]
    fn test_start_offset_shifts_samples() {
        let config = VolumetricConfig {
            step_size: 1.0,
            ..Default::default()
        };
        let ray = Ray {
            max_length: 3.5,
            ..axial_ray(0.0)
        };
        let out = march(&ray, &cone(), &config, &Unshadowed, 0.75);
        // Samples at t = 0.75, 1.75, 2.75.
        assert_eq!(out.iterations, 3);
    }

    #[test]
    fn test_contribution_ignores_jitter() {
        use glam::DMat4;
        let eye = DVec3::new(0.0, 0.0, 5.0);
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let projection = DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 0.1, 50.0);
        let frame = FrameUniforms::new(64, 64, eye, 50.0, view, projection).unwrap();
        let jittered = VolumetricConfig {
            jitter: true,
            ..Default::default()
        };

        let uv = DVec2::splat(0.5);
        let config = VolumetricConfig::default();
        let plain = compute_volumetric_contribution(uv, 1.0, &frame, &cone(), &config, &Unshadowed);
        let with_jitter =
            compute_volumetric_contribution(uv, 1.0, &frame, &cone(), &jittered, &Unshadowed);
        assert!(plain.x > 0.0);
        assert_eq!(plain, with_jitter);
    }

    #[test]
    fn test_build_ray_through_centre() {
        use glam::DMat4;
        let eye = DVec3::new(0.0, 0.0, 5.0);
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let projection = DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 0.1, 50.0);
        let frame = FrameUniforms::new(64, 64, eye, 50.0, view, projection).unwrap();

        let ray = build_ray(DVec2::splat(0.5), 1.0, &frame);
        assert!((ray.direction - DVec3::NEG_Z).length() < 1e-9);
        assert!((ray.max_length - 50.0).abs() < 1e-6);

        let ray = build_ray(DVec2::splat(0.5), 0.0, &frame);
        assert!((ray.max_length - 0.1).abs() < 1e-9);
    }
}
