//! Full-frame volumetric pass driver.
//!
//! Reads the scene color (RGBA `f32`) and depth (`f32`) buffers, marches
//! one ray per pixel and writes the composited RGBA `f32` result. Work is
//! split across Web Workers by interleaved scanlines; each call only
//! touches the rows assigned to `worker_id`. Row 0 is the first row of
//! every buffer and maps to v = 0.

use glam::DVec3;

use crate::engine::config::{ConfigError, VolumetricConfig};
use crate::engine::raymarcher;
use crate::engine::types::{FrameUniforms, LightCone};
use crate::lighting::composite;
use crate::lighting::shadow::{ShadowMap, ShadowTest, Unshadowed};
use crate::math::{reconstruct, utils};

/// Number of leading values in the shadow parameter layout.
pub const SHADOW_PARAMS_LEN: usize = 20;

/// Largest accepted PCF kernel radius; a sample costs at most 17² taps.
pub const MAX_PCF_RADIUS: u32 = 8;

/// Parse the shadow parameters.
///
/// Layout: [enabled, map_width, map_height, pcf_radius, view_projection (16)].
/// Returns `None` when the buffer is empty or `enabled` is 0.
pub fn shadow_map_from_buffer<'a>(
    data: &[f64],
    depth: &'a [f32],
    bias: f64,
) -> Result<Option<ShadowMap<'a>>, ConfigError> {
    if data.is_empty() || data[0] == 0.0 {
        return Ok(None);
    }
    if data.len() < SHADOW_PARAMS_LEN {
        return Err(ConfigError::ParamsTooShort {
            name: "shadow",
            expected: SHADOW_PARAMS_LEN,
            got: data.len(),
        });
    }

    let width = data[1] as u32;
    let height = data[2] as u32;
    let expected = utils::checked_pixel_count(width, height)
        .ok_or(ConfigError::InvalidImageSize { width, height })?;
    if depth.len() < expected {
        return Err(ConfigError::BufferTooSmall {
            name: "shadow depth",
            expected,
            got: depth.len(),
        });
    }

    let radius = data[3];
    if !(0.0..=MAX_PCF_RADIUS as f64).contains(&radius) {
        return Err(ConfigError::InvalidPcfRadius {
            max: MAX_PCF_RADIUS,
            got: radius,
        });
    }

    let view_projection = utils::mat4_from_slice(&data[4..20])
        .ok_or(ConfigError::SingularTransform("light view-projection"))?;

    Ok(Some(ShadowMap {
        view_projection,
        depth,
        width,
        height,
        bias,
        pcf_radius: radius as u32,
    }))
}

fn check_buffers(
    frame: &FrameUniforms,
    color: &[f32],
    depth: &[f32],
    out_len: usize,
    worker_id: u32,
    worker_count: u32,
) -> Result<(), ConfigError> {
    if worker_count == 0 || worker_id >= worker_count {
        return Err(ConfigError::InvalidWorker {
            worker_id,
            worker_count,
        });
    }
    let pixels = frame.pixel_count();
    let channels = pixels.saturating_mul(4);
    let checks = [
        ("color", channels, color.len()),
        ("depth", pixels, depth.len()),
        ("output", channels, out_len),
    ];
    for (name, expected, got) in checks {
        if got < expected {
            return Err(ConfigError::BufferTooSmall {
                name,
                expected,
                got,
            });
        }
    }
    Ok(())
}

/// Render the scanlines owned by `worker_id` into `out`.
///
/// Returns the number of rows written.
#[allow(clippy::too_many_arguments)]
pub fn render_rows<S: ShadowTest + ?Sized>(
    frame: &FrameUniforms,
    light: &LightCone,
    config: &VolumetricConfig,
    shadow: &S,
    color: &[f32],
    depth: &[f32],
    out: &mut [f32],
    worker_id: u32,
    worker_count: u32,
) -> Result<u32, ConfigError> {
    check_buffers(frame, color, depth, out.len(), worker_id, worker_count)?;

    let w = frame.width;
    let h = frame.height;
    let mut rows_rendered = 0u32;
    let mut lit_pixels = 0usize;

    let mut y = worker_id;
    while y < h {
        let row_start = y as usize * w as usize;
        for x in 0..w {
            let idx = row_start + x as usize;
            let uv = reconstruct::pixel_uv(x, y, w, h);
            let ray = raymarcher::build_ray(uv, depth[idx] as f64, frame);
            let offset = if config.jitter {
                utils::interleaved_gradient_noise(x, y)
            } else {
                0.0
            };

            let march = raymarcher::march(&ray, light, config, shadow, offset);
            if march.accumulated > 0 {
                lit_pixels += 1;
            }

            let ci = idx * 4;
            let scene = DVec3::new(color[ci] as f64, color[ci + 1] as f64, color[ci + 2] as f64);
            let rgba = composite::composite(scene, march.radiance);
            out[ci] = rgba.x as f32;
            out[ci + 1] = rgba.y as f32;
            out[ci + 2] = rgba.z as f32;
            out[ci + 3] = rgba.w as f32;
        }
        rows_rendered += 1;
        y = match y.checked_add(worker_count) {
            Some(next) => next,
            None => break,
        };
    }

    tracing::debug!(
        worker_id,
        worker_count,
        rows_rendered,
        lit_pixels,
        "volumetric rows rendered"
    );
    Ok(rows_rendered)
}

#[allow(clippy::too_many_arguments)]
fn parse_and_render(
    config_params: &[f64],
    frame_params: &[f64],
    light_params: &[f64],
    shadow_params: &[f64],
    color: &[f32],
    depth: &[f32],
    shadow_depth: &[f32],
    out: &mut [f32],
    worker_id: u32,
    worker_count: u32,
) -> Result<u32, ConfigError> {
    let config = VolumetricConfig::from_buffer(config_params)?;
    let frame = FrameUniforms::from_buffer(frame_params)?;
    let light = LightCone::from_buffer(light_params)?;
    match shadow_map_from_buffer(shadow_params, shadow_depth, config.shadow_bias)? {
        Some(map) => render_rows(
            &frame,
            &light,
            &config,
            &map,
            color,
            depth,
            out,
            worker_id,
            worker_count,
        ),
        None => render_rows(
            &frame,
            &light,
            &config,
            &Unshadowed,
            color,
            depth,
            out,
            worker_id,
            worker_count,
        ),
    }
}

/// Parse every flat parameter buffer and render the worker's rows.
#[allow(clippy::too_many_arguments)]
pub fn render_from_buffers(
    config_params: &[f64],
    frame_params: &[f64],
    light_params: &[f64],
    shadow_params: &[f64],
    color: &[f32],
    depth: &[f32],
    shadow_depth: &[f32],
    out: &mut [f32],
    worker_id: u32,
    worker_count: u32,
) -> Result<u32, ConfigError> {
    let result = parse_and_render(
        config_params,
        frame_params,
        light_params,
        shadow_params,
        color,
        depth,
        shadow_depth,
        out,
        worker_id,
        worker_count,
    );
    if let Err(e) = &result {
        tracing::warn!(error = %e, "volumetric pass rejected its inputs");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DMat4;

    const W: u32 = 16;
    const H: u32 = 12;

    fn frame() -> FrameUniforms {
        let eye = DVec3::new(0.0, 0.0, 5.0);
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let aspect = W as f64 / H as f64;
        let projection = DMat4::perspective_rh_gl(50f64.to_radians(), aspect, 0.1, 50.0);
        FrameUniforms::new(W, H, eye, 50.0, view, projection).unwrap()
    }

    fn light() -> LightCone {
        LightCone::new(DVec3::ZERO, DVec3::NEG_Z, 30.0, None).unwrap()
    }

    fn buffers() -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        let n = (W * H) as usize;
        let mut color = vec![0.0f32; n * 4];
        for px in color.chunks_exact_mut(4) {
            px.copy_from_slice(&[0.1, 0.2, 0.3, 0.5]);
        }
        (color, vec![1.0f32; n], vec![0.0f32; n * 4])
    }

    fn render(
        frame: &FrameUniforms,
        color: &[f32],
        depth: &[f32],
        out: &mut [f32],
        worker_id: u32,
        worker_count: u32,
    ) -> Result<u32, ConfigError> {
        render_rows(
            frame,
            &light(),
            &VolumetricConfig::default(),
            &Unshadowed,
            color,
            depth,
            out,
            worker_id,
            worker_count,
        )
    }

    fn shadow_params(size: f64, pcf_radius: f64) -> Vec<f64> {
        let mut params = vec![1.0, size, size, pcf_radius];
        params.extend_from_slice(&DMat4::IDENTITY.to_cols_array());
        params
    }

    #[test]
    fn test_render_all_rows() {
        let (color, depth, mut out) = buffers();
        let rows = render(&frame(), &color, &depth, &mut out, 0, 1).unwrap();
        assert_eq!(rows, H);
        for px in out.chunks_exact(4) {
            assert!(px[0] >= 0.1 && px[1] >= 0.2 && px[2] >= 0.3);
            assert_eq!(px[3], 1.0);
        }
        // The cone sits in the middle of the view, so the centre brightens.
        let centre = ((H / 2) * W + W / 2) as usize * 4;
        assert!(out[centre] > 0.1);
    }

    #[test]
    fn test_workers_cover_disjoint_rows() {
        let (color, depth, mut single) = buffers();
        render(&frame(), &color, &depth, &mut single, 0, 1).unwrap();

        let mut split = vec![0.0f32; single.len()];
        let mut total = 0;
        for worker in 0..3 {
            total += render(&frame(), &color, &depth, &mut split, worker, 3).unwrap();
        }
        assert_eq!(total, H);
        assert_eq!(single, split);
    }

    #[test]
    fn test_rejects_small_buffers_and_bad_worker() {
        let (color, depth, mut out) = buffers();
        let err = render(&frame(), &color[..8], &depth, &mut out, 0, 1).unwrap_err();
        assert!(matches!(err, ConfigError::BufferTooSmall { name: "color", .. }));

        let err = render(&frame(), &color, &depth, &mut out, 2, 2).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidWorker {
                worker_id: 2,
                worker_count: 2
            }
        );
    }

    #[test]
    fn test_oversized_frame_is_rejected_not_indexed() {
        // Sizes `FrameUniforms::new` refuses, forced in through the public fields.
        let huge = FrameUniforms {
            width: u32::MAX,
            height: u32::MAX,
            ..frame()
        };
        let mut out = [0.0f32; 4];
        let err = render(&huge, &[0.0; 4], &[1.0], &mut out, 0, 1).unwrap_err();
        assert!(matches!(err, ConfigError::BufferTooSmall { name: "color", .. }));
    }

    #[test]
    fn test_shadow_params() {
        let depth = vec![1.0f32; 4];
        assert!(shadow_map_from_buffer(&[], &depth, 0.0).unwrap().is_none());
        assert!(shadow_map_from_buffer(&[0.0], &depth, 0.0).unwrap().is_none());

        let params = shadow_params(2.0, 1.0);
        let map = shadow_map_from_buffer(&params, &depth, 0.01).unwrap().unwrap();
        assert_eq!((map.width, map.height, map.pcf_radius), (2, 2, 1));
        assert_eq!(map.bias, 0.01);

        assert!(matches!(
            shadow_map_from_buffer(&params, &depth[..3], 0.0),
            Err(ConfigError::BufferTooSmall {
                name: "shadow depth",
                ..
            })
        ));
        assert!(matches!(
            shadow_map_from_buffer(&params[..6], &depth, 0.0),
            Err(ConfigError::ParamsTooShort { name: "shadow", .. })
        ));
    }

    #[test]
    fn test_shadow_pcf_radius_is_bounded() {
        let depth = vec![1.0f32; 4];
        let max = MAX_PCF_RADIUS as f64;

        let map = shadow_map_from_buffer(&shadow_params(2.0, max), &depth, 0.0).unwrap();
        assert_eq!(map.unwrap().pcf_radius, MAX_PCF_RADIUS);

        for radius in [max + 1.0, 1e9, -1.0, f64::NAN] {
            assert!(
                matches!(
                    shadow_map_from_buffer(&shadow_params(2.0, radius), &depth, 0.0),
                    Err(ConfigError::InvalidPcfRadius {
                        max: MAX_PCF_RADIUS,
                        ..
                    })
                ),
                "radius {} accepted",
                radius
            );
        }
    }

    #[test]
    fn test_shadow_map_size_overflow_is_rejected() {
        let params = shadow_params(4_294_967_295.0, 0.0);
        assert_eq!(
            shadow_map_from_buffer(&params, &[1.0], 0.0).unwrap_err(),
            ConfigError::InvalidImageSize {
                width: u32::MAX,
                height: u32::MAX
            }
        );
    }

    #[test]
    fn test_render_from_buffers_reports_errors() {
        let (color, depth, mut out) = buffers();
        let err = render_from_buffers(&[-1.0], &[], &[], &[], &color, &depth, &[], &mut out, 0, 1)
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidStepSize(-1.0));
    }
}
