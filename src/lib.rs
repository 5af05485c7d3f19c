use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod engine;
pub mod lighting;
pub mod math;
pub mod volume;

use engine::config::{ConfigError, VolumetricConfig};

/// Initialize the WASM module (runs once on load).
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    web_sys::console::log_1(&"lightshaft-wasm initialized".into());
}

#[derive(Serialize)]
struct ValidationError {
    error: String,
}

fn to_js_error(e: ConfigError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// Composite the volumetric light cone over the worker's scanlines.
///
/// Called from each Web Worker with its assigned scanline range.
///
/// `config_params` — Float64Array, see `VolumetricConfig::from_buffer`
/// `frame_params` — Float64Array: [width, height, camera xyz, far, view (16), projection (16)]
/// `light_params` — Float64Array: [apex xyz, axis xyz, cone_angle_deg, range]
/// `shadow_params` — Float64Array: [enabled, width, height, pcf_radius, view_projection (16)] or empty
/// `color` — Float32Array: linear RGBA scene color (width * height * 4)
/// `depth` — Float32Array: normalized depth (width * height)
/// `shadow_depth` — Float32Array: light-space depth map, may be empty when shadows are off
/// `out` — Float32Array view into the shared output (width * height * 4)
/// `worker_id` / `worker_count` — interleaved scanline assignment
///
/// Throws when any parameter block is rejected.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn render_volumetric_rows(
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
) -> Result<u32, JsValue> {
    engine::pass::render_from_buffers(
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
    )
    .map_err(to_js_error)
}

/// Quick render — full-frame pass + 8-bit packing in one call.
/// Useful for single-threaded preview rendering.
///
/// Writes RGBA bytes (width * height * 4) into `rgba_out`.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn render_volumetric_quick(
    config_params: &[f64],
    frame_params: &[f64],
    light_params: &[f64],
    shadow_params: &[f64],
    color: &[f32],
    depth: &[f32],
    shadow_depth: &[f32],
    rgba_out: &mut [u8],
    tone_map: bool,
) -> Result<(), JsValue> {
    let mut hdr = vec![0.0f32; color.len()];
    engine::pass::render_from_buffers(
        config_params,
        frame_params,
        light_params,
        shadow_params,
        color,
        depth,
        shadow_depth,
        &mut hdr,
        0,
        1,
    )
    .map_err(to_js_error)?;

    lighting::composite::encode_rgba8(&hdr, rgba_out, tone_map);
    Ok(())
}

/// Pack a composited linear RGBA Float32Array into RGBA bytes for a canvas.
#[wasm_bindgen]
pub fn encode_rgba8(hdr: &[f32], rgba_out: &mut [u8], tone_map: bool) {
    lighting::composite::encode_rgba8(hdr, rgba_out, tone_map);
}

/// Validate a config object without rendering.
///
/// Returns `null` when valid, `{ error }` otherwise. Falls back to the bare
/// message string if the error object cannot be built.
#[wasm_bindgen]
pub fn validate_config(config: JsValue) -> JsValue {
    let message = match serde_wasm_bindgen::from_value::<VolumetricConfig>(config) {
        Ok(config) => match config.validate() {
            Ok(()) => return JsValue::NULL,
            Err(e) => e.to_string(),
        },
        Err(e) => format!("Deserialization error: {}", e),
    };
    serde_wasm_bindgen::to_value(&ValidationError {
        error: message.clone(),
    })
    .unwrap_or_else(|_| JsValue::from_str(&message))
}

/// Convert a config object into the flat parameter layout.
#[wasm_bindgen]
pub fn config_to_buffer(config: JsValue) -> Result<Vec<f64>, JsValue> {
    let config: VolumetricConfig = serde_wasm_bindgen::from_value(config)?;
    config.validate().map_err(to_js_error)?;
    Ok(config.to_buffer())
}

/// Default configuration as a plain JS object.
#[wasm_bindgen]
pub fn default_config() -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(&VolumetricConfig::default())?)
}
