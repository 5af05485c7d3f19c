//! Pass configuration and its validation.
//!
//! Every tunable of the volumetric pass lives in `VolumetricConfig`. The
//! host can ship it either as a plain JS object (serde) or as a flat
//! `Float64Array`; both paths end in `validate()`, so a config that reaches
//! the raymarcher is always well-formed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected pass inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),

    #[error("max steps must be at least 1")]
    ZeroMaxSteps,

    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("anisotropy g must lie in (-1, 1), got {0}")]
    InvalidAnisotropy(f64),

    #[error("edge width must be positive and finite, got {0}")]
    InvalidEdgeWidth(f64),

    #[error("shape threshold must lie in [0, 1), got {0}")]
    InvalidShapeThreshold(f64),

    #[error("initial transmittance must be positive and finite, got {0}")]
    InvalidTransmittance(f64),

    #[error("cone angle must lie in (0, 180) degrees, got {0}")]
    InvalidConeAngle(f64),

    #[error("light range must be positive when set, got {0}")]
    InvalidRange(f64),

    #[error("light axis must be a unit vector, got length {0}")]
    NonUnitAxis(f64),

    #[error("{0} matrix is not invertible")]
    SingularTransform(&'static str),

    #[error("camera far plane must be positive and finite, got {0}")]
    InvalidFar(f64),

    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("{name} parameters need at least {expected} values, got {got}")]
    ParamsTooShort {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{name} buffer holds {got} values, expected at least {expected}")]
    BufferTooSmall {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("PCF radius must lie in [0, {max}] texels, got {got}")]
    InvalidPcfRadius { max: u32, got: f64 },

    #[error("worker {worker_id} is out of range for {worker_count} workers")]
    InvalidWorker { worker_id: u32, worker_count: u32 },
}

/// Tunables for the volumetric cone pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumetricConfig {
    /// World-space distance between march samples
    pub step_size: f64,
    /// Hard iteration cap per pixel
    pub max_steps: u32,
    /// Fog density inside the cone
    pub base_density: f64,
    /// Linear RGB light color
    pub light_color: [f64; 3],
    pub light_intensity: f64,
    /// Henyey-Greenstein g in (-1, 1)
    pub anisotropy: f64,
    /// Exponential falloff with distance from the apex
    pub attenuation: f64,
    /// Extinction coefficient for Beer's law
    pub absorption: f64,
    /// Width of the soft cone boundary
    pub edge_width: f64,
    pub shadow_bias: f64,
    /// Samples with a smaller shape factor are skipped
    pub shape_threshold: f64,
    /// Starting transmittance T₀
    pub initial_transmittance: f64,
    /// Offset each pixel's first sample by a fraction of a step
    pub jitter: bool,
}

impl Default for VolumetricConfig {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            max_steps: 128,
            base_density: 0.3,
            light_color: [1.0, 1.0, 1.0],
            light_intensity: 1.0,
            anisotropy: 0.5,
            attenuation: 0.1,
            absorption: 1.0,
            edge_width: 0.1,
            shadow_bias: 0.005,
            shape_threshold: 0.01,
            initial_transmittance: 1.0,
            jitter: false,
        }
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

impl VolumetricConfig {
    /// Number of values in the flat parameter layout.
    pub const BUFFER_LEN: usize = 15;

    /// Check every precondition the raymarcher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(ConfigError::InvalidStepSize(self.step_size));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        non_negative("base density", self.base_density)?;
        for c in self.light_color {
            non_negative("light color", c)?;
        }
        non_negative("light intensity", self.light_intensity)?;
        non_negative("attenuation", self.attenuation)?;
        non_negative("absorption", self.absorption)?;
        non_negative("shadow bias", self.shadow_bias)?;
        if !(self.anisotropy > -1.0 && self.anisotropy < 1.0) {
            return Err(ConfigError::InvalidAnisotropy(self.anisotropy));
        }
        if !(self.edge_width.is_finite() && self.edge_width > 0.0) {
            return Err(ConfigError::InvalidEdgeWidth(self.edge_width));
        }
        if !(self.shape_threshold >= 0.0 && self.shape_threshold < 1.0) {
            return Err(ConfigError::InvalidShapeThreshold(self.shape_threshold));
        }
        if !(self.initial_transmittance.is_finite() && self.initial_transmittance > 0.0) {
            return Err(ConfigError::InvalidTransmittance(self.initial_transmittance));
        }
        Ok(())
    }

    /// Build a validated config from a flat parameter buffer.
    ///
    /// Layout: [step_size, max_steps, base_density,
    ///   color_r, color_g, color_b, intensity,
    ///   anisotropy, attenuation, absorption,
    ///   edge_width, shadow_bias, shape_threshold,
    ///   initial_transmittance, jitter]
    ///
    /// A shorter buffer overrides only the leading values; an empty one
    /// yields the defaults.
    pub fn from_buffer(data: &[f64]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |i: usize| data.get(i).copied();

        if let Some(v) = get(0) {
            config.step_size = v;
        }
        if let Some(v) = get(1) {
            if !(v.is_finite() && v >= 1.0) {
                return Err(ConfigError::ZeroMaxSteps);
            }
            config.max_steps = v as u32;
        }
        if let Some(v) = get(2) {
            config.base_density = v;
        }
        for c in 0..3 {
            if let Some(v) = get(3 + c) {
                config.light_color[c] = v;
            }
        }
        if let Some(v) = get(6) {
            config.light_intensity = v;
        }
        if let Some(v) = get(7) {
            config.anisotropy = v;
        }
        if let Some(v) = get(8) {
            config.attenuation = v;
        }
        if let Some(v) = get(9) {
            config.absorption = v;
        }
        if let Some(v) = get(10) {
            config.edge_width = v;
        }
        if let Some(v) = get(11) {
            config.shadow_bias = v;
        }
        if let Some(v) = get(12) {
            config.shape_threshold = v;
        }
        if let Some(v) = get(13) {
            config.initial_transmittance = v;
        }
        if let Some(v) = get(14) {
            config.jitter = v != 0.0;
        }

        config.validate()?;
        Ok(config)
    }

    /// Flatten into the `from_buffer` layout.
    pub fn to_buffer(&self) -> Vec<f64> {
        vec![
            self.step_size,
            self.max_steps as f64,
            self.base_density,
            self.light_color[0],
            self.light_color[1],
            self.light_color[2],
            self.light_intensity,
            self.anisotropy,
            self.attenuation,
            self.absorption,
            self.edge_width,
            self.shadow_bias,
            self.shape_threshold,
            self.initial_transmittance,
            if self.jitter { 1.0 } else { 0.0 },
        ]
    }
}
