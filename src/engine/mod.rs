//! Volumetric light engine.
//!
//! `raymarcher` holds the per-pixel march, `pass` drives it over a frame,
//! `config` and `types` carry the validated inputs.

pub mod config;
pub mod pass;
pub mod raymarcher;
pub mod types;
