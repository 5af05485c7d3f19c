//! Math support for the volumetric pass.
//!
//! Vector and matrix types come from `glam` (f64 variants, matching the
//! precision the host ships parameters in).

pub mod reconstruct;
pub mod utils;
