//! Light transport for the volumetric pass.
//!
//! - Henyey-Greenstein phase function
//! - Beer-Lambert extinction
//! - Shadow-map visibility (binary or PCF)
//! - Additive compositing over the scene color

pub mod composite;
pub mod extinction;
pub mod phase;
pub mod shadow;
