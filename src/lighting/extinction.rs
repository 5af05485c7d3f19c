//! Beer-Lambert extinction.

/// Optical depth of one march step.
#[inline(always)]
pub fn optical_depth(density: f64, step_length: f64, absorption: f64) -> f64 {
    density * step_length * absorption
}

/// Fraction of light surviving `optical_depth`.
///
/// Exactly 1 at zero depth and in (0, 1] for non-negative input.
#[inline(always)]
pub fn transmittance(optical_depth: f64) -> f64 {
    (-optical_depth).exp()
}
