//! Henyey-Greenstein phase function.
//!
//! `mu` is the cosine between the view ray and the direction toward the
//! light; `g` in (-1, 1) biases scattering forward (g > 0) or backward
//! (g < 0). The 1/4π normalisation is folded into the light intensity.

/// Floor for the denominator base before raising it to 1.5.
pub const PHASE_DENOM_EPSILON: f64 = 1e-4;

/// Scattering weight for cosine `mu` and anisotropy `g`.
///
/// Non-negative and finite for every `mu` in [-1, 1]. It grows without
/// bound as `g → 1` and `mu → 1`; that peak is the forward-scattering lobe.
#[inline]
pub fn henyey_greenstein(mu: f64, g: f64) -> f64 {
    let g2 = g * g;
    let denom = (1.0 + g2 - 2.0 * g * mu).max(PHASE_DENOM_EPSILON);
    (1.0 - g2) / denom.powf(1.5)
}
