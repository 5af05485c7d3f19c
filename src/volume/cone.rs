//! Signed distance to the light cone.
//!
//! The cone is described by its apex, a unit axis pointing from the apex
//! into the scene, and a half-angle in (0, π/2). Distances are negative
//! inside the lit volume, zero on its boundary and positive outside.

use glam::{DVec2, DVec3};

use crate::math::utils;

/// Decompose `p` into (height along the axis, radial offset from the axis).
#[inline(always)]
fn axial_radial(p: DVec3, apex: DVec3, axis: DVec3) -> (DVec3, f64, f64) {
    let rel = p - apex;
    let h = rel.dot(axis);
    let r = (rel - axis * h).length();
    (rel, h, r)
}

/// Exact SDF to an infinite cone.
pub fn cone_distance(p: DVec3, apex: DVec3, axis: DVec3, half_angle: f64) -> f64 {
    let (sin_a, cos_a) = half_angle.sin_cos();
    let (rel, h, r) = axial_radial(p, apex, axis);

    let d_surface = r * cos_a - h * sin_a;
    let d_apex_plane = -h;

    // Behind the apex plane the rounded combinator below overestimates,
    // so resolve the nearest feature directly: the apex itself when the
    // foot of the perpendicular on the slant line falls behind it,
    // otherwise the slant line.
    if h < 0.0 && d_surface > 0.0 {
        if r * sin_a + h * cos_a < 0.0 {
            return rel.length();
        }
        return d_surface;
    }

    let boundary = DVec2::new(d_surface, d_apex_plane);
    boundary.max(DVec2::ZERO).length() + boundary.x.max(boundary.y).min(0.0)
}

/// Exact SDF to a cone capped by a flat disc at `range` along the axis.
///
/// Inigo Quilez's bounded cone, evaluated in the (radial, -height) plane.
pub fn capped_cone_distance(
    p: DVec3,
    apex: DVec3,
    axis: DVec3,
    half_angle: f64,
    range: f64,
) -> f64 {
    let (_, h, r) = axial_radial(p, apex, axis);

    let q = DVec2::new(range * half_angle.tan(), -range);
    let w = DVec2::new(r, -h);

    let a = w - q * utils::clamp(w.dot(q) / q.dot(q), 0.0, 1.0);
    let b = w - q * DVec2::new(utils::clamp(w.x / q.x, 0.0, 1.0), 1.0);
    let k = q.y.signum();
    let d = a.dot(a).min(b.dot(b));
    let s = (k * (w.x * q.y - w.y * q.x)).max(k * (w.y - q.y));

    d.sqrt() * s.signum()
}
