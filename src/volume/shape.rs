//! Soft occupancy of the light volume.

use crate::math::utils;

/// Convert a signed cone distance into a [0, 1] occupancy factor.
///
/// The transition band is `edge_width` wide and centred on the boundary:
/// 1 for `distance <= -edge_width / 2`, 0 for `distance >= edge_width / 2`,
/// smooth and monotonically non-increasing in between.
#[inline]
pub fn shape_factor(distance: f64, edge_width: f64) -> f64 {
    let half = edge_width * 0.5;
    1.0 - utils::smoothstep(-half, half, distance)
}
