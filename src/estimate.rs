use crate::feature::Features;
use crate::math;

use serde_derive::{Deserialize, Serialize};

/// Rounded centroid and spread of the matched points in one frame
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionEstimate {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "stdx")]
    pub spread_x: i32,
    #[serde(rename = "stdy")]
    pub spread_y: i32,
}

impl PositionEstimate {
    #[inline]
    pub fn new(x: i32, y: i32, spread_x: i32, spread_y: i32) -> Self {
        Self {
            x,
            y,
            spread_x,
            spread_y,
        }
    }
}

/// Centroid and spread over the target positions of `matches`.
///
/// A target matched several times is counted every time. Returns `None` when
/// there are no matches or any target index is outside `target`.
pub fn estimate(target: &Features, matches: &[(usize, usize)]) -> Option<PositionEstimate> {
    let points = target.points();
    let matched = matches
        .iter()
        .map(|&(_, t)| points.get(t))
        .collect::<Option<Vec<_>>>()?;
    let (mean, std) = math::mean_std(matched)?;

    Some(PositionEstimate::new(
        mean.x.round() as i32,
        mean.y.round() as i32,
        std.x.round() as i32,
        std.y.round() as i32,
    ))
}
