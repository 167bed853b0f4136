//! Angle and field-unit helpers. Distances are inches everywhere.

use core::f64::consts::{PI, TAU};

/// Wraps an angle in radians into [-pi, pi).
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI) % TAU;
    if wrapped < 0.0 {
        wrapped + TAU - PI
    } else {
        wrapped - PI
    }
}

pub fn ft(feet: f64) -> f64 {
    feet * 12.0
}

/// One competition field tile (2 ft).
pub fn tile(tiles: f64) -> f64 {
    tiles * 24.0
}

pub fn m(meters: f64) -> f64 {
    meters * 39.3701
}

pub fn cm(centimeters: f64) -> f64 {
    centimeters * 0.393701
}
