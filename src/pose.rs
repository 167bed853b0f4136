use core::fmt;

use libm::{cos, hypot, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2-D position plus heading.
///
/// `heading` is in radians and is **not** normalized automatically; code that
/// differences headings must handle wraparound itself (see
/// [`normalize_angle`](crate::utils::normalize_angle)).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Rotates the displacement component `(x, y)` counter-clockwise by
    /// `angle` radians about the origin. `heading` is carried through
    /// unchanged; this is a plain vector rotation, not pose composition.
    pub fn rotate(&self, angle: f64) -> Self {
        let (s, c) = (sin(angle), cos(angle));
        Self {
            x: self.x * c - self.y * s,
            y: self.x * s + self.y * c,
            heading: self.heading,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            heading: self.heading,
        }
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance(&self, other: &Self) -> f64 {
        hypot(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2} rad)",
            self.x, self.y, self.heading
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn rotate_zero_vector_is_zero_for_any_angle() {
        for i in -8..=8 {
            let angle = i as f64 * PI / 4.0;
            let rotated = Pose::new(0.0, 0.0, 1.25).rotate(angle);
            assert_relative_eq!(rotated.x, 0.0);
            assert_relative_eq!(rotated.y, 0.0);
            assert_relative_eq!(rotated.heading, 1.25);
        }
    }

    #[test]
    fn rotate_quarter_turn() {
        let rotated = Pose::new(1.0, 0.0, 0.0).rotate(FRAC_PI_2);
        assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotate_preserves_length() {
        let pose = Pose::new(3.0, -4.0, 0.3);
        let rotated = pose.rotate(1.7);
        assert_relative_eq!(
            hypot(rotated.x, rotated.y),
            5.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn translate_and_distance() {
        let a = Pose::new(1.0, 2.0, 0.5);
        let b = a.translate(3.0, 4.0);
        assert_relative_eq!(b.x, 4.0);
        assert_relative_eq!(b.y, 6.0);
        assert_relative_eq!(b.heading, 0.5);
        assert_relative_eq!(a.distance(&b), 5.0);
    }
}
