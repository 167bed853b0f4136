//! Tracking-wheel odometry.
//!
//! Sensors are consumed through the [`RotarySensor`] and [`HeadingSensor`]
//! traits so the same tracking math runs against real hardware, a simulator,
//! or test mocks. [`Odometry`] bundles up to three tracking wheels and a
//! heading sensor and owns the per-cycle pose update in
//! [`Odometry::track_cycle`].

use alloc::boxed::Box;
use core::f64::consts::PI;

use libm::sin;

use crate::pose::Pose;

/// A rotating distance sensor (rotation sensor, encoder, or motor encoder).
pub trait RotarySensor {
    /// Accumulated rotation in full revolutions. Signed, monotonic between
    /// resets.
    fn revolutions(&self) -> f64;

    /// Re-zeros the underlying reading to establish a new reference frame.
    fn reset(&mut self);
}

/// An absolute heading source such as an inertial sensor.
pub trait HeadingSensor {
    /// Accumulated rotation in radians, counter-clockwise positive.
    fn rotation_radians(&self) -> f64;

    /// Re-zeros the underlying reading.
    fn reset(&mut self);

    fn rotation_degrees(&self) -> f64 {
        self.rotation_radians().to_degrees()
    }
}

/// A free-spinning, sensor-instrumented wheel used purely for distance
/// measurement.
///
/// Converts the raw rotating-sensor position into linear travel in inches,
/// accounting for wheel diameter and gearing, and caches the previous reading
/// for differencing by the tracking algorithm.
pub struct TrackingWheel {
    sensor: Box<dyn RotarySensor>,
    wheel_diameter: f64,
    gear_ratio: f64,
    offset: f64,
    last_position: f64,
}

impl TrackingWheel {
    /// A directly-driven tracking wheel (1:1 gearing).
    ///
    /// `offset` is the signed lateral distance of the wheel from the tracking
    /// center, in inches.
    pub fn new(sensor: Box<dyn RotarySensor>, wheel_diameter: f64, offset: f64) -> Self {
        Self::with_gearing(sensor, wheel_diameter, offset, 1.0)
    }

    /// `gear_ratio` is wheel revolutions per sensor revolution.
    pub fn with_gearing(
        sensor: Box<dyn RotarySensor>,
        wheel_diameter: f64,
        offset: f64,
        gear_ratio: f64,
    ) -> Self {
        Self {
            sensor,
            wheel_diameter,
            gear_ratio,
            offset,
            last_position: 0.0,
        }
    }

    /// Linear travel in inches since the last reset. No side effects.
    pub fn distance(&self) -> f64 {
        self.sensor.revolutions() * self.gear_ratio * self.wheel_diameter * PI
    }

    /// Signed lateral distance of this wheel from the tracking center.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Cached reading from the previous tracking cycle.
    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    pub fn set_last_position(&mut self, position: f64) {
        self.last_position = position;
    }

    /// Re-zeros the underlying sensor and the cached position.
    pub fn reset(&mut self) {
        self.sensor.reset();
        self.last_position = 0.0;
    }
}

/// One odometry snapshot: wheel distances in inches, heading in radians.
///
/// Components whose sensor is absent read 0.0; callers that require a sensor
/// must not rely on the placeholder.
#[derive(Default, Copy, Clone, Debug)]
pub struct OdometryReadings {
    pub left: f64,
    pub right: f64,
    pub back: f64,
    pub heading: f64,
}

/// Sensor bundle for pose tracking.
///
/// Every sensor is independently optional. The tracking algorithm itself
/// requires a left wheel, a back wheel, and a heading sensor; check
/// [`Odometry::supports_tracking`] at configuration time before enabling the
/// tracking loop.
#[derive(Default)]
pub struct Odometry {
    left: Option<TrackingWheel>,
    right: Option<TrackingWheel>,
    back: Option<TrackingWheel>,
    heading: Option<Box<dyn HeadingSensor>>,
}

impl Odometry {
    pub fn new(
        left: Option<TrackingWheel>,
        right: Option<TrackingWheel>,
        back: Option<TrackingWheel>,
        heading: Option<Box<dyn HeadingSensor>>,
    ) -> Self {
        Self {
            left,
            right,
            back,
            heading,
        }
    }

    /// Heading-only odometry, e.g. for field-centric teleop without pose
    /// tracking.
    pub fn heading_only(heading: Box<dyn HeadingSensor>) -> Self {
        Self {
            heading: Some(heading),
            ..Self::default()
        }
    }

    /// Whether the sensor set is sufficient for [`Self::track_cycle`].
    pub fn supports_tracking(&self) -> bool {
        self.left.is_some() && self.back.is_some() && self.heading.is_some()
    }

    /// Snapshot of the current sensor readings. Recomputed on demand, never
    /// stored.
    pub fn readings(&self) -> OdometryReadings {
        OdometryReadings {
            left: self.left.as_ref().map_or(0.0, TrackingWheel::distance),
            right: self.right.as_ref().map_or(0.0, TrackingWheel::distance),
            back: self.back.as_ref().map_or(0.0, TrackingWheel::distance),
            heading: self.rotation_radians(),
        }
    }

    /// Current heading in radians, or exactly 0.0 when no heading sensor is
    /// configured.
    pub fn rotation_radians(&self) -> f64 {
        self.heading.as_ref().map_or(0.0, |h| h.rotation_radians())
    }

    /// Current heading in degrees, or exactly 0.0 when no heading sensor is
    /// configured.
    pub fn rotation_degrees(&self) -> f64 {
        self.heading.as_ref().map_or(0.0, |h| h.rotation_degrees())
    }

    /// Re-zeros all attached sensors (the underlying readings, not just the
    /// cached positions) to establish a new reference frame.
    pub fn reset(&mut self) {
        for wheel in [&mut self.left, &mut self.right, &mut self.back]
            .into_iter()
            .flatten()
        {
            wheel.reset();
        }
        if let Some(heading) = self.heading.as_mut() {
            heading.reset();
        }
    }

    /// Runs one tracking cycle, producing the pose that follows `previous`.
    ///
    /// Exact-arc odometry: each cycle's motion is treated as travel along a
    /// circular arc, with the chord correction `2·sin(Δθ/2)·(Δd/Δθ + offset)`
    /// applied per axis and the local displacement rotated into the global
    /// frame at the cycle's midpoint heading. The new heading is taken
    /// directly from the sensor rather than accumulated, so heading drift
    /// stays bounded by sensor accuracy.
    /// See <https://thepilons.ca/wp-content/uploads/2018/10/Tracking.pdf>.
    ///
    /// # Panics
    ///
    /// Panics if the left wheel, back wheel, or heading sensor is absent.
    /// Tracking with a partial sensor set is a configuration error, and a
    /// silently wrong pose is worse than a crash.
    //
    // TODO: support a two-wheel parallel setup (left + right, no back wheel)
    // with heading derived from the wheel difference.
    pub fn track_cycle(&mut self, previous: Pose) -> Pose {
        assert!(
            self.heading.is_some(),
            "pose tracking requires a heading sensor"
        );
        let readings = self.readings();

        let left = self
            .left
            .as_mut()
            .expect("pose tracking requires a left tracking wheel");
        let left_change = readings.left - left.last_position();
        left.set_last_position(readings.left);
        let left_offset = left.offset();

        let back = self
            .back
            .as_mut()
            .expect("pose tracking requires a back tracking wheel");
        let back_change = readings.back - back.last_position();
        back.set_last_position(readings.back);
        let back_offset = back.offset();

        // The right wheel is kept current in the snapshot but the two-wheel
        // model does not consume it.
        if let Some(right) = self.right.as_mut() {
            right.set_last_position(readings.right);
        }

        let delta_theta = readings.heading - previous.heading;

        let local = if delta_theta == 0.0 {
            Pose::new(back_change, left_change, delta_theta)
        } else {
            let chord = 2.0 * sin(delta_theta / 2.0);
            Pose::new(
                chord * (back_change / delta_theta + back_offset),
                chord * (left_change / delta_theta + left_offset),
                delta_theta,
            )
        };

        // Midpoint heading keeps the projection first-order accurate over
        // the cycle.
        let theta_mid = previous.heading + delta_theta / 2.0;
        let global = local.rotate(-theta_mid);

        Pose::new(
            previous.x + global.x,
            previous.y + global.y,
            readings.heading,
        )
    }
}
