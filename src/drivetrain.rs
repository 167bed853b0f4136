//! Drivetrain models and kinematics mixing.
//!
//! Motor hardware is reached through the [`MotorGroup`] collaborator trait;
//! the drivetrain types only decide *which* group gets *which* power. Power
//! values follow the [-127, 127] joystick convention and are never clamped
//! here: callers are responsible for clipping to the motor's valid range.

use alloc::vec::Vec;

use libm::{cos, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stopping behavior for a motor group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BrakeMode {
    #[default]
    Coast,
    Brake,
    Hold,
}

/// Physical constants of an undercarriage.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriveGeometry {
    /// Drive wheel diameter in inches.
    pub wheel_diameter: f64,
    /// Distance between the left and right wheels in inches.
    pub track_width: f64,
    /// Output (wheel) speed over input (motor) speed.
    pub gear_ratio: f64,
}

impl DriveGeometry {
    pub const fn new(wheel_diameter: f64, track_width: f64, gear_ratio: f64) -> Self {
        Self {
            wheel_diameter,
            track_width,
            gear_ratio,
        }
    }
}

/// One physical motor group (one or more motors acting as a unit).
///
/// Borrowed from the caller's hardware-configuration layer; the drivetrain
/// never decides how commands reach silicon.
pub trait MotorGroup {
    /// Commands the group's output power, [-127, 127] convention. Out-of-range
    /// values are passed through untouched.
    fn set_power(&mut self, power: f64);

    fn set_brake_mode(&mut self, mode: BrakeMode);

    fn brake_mode(&self) -> BrakeMode;

    /// Current limit in milliamps, applied to every motor in the group.
    fn set_current_limit(&mut self, limit_ma: u32);

    /// One temperature reading (°C) per motor.
    fn temperatures(&self) -> Vec<f64>;

    /// One current draw reading (amps) per motor.
    fn current_draws(&self) -> Vec<f64>;

    /// One voltage reading (volts) per motor.
    fn voltages(&self) -> Vec<f64>;

    /// One velocity reading (rpm) per motor.
    fn velocities(&self) -> Vec<f64>;
}

/// Polymorphic contract over chassis kinematic layouts.
///
/// `set_motor_speeds` apportions an ordered power list to the physical motor
/// groups positionally; every telemetry method returns one reading list per
/// group in that same order, so commands and readings line up for testing.
pub trait Drivetrain {
    fn geometry(&self) -> &DriveGeometry;

    fn geometry_mut(&mut self) -> &mut DriveGeometry;

    /// Applies ordered power values to the motor groups.
    ///
    /// # Panics
    ///
    /// Panics when the slice length does not match the layout's actuator
    /// count (construction-time contract, not a runtime condition).
    fn set_motor_speeds(&mut self, speeds: &[f64]);

    /// Forces every motor group to zero power.
    fn stop(&mut self);

    fn set_brake_mode(&mut self, mode: BrakeMode);

    fn brake_mode(&self) -> BrakeMode;

    fn set_current_limit(&mut self, limit_ma: u32);

    fn temperatures(&self) -> Vec<Vec<f64>>;

    fn current_draws(&self) -> Vec<Vec<f64>>;

    fn voltages(&self) -> Vec<Vec<f64>>;

    fn velocities(&self) -> Vec<Vec<f64>>;
}

/// Tank-style undercarriage: left and right motor groups.
///
/// Speed order: `[left, right]`.
pub struct DifferentialDrivetrain<M: MotorGroup> {
    left: M,
    right: M,
    geometry: DriveGeometry,
}

impl<M: MotorGroup> DifferentialDrivetrain<M> {
    pub fn new(left: M, right: M, geometry: DriveGeometry) -> Self {
        Self {
            left,
            right,
            geometry,
        }
    }

    pub fn left_motors(&mut self) -> &mut M {
        &mut self.left
    }

    pub fn right_motors(&mut self) -> &mut M {
        &mut self.right
    }
}

impl<M: MotorGroup> Drivetrain for DifferentialDrivetrain<M> {
    fn geometry(&self) -> &DriveGeometry {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut DriveGeometry {
        &mut self.geometry
    }

    fn set_motor_speeds(&mut self, speeds: &[f64]) {
        assert_eq!(
            speeds.len(),
            2,
            "differential drivetrains take exactly [left, right] speeds"
        );
        self.left.set_power(speeds[0]);
        self.right.set_power(speeds[1]);
    }

    fn stop(&mut self) {
        self.set_motor_speeds(&[0.0, 0.0]);
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.left.set_brake_mode(mode);
        self.right.set_brake_mode(mode);
    }

    fn brake_mode(&self) -> BrakeMode {
        self.left.brake_mode()
    }

    fn set_current_limit(&mut self, limit_ma: u32) {
        self.left.set_current_limit(limit_ma);
        self.right.set_current_limit(limit_ma);
    }

    fn temperatures(&self) -> Vec<Vec<f64>> {
        [&self.left, &self.right]
            .map(MotorGroup::temperatures)
            .into_iter()
            .collect()
    }

    fn current_draws(&self) -> Vec<Vec<f64>> {
        [&self.left, &self.right]
            .map(MotorGroup::current_draws)
            .into_iter()
            .collect()
    }

    fn voltages(&self) -> Vec<Vec<f64>> {
        [&self.left, &self.right]
            .map(MotorGroup::voltages)
            .into_iter()
            .collect()
    }

    fn velocities(&self) -> Vec<Vec<f64>> {
        [&self.left, &self.right]
            .map(MotorGroup::velocities)
            .into_iter()
            .collect()
    }
}

/// Holonomic (mecanum/X-drive style) undercarriage with an optional side
/// motor group for dedicated lateral actuation.
///
/// Speed order: `[front_left, front_right, back_left, back_right]`, with an
/// optional fifth value for the side group. When only four values are given,
/// the side group's command is left unchanged, not zeroed.
pub struct HolonomicDrivetrain<M: MotorGroup> {
    front_left: M,
    front_right: M,
    back_left: M,
    back_right: M,
    side: Option<M>,
    geometry: DriveGeometry,
}

impl<M: MotorGroup> HolonomicDrivetrain<M> {
    pub fn new(
        front_left: M,
        front_right: M,
        back_left: M,
        back_right: M,
        geometry: DriveGeometry,
    ) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
            side: None,
            geometry,
        }
    }

    pub fn with_side_motors(
        front_left: M,
        front_right: M,
        back_left: M,
        back_right: M,
        side: M,
        geometry: DriveGeometry,
    ) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
            side: Some(side),
            geometry,
        }
    }

    pub fn side_motors(&mut self) -> Option<&mut M> {
        self.side.as_mut()
    }

    fn groups(&self) -> impl Iterator<Item = &M> {
        [
            &self.front_left,
            &self.front_right,
            &self.back_left,
            &self.back_right,
        ]
        .into_iter()
        .chain(self.side.as_ref())
    }

    fn groups_mut(&mut self) -> impl Iterator<Item = &mut M> {
        [
            &mut self.front_left,
            &mut self.front_right,
            &mut self.back_left,
            &mut self.back_right,
        ]
        .into_iter()
        .chain(self.side.as_mut())
    }
}

impl<M: MotorGroup> Drivetrain for HolonomicDrivetrain<M> {
    fn geometry(&self) -> &DriveGeometry {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut DriveGeometry {
        &mut self.geometry
    }

    fn set_motor_speeds(&mut self, speeds: &[f64]) {
        assert!(
            speeds.len() == 4 || speeds.len() == 5,
            "holonomic drivetrains take [fl, fr, bl, br] speeds plus an optional side speed"
        );
        self.front_left.set_power(speeds[0]);
        self.front_right.set_power(speeds[1]);
        self.back_left.set_power(speeds[2]);
        self.back_right.set_power(speeds[3]);

        if let (Some(side), Some(&speed)) = (self.side.as_mut(), speeds.get(4)) {
            side.set_power(speed);
        }
    }

    fn stop(&mut self) {
        for group in self.groups_mut() {
            group.set_power(0.0);
        }
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        for group in self.groups_mut() {
            group.set_brake_mode(mode);
        }
    }

    fn brake_mode(&self) -> BrakeMode {
        self.front_left.brake_mode()
    }

    fn set_current_limit(&mut self, limit_ma: u32) {
        for group in self.groups_mut() {
            group.set_current_limit(limit_ma);
        }
    }

    fn temperatures(&self) -> Vec<Vec<f64>> {
        self.groups().map(MotorGroup::temperatures).collect()
    }

    fn current_draws(&self) -> Vec<Vec<f64>> {
        self.groups().map(MotorGroup::current_draws).collect()
    }

    fn voltages(&self) -> Vec<Vec<f64>> {
        self.groups().map(MotorGroup::voltages).collect()
    }

    fn velocities(&self) -> Vec<Vec<f64>> {
        self.groups().map(MotorGroup::velocities).collect()
    }
}

/// Arcade mixing for a differential layout: `[throttle + turn, throttle - turn]`.
pub fn arcade_mix(throttle: f64, turn: f64) -> [f64; 2] {
    [throttle + turn, throttle - turn]
}

/// Classic 4-wheel holonomic mixing matrix.
///
/// Resolves `translation` along `angle` (radians, robot frame) and overlays
/// `rotation`, producing `[front_left, front_right, back_left, back_right]`
/// powers. Unsaturated.
pub fn holonomic_mix(angle: f64, translation: f64, rotation: f64) -> [f64; 4] {
    let x = cos(angle) * translation;
    let y = sin(angle) * translation;
    [
        y + x + rotation,
        -y + x + rotation,
        y - x + rotation,
        -y - x + rotation,
    ]
}
