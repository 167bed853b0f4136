//! Chassis: pose ownership, input scaling, teleop drive primitives, and the
//! background tracking loop's start-once guard.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::f64::consts::PI;
use core::time::Duration;

use libm::{atan2, copysign, fabs, hypot, sin, tan};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::drivetrain::{
    BrakeMode, DifferentialDrivetrain, Drivetrain, HolonomicDrivetrain, MotorGroup, arcade_mix,
    holonomic_mix,
};
use crate::odometry::Odometry;
use crate::pid::Pid;
use crate::pose::Pose;

/// Nominal period of the background tracking loop.
pub const TRACKING_PERIOD: Duration = Duration::from_millis(20);

/// Joystick response curve, applied to the input magnitude with the original
/// sign reapplied afterwards, so every curve is odd-symmetric around zero.
///
/// `Tan` and `XTan` are deliberately unclamped and may exceed the input range
/// at high deflections; callers clip to the motor's valid range.
///
/// Curve shapes: <https://www.desmos.com/calculator/xrfbyvksxi>
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InputScale {
    /// Direct mapping.
    #[default]
    Linear,
    /// Finer control at low speeds.
    Cubic,
    /// Even finer control at low speeds.
    Quintic,
    /// Smooth acceleration.
    Sin,
    /// Smooth acceleration and fine control at low speeds.
    SinSquared,
    /// Aggressive acceleration.
    Tan,
    /// Fine at low speeds, aggressive at high speeds.
    XTan,
}

impl InputScale {
    /// Applies the curve to a non-negative normalized magnitude.
    fn apply(self, magnitude: f64) -> f64 {
        match self {
            InputScale::Linear => magnitude,
            InputScale::Cubic => magnitude * magnitude * magnitude,
            InputScale::Quintic => {
                magnitude * magnitude * magnitude * magnitude * magnitude
            }
            InputScale::Sin => sin(magnitude * PI / 2.0),
            InputScale::SinSquared => {
                let s = sin(magnitude * PI / 2.0);
                s * s
            }
            InputScale::Tan => tan(magnitude),
            InputScale::XTan => magnitude * tan(magnitude),
        }
    }
}

/// Shared pose storage.
///
/// `get` and `set` copy the whole 3-field record inside a single borrow, so a
/// reader always observes a complete pre-cycle or post-cycle pose, never a
/// torn one. Handles are `Rc`-cloned between the chassis and the tracking
/// task; under vexide's single-core cooperative executor no borrow ever spans
/// a yield point.
#[derive(Clone, Default)]
pub struct PoseCell {
    inner: Rc<RefCell<Pose>>,
}

impl PoseCell {
    pub fn new(pose: Pose) -> Self {
        Self {
            inner: Rc::new(RefCell::new(pose)),
        }
    }

    pub fn get(&self) -> Pose {
        *self.inner.borrow()
    }

    pub fn set(&self, pose: Pose) {
        *self.inner.borrow_mut() = pose;
    }
}

/// Handle for driving the tracking loop.
///
/// Returned once per chassis by [`Chassis::begin_tracking`]; each
/// [`cycle`](Self::cycle) call runs one odometry update against the shared
/// pose. The vexide layer wraps this in a detached task waking every
/// [`TRACKING_PERIOD`]; a simulator or test can step it directly.
///
/// Dropping the context clears the chassis's tracking flag, so discarding an
/// undriven handle returns the chassis to idle instead of wedging it in a
/// tracking state with no loop alive.
pub struct TrackingContext {
    odometry: Rc<RefCell<Odometry>>,
    pose: PoseCell,
    active: Rc<Cell<bool>>,
}

impl TrackingContext {
    /// Runs one tracking cycle: snapshot the pose, advance it through the
    /// odometry model, publish the result.
    pub fn cycle(&self) {
        let previous = self.pose.get();
        let next = self.odometry.borrow_mut().track_cycle(previous);
        self.pose.set(next);
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

/// Gains, tolerances, and loop periods for one chassis.
///
/// The PID gains here are starting points; every robot needs its own tuning
/// pass.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct ChassisConfig {
    pub lateral_pid: Pid,
    pub turn_pid: Pid,
    pub input_scale: InputScale,
    /// Exit tolerance for `move_to_pose`, inches.
    pub lateral_tolerance: f64,
    /// Exit tolerance for `turn_angle`, degrees.
    pub turn_tolerance: f64,
    /// Closed-loop motion control period.
    pub dt: Duration,
    /// Safety timeout for closed-loop motion commands.
    pub motion_timeout: Duration,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            lateral_pid: Pid::new(6.0, 0.0, 0.5, 0.0),
            turn_pid: Pid::new(6.0, 0.0, 0.01, 0.0),
            input_scale: InputScale::Linear,
            lateral_tolerance: 1.0,
            turn_tolerance: 2.0,
            dt: Duration::from_millis(10),
            motion_timeout: Duration::from_secs(5),
        }
    }
}

/// A drivetrain plus the state needed to know where it is and how to steer
/// it: optional odometry, the live pose, input-scaling policy, and closed-
/// loop motion configuration.
///
/// Teleop primitives are single-shot: they compose input scaling with the
/// layout's kinematics mixing and command the motors once per call.
pub struct Chassis<D: Drivetrain> {
    pub(crate) drivetrain: D,
    pub(crate) odometry: Option<Rc<RefCell<Odometry>>>,
    pub(crate) pose: PoseCell,
    pub config: ChassisConfig,
    tracking: Rc<Cell<bool>>,
}

impl<D: Drivetrain> Chassis<D> {
    pub fn new(drivetrain: D, odometry: Odometry, config: ChassisConfig) -> Self {
        Self {
            drivetrain,
            odometry: Some(Rc::new(RefCell::new(odometry))),
            pose: PoseCell::default(),
            config,
            tracking: Rc::new(Cell::new(false)),
        }
    }

    /// A chassis with pose tracking disabled entirely.
    pub fn without_odometry(drivetrain: D, config: ChassisConfig) -> Self {
        Self {
            drivetrain,
            odometry: None,
            pose: PoseCell::default(),
            config,
            tracking: Rc::new(Cell::new(false)),
        }
    }

    pub fn drivetrain(&mut self) -> &mut D {
        &mut self.drivetrain
    }

    /// Snapshot of the current pose (value copy, never a shared reference).
    pub fn pose(&self) -> Pose {
        self.pose.get()
    }

    /// Overwrites the current pose. Plain overwrite, not a merge.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose.set(pose);
    }

    pub fn set_position(&mut self, x: f64, y: f64, heading: f64) {
        self.pose.set(Pose::new(x, y, heading));
    }

    /// Current heading from odometry in radians; 0.0 when no odometry or no
    /// heading sensor is configured.
    pub fn rotation_radians(&self) -> f64 {
        self.odometry
            .as_ref()
            .map_or(0.0, |odometry| odometry.borrow().rotation_radians())
    }

    pub fn set_input_scale(&mut self, scale: InputScale) {
        self.config.input_scale = scale;
    }

    pub fn input_scale(&self) -> InputScale {
        self.config.input_scale
    }

    /// Maps a joystick value in [-127, 127] through the selected response
    /// curve. The curve is applied to the magnitude and the original sign is
    /// reapplied, so `scale_input(-v) == -scale_input(v)` for every curve.
    pub fn scale_input(&self, input: f64) -> f64 {
        let normalized = input / 127.0;
        let scaled = self.config.input_scale.apply(fabs(normalized));
        copysign(scaled, normalized) * 127.0
    }

    /// Forcefully stops the drivetrain's motors.
    pub fn stop(&mut self) {
        self.drivetrain.stop();
    }

    pub fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.drivetrain.set_brake_mode(mode);
    }

    pub fn set_current_limit(&mut self, limit_ma: u32) {
        self.drivetrain.set_current_limit(limit_ma);
    }

    /// Re-zeros the odometry sensors (if present) and stops the motors to
    /// establish a new reference frame. With the `vexide` feature enabled
    /// this also ensures the tracking task is running.
    pub fn reset(&mut self) {
        if let Some(odometry) = &self.odometry {
            odometry.borrow_mut().reset();
        }
        self.drivetrain.stop();
        #[cfg(feature = "vexide")]
        self.start_tracking();
    }

    /// Whether a live [`TrackingContext`] exists for this chassis.
    pub fn is_tracking(&self) -> bool {
        self.tracking.get()
    }

    /// Transitions idle → tracking and hands out the loop's driving handle.
    ///
    /// Returns `None` if tracking is already running (the guard makes this
    /// idempotent: exactly one loop per chassis) or if the chassis has no
    /// odometry. Once a loop is driving the context, tracking runs for the
    /// program lifetime; dropping the context without driving it returns the
    /// chassis to idle, since no loop ever ran.
    ///
    /// # Panics
    ///
    /// Panics if odometry is present but missing a sensor the tracking
    /// algorithm requires; enabling tracking on a partial sensor set is a
    /// configuration error.
    pub fn begin_tracking(&mut self) -> Option<TrackingContext> {
        if self.tracking.get() {
            log::debug!("tracking already active");
            return None;
        }
        let odometry = self.odometry.clone()?;
        assert!(
            odometry.borrow().supports_tracking(),
            "pose tracking requires left and back tracking wheels and a heading sensor"
        );
        self.tracking.set(true);
        log::debug!("pose tracking enabled");
        Some(TrackingContext {
            odometry,
            pose: self.pose.clone(),
            active: Rc::clone(&self.tracking),
        })
    }
}

impl<M: MotorGroup> Chassis<DifferentialDrivetrain<M>> {
    /// Arcade drive: `left_y` is forward/backward, `right_x` is rotation.
    pub fn arcade(&mut self, left_y: f64, right_x: f64) {
        let throttle = self.scale_input(left_y);
        let turn = self.scale_input(right_x);
        self.drivetrain.set_motor_speeds(&arcade_mix(throttle, turn));
    }

    /// Tank drive: each stick commands its own side.
    pub fn tank(&mut self, left_y: f64, right_y: f64) {
        let speeds = [self.scale_input(left_y), self.scale_input(right_y)];
        self.drivetrain.set_motor_speeds(&speeds);
    }
}

impl<M: MotorGroup> Chassis<HolonomicDrivetrain<M>> {
    /// Drives at `angle` radians (robot frame) with the given translational
    /// and rotational speeds. Raw kinematics primitive: no input scaling, no
    /// saturation.
    pub fn drive_angle(&mut self, angle: f64, translation: f64, rotation: f64) {
        self.drivetrain
            .set_motor_speeds(&holonomic_mix(angle, translation, rotation));
    }

    /// Field-centric teleop: the translation stick is interpreted in the
    /// field frame by offsetting the drive angle with the odometry heading.
    pub fn field_centric_drive(&mut self, left_x: f64, left_y: f64, right_x: f64) {
        let rotation = self.scale_input(right_x);
        let angle = atan2(left_y, left_x);
        let speed = self.scale_input(hypot(left_x, left_y));
        let heading = self.rotation_radians();
        self.drive_angle(angle + heading, speed, rotation);
    }

    /// Robot-centric teleop: the translation stick is interpreted in the
    /// robot frame.
    pub fn robot_centric_drive(&mut self, left_x: f64, left_y: f64, right_x: f64) {
        let rotation = self.scale_input(right_x);
        let angle = atan2(left_y, left_x);
        let speed = self.scale_input(hypot(left_x, left_y));
        self.drive_angle(angle, speed, rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::DriveGeometry;
    use crate::odometry::TrackingWheel;
    use crate::testing::{MockHeading, MockMotors, MockRotary, SharedReading};
    use alloc::boxed::Box;
    use approx::assert_relative_eq;
    use core::f64::consts::FRAC_PI_2;

    fn differential(
        left: &MockMotors,
        right: &MockMotors,
    ) -> DifferentialDrivetrain<MockMotors> {
        DifferentialDrivetrain::new(left.clone(), right.clone(), DriveGeometry::new(3.25, 12.0, 1.0))
    }

    fn tracking_odometry() -> (Odometry, SharedReading, SharedReading, SharedReading) {
        let (left, back, heading) = (
            SharedReading::new(),
            SharedReading::new(),
            SharedReading::new(),
        );
        let wheel = |reading: &SharedReading, offset: f64| {
            TrackingWheel::new(Box::new(MockRotary::new(reading.clone())), 1.0 / PI, offset)
        };
        let odometry = Odometry::new(
            Some(wheel(&left, 1.5)),
            None,
            Some(wheel(&back, 2.0)),
            Some(Box::new(MockHeading::new(heading.clone()))),
        );
        (odometry, left, back, heading)
    }

    fn chassis_with_tracking() -> (
        Chassis<DifferentialDrivetrain<MockMotors>>,
        SharedReading,
        MockMotors,
        MockMotors,
    ) {
        let (left_motors, right_motors) = (MockMotors::new(), MockMotors::new());
        let (odometry, left_wheel, _, _) = tracking_odometry();
        let chassis = Chassis::new(
            differential(&left_motors, &right_motors),
            odometry,
            ChassisConfig::default(),
        );
        (chassis, left_wheel, left_motors, right_motors)
    }

    #[test]
    fn scale_input_is_odd_symmetric_for_every_curve() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let mut chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());
        let curves = [
            InputScale::Linear,
            InputScale::Cubic,
            InputScale::Quintic,
            InputScale::Sin,
            InputScale::SinSquared,
            InputScale::Tan,
            InputScale::XTan,
        ];
        for curve in curves {
            chassis.set_input_scale(curve);
            for raw in [0.0, 1.0, 17.0, 63.5, 100.0, 127.0] {
                let positive = chassis.scale_input(raw);
                let negative = chassis.scale_input(-raw);
                assert_relative_eq!(negative, -positive);
                assert!(positive >= 0.0);
            }
        }
    }

    #[test]
    fn linear_scale_endpoints() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());
        assert_eq!(chassis.scale_input(0.0), 0.0);
        assert_relative_eq!(chassis.scale_input(127.0), 127.0);
        assert_relative_eq!(chassis.scale_input(-127.0), -127.0);
    }

    #[test]
    fn cubic_scale_attenuates_midrange() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let mut chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());
        chassis.set_input_scale(InputScale::Cubic);
        // (0.5)^3 * 127
        assert_relative_eq!(chassis.scale_input(63.5), 15.875);
    }

    #[test]
    fn arcade_mixes_throttle_and_turn() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let mut chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());

        chassis.arcade(50.0, 0.0);
        assert_relative_eq!(left.power(), 50.0);
        assert_relative_eq!(right.power(), 50.0);

        chassis.arcade(0.0, 50.0);
        assert_relative_eq!(left.power(), 50.0);
        assert_relative_eq!(right.power(), -50.0);
    }

    #[test]
    fn tank_drives_sides_independently() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let mut chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());
        chassis.tank(50.0, 50.0);
        assert_relative_eq!(left.power(), 50.0);
        assert_relative_eq!(right.power(), 50.0);

        chassis.tank(30.0, -30.0);
        assert_relative_eq!(left.power(), 30.0);
        assert_relative_eq!(right.power(), -30.0);
    }

    #[test]
    fn holonomic_teleop_defaults_to_zero_heading_without_odometry() {
        let groups: [MockMotors; 4] = core::array::from_fn(|_| MockMotors::new());
        let [fl, fr, bl, br] = groups.clone();
        let drivetrain = HolonomicDrivetrain::new(fl, fr, bl, br, DriveGeometry::new(3.25, 12.0, 1.0));
        let mut chassis = Chassis::without_odometry(drivetrain, ChassisConfig::default());

        // Full forward stick: angle atan2(127, 0) = pi/2 at 127 speed.
        chassis.field_centric_drive(0.0, 127.0, 0.0);
        let expected = holonomic_mix(FRAC_PI_2, 127.0, 0.0);
        let actual = [
            groups[0].power(),
            groups[1].power(),
            groups[2].power(),
            groups[3].power(),
        ];
        for (a, e) in actual.into_iter().zip(expected) {
            assert_relative_eq!(a, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn begin_tracking_is_idempotent() {
        let (mut chassis, _, _, _) = chassis_with_tracking();
        assert!(!chassis.is_tracking());
        let first = chassis.begin_tracking();
        assert!(first.is_some());
        assert!(chassis.is_tracking());
        // Exactly one loop per chassis.
        assert!(chassis.begin_tracking().is_none());
    }

    #[test]
    fn dropping_an_undriven_context_returns_to_idle() {
        let (mut chassis, _, _, _) = chassis_with_tracking();
        drop(chassis.begin_tracking());
        assert!(!chassis.is_tracking());
        // The guard frees up for a context that will actually be driven.
        let context = chassis.begin_tracking();
        assert!(context.is_some());
        assert!(chassis.is_tracking());
    }

    #[test]
    fn begin_tracking_without_odometry_is_none() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let mut chassis =
            Chassis::without_odometry(differential(&left, &right), ChassisConfig::default());
        assert!(chassis.begin_tracking().is_none());
        assert!(!chassis.is_tracking());
    }

    #[test]
    #[should_panic(expected = "pose tracking requires")]
    fn begin_tracking_with_partial_sensors_panics() {
        let (left, right) = (MockMotors::new(), MockMotors::new());
        let heading = SharedReading::new();
        let odometry = Odometry::heading_only(Box::new(MockHeading::new(heading)));
        let mut chassis = Chassis::new(
            differential(&left, &right),
            odometry,
            ChassisConfig::default(),
        );
        chassis.begin_tracking();
    }

    #[test]
    fn tracking_cycle_publishes_pose_to_chassis() {
        let (mut chassis, left_wheel, _, _) = chassis_with_tracking();
        let context = chassis.begin_tracking().unwrap();

        left_wheel.set(10.0);
        context.cycle();

        let pose = chassis.pose();
        assert_relative_eq!(hypot(pose.x, pose.y), 10.0, epsilon = 1e-9);
        assert_relative_eq!(pose.heading, 0.0);
    }

    #[test]
    fn set_pose_is_a_plain_overwrite_seen_by_tracking() {
        let (mut chassis, left_wheel, _, _) = chassis_with_tracking();
        let context = chassis.begin_tracking().unwrap();

        chassis.set_pose(Pose::new(24.0, 24.0, 0.0));
        assert_relative_eq!(chassis.pose().x, 24.0);

        // Tracking continues from the overwritten pose.
        left_wheel.set(1.0);
        context.cycle();
        let pose = chassis.pose();
        assert_relative_eq!(hypot(pose.x - 24.0, pose.y - 24.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn reset_rezeros_sensors_and_stops_motors() {
        let (mut chassis, left_wheel, left_motors, right_motors) = chassis_with_tracking();
        left_wheel.set(5.0);
        chassis.arcade(80.0, 0.0);
        assert_relative_eq!(left_motors.power(), 80.0);

        chassis.reset();
        assert_eq!(left_wheel.get(), 0.0);
        assert_eq!(left_motors.power(), 0.0);
        assert_eq!(right_motors.power(), 0.0);
    }

    #[test]
    fn pose_cell_snapshot_is_whole_record() {
        let cell = PoseCell::new(Pose::new(1.0, 2.0, 3.0));
        let before = cell.get();
        cell.set(Pose::new(4.0, 5.0, 6.0));
        let after = cell.get();
        // Snapshots are value copies: the earlier one is unaffected.
        assert_eq!(before, Pose::new(1.0, 2.0, 3.0));
        assert_eq!(after, Pose::new(4.0, 5.0, 6.0));
    }
}
