//! Closed-loop motion commands.
//!
//! Every command reads the live pose maintained by the tracking task each
//! iteration, so pose overwrites mid-move (for example after a wall reset)
//! redirect the motion immediately. Commands exit on tolerance or on the
//! configured safety timeout, and always stop the drivetrain on the way out.

use libm::{atan2, cos, fabs};
use vexide::{prelude::sleep, time::Instant};

use crate::chassis::Chassis;
use crate::drivetrain::{DifferentialDrivetrain, Drivetrain, HolonomicDrivetrain, MotorGroup};
use crate::pose::Pose;
use crate::utils::normalize_angle;

impl<M: MotorGroup> Chassis<DifferentialDrivetrain<M>> {
    /// Turns in place to the absolute heading `target_degrees`, taking the
    /// short way around.
    pub async fn turn_angle(&mut self, target_degrees: f64) {
        let target = target_degrees.to_radians();
        let mut turn_pid = self.config.turn_pid;
        turn_pid.reset();
        let tolerance = self.config.turn_tolerance.to_radians();
        let dt = self.config.dt;
        let start = Instant::now();

        loop {
            let error = normalize_angle(target - self.pose().heading);
            if fabs(error) <= tolerance {
                break;
            }
            if Instant::now().duration_since(start) >= self.config.motion_timeout {
                log::warn!("turn_angle timed out {:.1} deg short", error.to_degrees());
                break;
            }
            let output = turn_pid.next(error, dt.as_secs_f64());
            // Positive error is a counter-clockwise correction: right side
            // forward.
            self.drivetrain.set_motor_speeds(&[-output, output]);
            sleep(dt).await;
        }
        self.drivetrain.stop();
    }

    /// Drives to `target`, steering toward it while closing distance.
    ///
    /// Forward effort is projected by the cosine of the heading error, so the
    /// robot prioritizes turning when it points away from the target. Only
    /// the target's position is sought; its `heading` field is ignored.
    pub async fn move_to_pose(&mut self, target: Pose) {
        let mut lateral_pid = self.config.lateral_pid;
        let mut turn_pid = self.config.turn_pid;
        lateral_pid.reset();
        turn_pid.reset();
        let dt = self.config.dt;
        let start = Instant::now();

        loop {
            let pose = self.pose();
            let distance = pose.distance(&target);
            if distance <= self.config.lateral_tolerance {
                break;
            }
            if Instant::now().duration_since(start) >= self.config.motion_timeout {
                log::warn!("move_to_pose timed out {:.1}\" from target", distance);
                break;
            }
            // Forward is +y at zero heading, so the bearing to the target is
            // atan2(dx, dy).
            let bearing = atan2(target.x - pose.x, target.y - pose.y);
            let heading_error = normalize_angle(bearing - pose.heading);
            let drive = lateral_pid.next(distance, dt.as_secs_f64()) * cos(heading_error);
            let rotation = turn_pid.next(heading_error, dt.as_secs_f64());
            self.drivetrain
                .set_motor_speeds(&[drive - rotation, drive + rotation]);
            sleep(dt).await;
        }
        self.drivetrain.stop();
    }
}

impl<M: MotorGroup> Chassis<HolonomicDrivetrain<M>> {
    /// Turns in place to the absolute heading `target_degrees`, taking the
    /// short way around.
    pub async fn turn_angle(&mut self, target_degrees: f64) {
        let target = target_degrees.to_radians();
        let mut turn_pid = self.config.turn_pid;
        turn_pid.reset();
        let tolerance = self.config.turn_tolerance.to_radians();
        let dt = self.config.dt;
        let start = Instant::now();

        loop {
            let error = normalize_angle(target - self.pose().heading);
            if fabs(error) <= tolerance {
                break;
            }
            if Instant::now().duration_since(start) >= self.config.motion_timeout {
                log::warn!("turn_angle timed out {:.1} deg short", error.to_degrees());
                break;
            }
            let output = turn_pid.next(error, dt.as_secs_f64());
            // The rotation overlay follows the teleop stick convention, where
            // positive turns clockwise.
            self.drive_angle(0.0, 0.0, -output);
            sleep(dt).await;
        }
        self.drivetrain.stop();
    }

    /// Drives to `target`, translating directly toward it in the field frame
    /// while independently correcting heading. Only the target's position is
    /// sought; its `heading` field is ignored.
    pub async fn move_to_pose(&mut self, target: Pose) {
        let mut lateral_pid = self.config.lateral_pid;
        let mut turn_pid = self.config.turn_pid;
        lateral_pid.reset();
        turn_pid.reset();
        let dt = self.config.dt;
        let start = Instant::now();
        let goal_heading = self.pose().heading;

        loop {
            let pose = self.pose();
            let distance = pose.distance(&target);
            if distance <= self.config.lateral_tolerance {
                break;
            }
            if Instant::now().duration_since(start) >= self.config.motion_timeout {
                log::warn!("move_to_pose timed out {:.1}\" from target", distance);
                break;
            }
            // Field-frame direction, offset into the robot frame the same way
            // field-centric teleop does.
            let angle = atan2(target.y - pose.y, target.x - pose.x);
            let translation = lateral_pid.next(distance, dt.as_secs_f64());
            let heading_error = normalize_angle(goal_heading - pose.heading);
            let rotation = turn_pid.next(heading_error, dt.as_secs_f64());
            self.drive_angle(angle + pose.heading, translation, -rotation);
            sleep(dt).await;
        }
        self.drivetrain.stop();
    }
}
