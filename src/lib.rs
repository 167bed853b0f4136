//! Pose estimation and drive control for wheeled competition robots.
//!
//! The crate is built around four layers:
//!
//! - [`pose::Pose`], a plain position-plus-heading value.
//! - [`odometry::Odometry`], tracking-wheel odometry with an exact-arc pose
//!   update per cycle.
//! - [`drivetrain`], differential and holonomic undercarriage models behind
//!   the [`drivetrain::Drivetrain`] trait.
//! - [`chassis::Chassis`], which ties a drivetrain to odometry, owns the live
//!   pose, scales driver input, and hands out teleop and closed-loop motion
//!   commands.
//!
//! Hardware is reached exclusively through the [`odometry::RotarySensor`],
//! [`odometry::HeadingSensor`], and [`drivetrain::MotorGroup`] traits, so the
//! core compiles and tests on any host. The `vexide` feature provides the V5
//! adapters plus the background tracking task and async motion commands.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod chassis;
pub mod drivetrain;
pub mod odometry;
pub mod pid;
pub mod pose;
pub mod utils;

#[cfg(feature = "vexide")]
pub mod devices;
#[cfg(feature = "vexide")]
mod motion;

pub use chassis::{Chassis, ChassisConfig, InputScale, PoseCell, TRACKING_PERIOD, TrackingContext};
pub use drivetrain::{
    BrakeMode, DifferentialDrivetrain, DriveGeometry, Drivetrain, HolonomicDrivetrain, MotorGroup,
    arcade_mix, holonomic_mix,
};
pub use odometry::{HeadingSensor, Odometry, OdometryReadings, RotarySensor, TrackingWheel};
pub use pid::Pid;
pub use pose::Pose;

#[cfg(feature = "vexide")]
pub use devices::VexMotorGroup;
