//! vexide device adapters: bind V5 hardware to the crate's collaborator
//! traits and run the background tracking task.
//!
//! Device reads fall back to the type's default on error so a disconnected
//! sensor degrades to a stale-but-sane reading instead of failing the loop.

use alloc::vec::Vec;

use vexide::{
    devices::smart::imu::InertialSensor,
    prelude::{BrakeMode as VexBrakeMode, Motor, RotationSensor, sleep},
};

use crate::chassis::{Chassis, TRACKING_PERIOD};
use crate::drivetrain::{BrakeMode, Drivetrain, MotorGroup};
use crate::odometry::{HeadingSensor, RotarySensor};

impl RotarySensor for RotationSensor {
    fn revolutions(&self) -> f64 {
        self.position().unwrap_or_default().as_revolutions()
    }

    fn reset(&mut self) {
        let _ = self.reset_position();
    }
}

/// Heading from the inertial sensor. The IMU reports clockwise-positive
/// rotation; it is negated here so the crate-wide counter-clockwise-positive
/// convention holds.
impl HeadingSensor for InertialSensor {
    fn rotation_radians(&self) -> f64 {
        -self.rotation().unwrap_or_default().to_radians()
    }

    fn reset(&mut self) {
        let _ = self.reset_rotation();
    }
}

/// A fixed-size group of V5 motors acting as one unit.
///
/// Power follows the [-127, 127] convention and is mapped linearly onto the
/// 12 V command range. A zero power command applies the configured brake mode
/// instead of commanding 0 V.
pub struct VexMotorGroup<const N: usize> {
    motors: [Motor; N],
    brake_mode: BrakeMode,
}

impl<const N: usize> VexMotorGroup<N> {
    pub fn new(motors: [Motor; N]) -> Self {
        Self {
            motors,
            brake_mode: BrakeMode::Coast,
        }
    }

    fn vex_brake_mode(mode: BrakeMode) -> VexBrakeMode {
        match mode {
            BrakeMode::Coast => VexBrakeMode::Coast,
            BrakeMode::Brake => VexBrakeMode::Brake,
            BrakeMode::Hold => VexBrakeMode::Hold,
        }
    }

    fn read<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&Motor) -> f64,
    {
        self.motors.iter().map(f).collect()
    }
}

impl<const N: usize> MotorGroup for VexMotorGroup<N> {
    fn set_power(&mut self, power: f64) {
        if power == 0.0 && self.brake_mode != BrakeMode::Coast {
            let mode = Self::vex_brake_mode(self.brake_mode);
            for motor in &mut self.motors {
                let _ = motor.brake(mode);
            }
            return;
        }
        let voltage = power / 127.0 * Motor::V5_MAX_VOLTAGE;
        for motor in &mut self.motors {
            let _ = motor.set_voltage(voltage);
        }
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) {
        self.brake_mode = mode;
    }

    fn brake_mode(&self) -> BrakeMode {
        self.brake_mode
    }

    fn set_current_limit(&mut self, limit_ma: u32) {
        let amps = f64::from(limit_ma) / 1000.0;
        for motor in &mut self.motors {
            let _ = motor.set_current_limit(amps);
        }
    }

    fn temperatures(&self) -> Vec<f64> {
        self.read(|m| m.temperature().unwrap_or_default())
    }

    fn current_draws(&self) -> Vec<f64> {
        self.read(|m| m.current().unwrap_or_default())
    }

    fn voltages(&self) -> Vec<f64> {
        self.read(|m| m.voltage().unwrap_or_default())
    }

    fn velocities(&self) -> Vec<f64> {
        self.read(|m| m.velocity().unwrap_or_default())
    }
}

impl<D: Drivetrain> Chassis<D> {
    /// Spawns the background tracking task, updating the pose every
    /// [`TRACKING_PERIOD`] until the program ends. Safe to call repeatedly;
    /// only the first call starts a task.
    ///
    /// # Panics
    ///
    /// Panics on the first call if odometry is present but missing a sensor
    /// tracking requires.
    pub fn start_tracking(&mut self) {
        let Some(context) = self.begin_tracking() else {
            return;
        };
        vexide::task::spawn(async move {
            loop {
                context.cycle();
                sleep(TRACKING_PERIOD).await;
            }
        })
        .detach();
    }
}
