#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Single-axis error-driven controller for closed-loop motion.
///
/// Carries mutable accumulator state; call [`Pid::reset`] between independent
/// control episodes so integral windup from one move does not bleed into the
/// next.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Clamp on the integral accumulator; 0.0 disables the clamp.
    pub integral_limit: f64,
    pub integral_decay: f64,
    prev_error: Option<f64>,
    integral: f64,
    disabled: bool,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit,
            integral_decay: 0.995,
            prev_error: None,
            integral: 0.0,
            disabled: false,
        }
    }

    /// Advances the controller by one step of `dt` seconds and returns the
    /// control output for `error`.
    ///
    /// The integral decays geometrically before accumulating, then gets
    /// clamped; the derivative acts on the raw error change and is zero on
    /// the first step after construction or a reset.
    pub fn next(&mut self, error: f64, dt: f64) -> f64 {
        if self.disabled {
            self.reset();
            return 0.0;
        }

        let mut integral = self.integral * self.integral_decay + error * dt;
        if self.integral_limit > 0.0 {
            integral = integral.clamp(-self.integral_limit, self.integral_limit);
        }
        self.integral = integral;

        let derivative = self.prev_error.map_or(0.0, |prev| (error - prev) / dt);
        self.prev_error = Some(error);

        self.kp * error + self.ki * integral + self.kd * derivative
    }

    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0.0;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.reset();
        }
    }
}
