//! Value types shared by the control loop
//!
//! Points live in the joystick widget's local pixel space. Axis values are
//! unitless; velocity commands carry physical units once scaled by the
//! configured maxima.

use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;

/// 2D coordinate in the joystick widget's local pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear blend toward `target` by `weight` (0 keeps self, 1 lands on target)
    pub fn blend_toward(&self, target: Point, weight: f64) -> Point {
        let keep = 1.0 - weight;
        Point {
            x: self.x * keep + target.x * weight,
            y: self.y * keep + target.y * weight,
        }
    }
}

/// Normalized control axes produced by the deflection mapper
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisCommand {
    /// Forward/backward axis (1.0 at full vertical deflection)
    pub linear: f64,
    /// Turn axis (~π/2 at full horizontal deflection)
    pub angular: f64,
}

impl AxisCommand {
    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Scale axes into physical speeds using the configured maxima
    pub fn scale(&self, config: &ControlConfig) -> VelocityCommand {
        VelocityCommand {
            linear_speed: self.linear * config.max_linear_speed,
            angular_speed: self.angular * config.max_angular_speed,
        }
    }
}

/// Fully-scaled velocity command (e.g. m/s and rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear_speed: f64,
    pub angular_speed: f64,
}
