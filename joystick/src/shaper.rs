//! Vector shaping: normalized pointer axes to a bounded movement vector.
//!
//! DESIGN
//! ======
//! The mapping picks one of three gesture lanes by dominant axis, the same
//! way a gamepad-to-differential-drive mapping does:
//! - forward/back translation when `y` dominates,
//! - rotation in place when `x` dominates,
//! - an arc (velocity plus steering angle) otherwise.
//!
//! The lane thresholds sit at `deadzone` and `deadzone * 1.5`, so jitter near
//! an axis does not flicker between translation and rotation.

#[cfg(test)]
#[path = "shaper_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_DEADZONE, LANE_WIDTH_FACTOR, SPEED_LEVELS};

/// Pointer offset from the surface centre, divided by the surface radius.
///
/// `y` is inverted relative to screen space: positive means forward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedAxes {
    pub x: f64,
    pub y: f64,
}

impl NormalizedAxes {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Forward/back speed and steering bias sent to the robot.
///
/// `velocity` is in `[-1, 1]`, `angle` in degrees within `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementVector {
    pub velocity: f64,
    pub angle: f64,
}

impl MovementVector {
    /// The stop command.
    pub const STOP: Self = Self { velocity: 0.0, angle: 0.0 };

    #[must_use]
    pub fn new(velocity: f64, angle: f64) -> Self {
        Self { velocity, angle }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.velocity.is_finite() && self.angle.is_finite()
    }
}

/// Operator-selected speed cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedLevel {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl SpeedLevel {
    /// The `maxSpeed` multiplier applied to shaped velocities.
    #[must_use]
    pub fn max_speed(self) -> f64 {
        match self {
            Self::Slow => SPEED_LEVELS[0],
            Self::Medium => SPEED_LEVELS[1],
            Self::Fast => SPEED_LEVELS[2],
        }
    }

    /// Parse a level name (`slow`, `medium`, `fast`), case-insensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "slow" => Some(Self::Slow),
            "medium" => Some(Self::Medium),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

/// Shaping parameters for one control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaper {
    pub deadzone: f64,
    pub speed: SpeedLevel,
}

impl Default for Shaper {
    fn default() -> Self {
        Self { deadzone: DEFAULT_DEADZONE, speed: SpeedLevel::default() }
    }
}

impl Shaper {
    #[must_use]
    pub fn new(deadzone: f64, speed: SpeedLevel) -> Self {
        Self { deadzone, speed }
    }

    /// Shape `axes` with this surface's deadzone and speed level.
    #[must_use]
    pub fn shape(&self, axes: NormalizedAxes) -> MovementVector {
        shape(axes, self.deadzone, self.speed.max_speed())
    }
}

/// Map normalized axes to a movement vector.
///
/// Pure and deterministic. The returned velocity is clamped to `[-1, 1]` and
/// the angle to `[-180, 180]`.
#[must_use]
pub fn shape(axes: NormalizedAxes, deadzone: f64, max_speed: f64) -> MovementVector {
    let NormalizedAxes { x, y } = axes;
    let (abs_x, abs_y) = (x.abs(), y.abs());
    let lane = deadzone * LANE_WIDTH_FACTOR;

    if abs_x < deadzone && abs_y < deadzone {
        return MovementVector::STOP;
    }

    if abs_y >= deadzone && abs_x < lane {
        let speed = normalize(abs_y, deadzone) * max_speed;
        return bounded(signed(speed, y), 0.0);
    }

    if abs_x >= deadzone && abs_y < lane {
        let angle = if x > 0.0 { 90.0 } else { -90.0 };
        return bounded(0.0, angle);
    }

    // Reversing mirrors the steering so the arc bends the way the stick points.
    let corrected_x = if y < 0.0 { -x } else { x };
    let angle = corrected_x.atan2(y).to_degrees();
    let speed = normalize(x.hypot(y), deadzone) * max_speed;
    bounded(signed(speed, y), angle)
}

/// Rescale the post-deadzone range back to `[0, 1]`.
#[must_use]
pub fn normalize(value: f64, deadzone: f64) -> f64 {
    (value - deadzone).max(0.0) / (1.0 - deadzone)
}

/// Give `speed` the sign of `y`. A zero `y` of either sign yields zero.
fn signed(speed: f64, y: f64) -> f64 {
    if y > 0.0 {
        speed
    } else if y < 0.0 {
        -speed
    } else {
        0.0
    }
}

fn bounded(velocity: f64, angle: f64) -> MovementVector {
    MovementVector { velocity: velocity.clamp(-1.0, 1.0), angle: angle.clamp(-180.0, 180.0) }
}
