//! Control-loop tuning parsed from environment variables.
//!
//! Connection settings (URL, credentials, debug flag) come from clap in
//! `main.rs`. The knobs here shape the joystick itself and all have
//! defaults. Unparsable values fall back to the default; values that parse
//! but make no sense are rejected.

use joystick::consts::{
    DEFAULT_ANGLE_EPSILON, DEFAULT_DEADZONE, DEFAULT_GRACE_DELAY_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RESEND_INTERVAL_MS, DEFAULT_VELOCITY_EPSILON,
};
use joystick::dispatcher::DispatchConfig;
use joystick::shaper::{Shaper, SpeedLevel};
use joystick::surface::SurfaceTiming;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("JOYSTICK_DEADZONE must be in [0, 1), got {0}")]
    Deadzone(f64),
    #[error("{var} must be greater than zero")]
    ZeroInterval { var: &'static str },
    #[error("{var} must be a non-negative number, got {value}")]
    NegativeEpsilon { var: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    pub deadzone: f64,
    pub speed: SpeedLevel,
    pub dispatch: DispatchConfig,
    pub timing: SurfaceTiming,
    pub poll_interval_ms: u64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            speed: SpeedLevel::default(),
            dispatch: DispatchConfig::default(),
            timing: SurfaceTiming::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ControlSettings {
    /// Build settings from the process environment.
    ///
    /// Optional:
    /// - `JOYSTICK_DEADZONE`: default 0.15
    /// - `JOYSTICK_SPEED`: `slow`, `medium` (default) or `fast`
    /// - `JOYSTICK_ANGLE_EPSILON`: default 3.0
    /// - `JOYSTICK_VELOCITY_EPSILON`: default 0.02
    /// - `JOYSTICK_RESEND_MS`: default 250
    /// - `JOYSTICK_GRACE_MS`: default 50
    /// - `JOYSTICK_POLL_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a parsed value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a parsed value is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse = |key: &str, default: f64| lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default);
        let parse_ms = |key: &str, default: u64| lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default);

        let speed = match lookup("JOYSTICK_SPEED") {
            Some(name) => SpeedLevel::parse(&name).unwrap_or_else(|| {
                tracing::warn!(%name, "unknown JOYSTICK_SPEED, using medium");
                SpeedLevel::default()
            }),
            None => SpeedLevel::default(),
        };

        let settings = Self {
            deadzone: parse("JOYSTICK_DEADZONE", DEFAULT_DEADZONE),
            speed,
            dispatch: DispatchConfig {
                angle_epsilon: parse("JOYSTICK_ANGLE_EPSILON", DEFAULT_ANGLE_EPSILON),
                velocity_epsilon: parse("JOYSTICK_VELOCITY_EPSILON", DEFAULT_VELOCITY_EPSILON),
                resend_interval_ms: parse_ms("JOYSTICK_RESEND_MS", DEFAULT_RESEND_INTERVAL_MS),
            },
            timing: SurfaceTiming {
                grace_delay_ms: parse_ms("JOYSTICK_GRACE_MS", DEFAULT_GRACE_DELAY_MS),
                resend_interval_ms: parse_ms("JOYSTICK_RESEND_MS", DEFAULT_RESEND_INTERVAL_MS),
            },
            poll_interval_ms: parse_ms("JOYSTICK_POLL_MS", DEFAULT_POLL_INTERVAL_MS),
        };
        settings.validate()
    }

    /// Reject values the control loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first offending value as a [`ConfigError`].
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::Deadzone(self.deadzone));
        }
        for (var, value) in [
            ("JOYSTICK_ANGLE_EPSILON", self.dispatch.angle_epsilon),
            ("JOYSTICK_VELOCITY_EPSILON", self.dispatch.velocity_epsilon),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeEpsilon { var, value });
            }
        }
        if self.dispatch.resend_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { var: "JOYSTICK_RESEND_MS" });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { var: "JOYSTICK_POLL_MS" });
        }
        Ok(self)
    }

    #[must_use]
    pub fn shaper(&self) -> Shaper {
        Shaper::new(self.deadzone, self.speed)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
