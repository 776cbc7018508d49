//! Command dispatch: decide whether a movement vector is worth transmitting.
//!
//! DESIGN
//! ======
//! The dispatcher is a pure decision function over a small cache of the last
//! transmitted command. It never performs I/O. The caller transmits a
//! `Decision::Send` and reports success through [`Dispatcher::record_sent`].
//! A failed transmission is never recorded, so the next tick retries with
//! fresh values.
//!
//! Values are rounded before every comparison and before transmission
//! (velocity to 3 decimals, angle to 1). The cache key stays stable and the
//! wire payload stays small.

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;

use crate::consts::{
    ANGLE_DECIMALS, DEFAULT_ANGLE_EPSILON, DEFAULT_RESEND_INTERVAL_MS, DEFAULT_VELOCITY_EPSILON, VELOCITY_DECIMALS,
};
use crate::shaper::MovementVector;

// =============================================================================
// CONFIG
// =============================================================================

/// Thresholds for the send decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Angle change in degrees that forces a send.
    pub angle_epsilon: f64,
    /// Velocity change that forces a send. Also the zero-snap threshold.
    pub velocity_epsilon: f64,
    /// Unchanged commands are resent after this long.
    pub resend_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            angle_epsilon: DEFAULT_ANGLE_EPSILON,
            velocity_epsilon: DEFAULT_VELOCITY_EPSILON,
            resend_interval_ms: DEFAULT_RESEND_INTERVAL_MS,
        }
    }
}

// =============================================================================
// ERRORS / DECISIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("non-finite movement vector (velocity={velocity}, angle={angle})")]
    NonFinite { velocity: f64, angle: f64 },
}

/// Why a vector was not transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Manual control is not enabled.
    Disabled,
    /// Within epsilon of the last command and inside the resend interval.
    Unchanged,
    /// A stop is already the last command sent.
    AlreadyStopped,
}

/// Outcome of [`Dispatcher::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Transmit this (rounded) command.
    Send(MovementVector),
    Skip(SkipReason),
}

// =============================================================================
// CACHE
// =============================================================================

/// The last command the remote side accepted.
///
/// Empty fields mean nothing has been sent yet; the next attempt always sends.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SentCommandCache {
    pub last_velocity: Option<f64>,
    pub last_angle: Option<f64>,
    pub last_send_ms: u64,
}

impl SentCommandCache {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_angle.is_none() || self.last_velocity.is_none()
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
    cache: SentCommandCache,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self { config, cache: SentCommandCache::default() }
    }

    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    #[must_use]
    pub fn cache(&self) -> &SentCommandCache {
        &self.cache
    }

    /// Decide whether `vector` should be transmitted at `now_ms`.
    ///
    /// `enabled` is whether manual control is currently `Enabled`; anything
    /// else gates the send.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NonFinite`] if either component is NaN or
    /// infinite. The cache is not touched.
    pub fn decide(&self, vector: MovementVector, now_ms: u64, enabled: bool) -> Result<Decision, DispatchError> {
        if !vector.is_finite() {
            return Err(DispatchError::NonFinite { velocity: vector.velocity, angle: vector.angle });
        }
        if !enabled {
            return Ok(Decision::Skip(SkipReason::Disabled));
        }

        let command = round_command(vector, self.config.velocity_epsilon);
        let (Some(last_velocity), Some(last_angle)) = (self.cache.last_velocity, self.cache.last_angle) else {
            return Ok(Decision::Send(command));
        };

        let angle_changed = (command.angle - last_angle).abs() > self.config.angle_epsilon;
        let velocity_changed = (command.velocity - last_velocity).abs() > self.config.velocity_epsilon;

        if command == MovementVector::STOP && last_velocity == 0.0 && !angle_changed {
            return Ok(Decision::Skip(SkipReason::AlreadyStopped));
        }

        let stale = now_ms.saturating_sub(self.cache.last_send_ms) >= self.config.resend_interval_ms;
        if stale || angle_changed || velocity_changed {
            Ok(Decision::Send(command))
        } else {
            Ok(Decision::Skip(SkipReason::Unchanged))
        }
    }

    /// The stop command issued on release, disable or teardown.
    ///
    /// Bypasses every suppression rule and the enabled gate; the caller
    /// transmits it unconditionally.
    #[must_use]
    pub fn forced_stop(&self) -> MovementVector {
        MovementVector::STOP
    }

    /// Record a transmission the remote side accepted.
    pub fn record_sent(&mut self, command: MovementVector, now_ms: u64) {
        let command = round_command(command, self.config.velocity_epsilon);
        self.cache = SentCommandCache {
            last_velocity: Some(command.velocity),
            last_angle: Some(command.angle),
            last_send_ms: now_ms,
        };
    }
}

// =============================================================================
// ROUNDING
// =============================================================================

/// Clamp and round a vector to its wire precision.
///
/// Velocities whose rounded magnitude is below `velocity_epsilon` become
/// exactly zero, so oscillation around zero never reads as a change.
#[must_use]
pub fn round_command(vector: MovementVector, velocity_epsilon: f64) -> MovementVector {
    let mut velocity = round_to(vector.velocity.clamp(-1.0, 1.0), VELOCITY_DECIMALS);
    if velocity.abs() < velocity_epsilon {
        velocity = 0.0;
    }
    let angle = round_to(vector.angle.clamp(-180.0, 180.0), ANGLE_DECIMALS);
    // Normalise -0.0 so the wire never carries a signed zero.
    MovementVector { velocity: velocity + 0.0, angle: angle + 0.0 }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
