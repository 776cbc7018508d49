//! Remote command gateway: the only boundary that performs network I/O.
//!
//! DESIGN
//! ======
//! The control session talks to the robot exclusively through the
//! [`Gateway`] trait, so tests substitute a recording mock. Every call is an
//! idempotent snapshot (a full velocity/angle pair, an absolute enable flag),
//! which is what lets the session issue overlapping calls without ordering
//! guarantees.

pub mod valetudo;

use joystick::discovery::{SwitchEntity, SwitchHandle};
use joystick::shaper::MovementVector;
use serde::Serialize;

pub use valetudo::ValetudoGateway;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect, timeout, reset).
    #[error("request failed: {0}")]
    Request(String),

    /// The robot answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be interpreted.
    #[error("response parse failed: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Whether the next tick can reasonably expect a different outcome.
    #[must_use]
    pub fn transient(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Command/query surface of the remote robot.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Directory of switch-like entities, used to discover the manual-control switch.
    async fn list_switches(&self) -> Result<Vec<SwitchEntity>, GatewayError>;

    /// Authoritative manual-control flag.
    async fn get_manual_control_state(&self, switch: &SwitchHandle) -> Result<bool, GatewayError>;

    /// Request manual control on or off. The answer is not trusted as new state.
    async fn set_manual_control_state(&self, switch: &SwitchHandle, enable: bool) -> Result<(), GatewayError>;

    async fn send_movement_command(&self, command: MovementVector) -> Result<(), GatewayError>;

    /// Send the robot home.
    async fn dock(&self) -> Result<(), GatewayError>;

    /// Play the locate sound.
    async fn play_sound(&self) -> Result<(), GatewayError>;

    async fn get_water_usage_preset(&self) -> Result<Option<String>, GatewayError>;

    async fn set_water_usage_preset(&self, preset: &str) -> Result<(), GatewayError>;

    /// Battery level in percent, for display only.
    async fn battery_level(&self) -> Result<Option<u8>, GatewayError>;
}

// =============================================================================
// STATUS SNAPSHOT
// =============================================================================

/// Read-only snapshot of the robot for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RobotStatus {
    pub battery_level: Option<u8>,
    pub manual_control_switch: Option<String>,
    pub manual_control: Option<bool>,
    pub water_preset: Option<String>,
}

/// Gather a [`RobotStatus`]. Individual failures are logged and leave their field empty.
pub async fn fetch_status(gateway: &dyn Gateway) -> RobotStatus {
    let mut status = RobotStatus::default();

    match gateway.battery_level().await {
        Ok(level) => status.battery_level = level,
        Err(e) => tracing::warn!(error = %e, "battery level unavailable"),
    }

    match gateway.list_switches().await {
        Ok(entities) => {
            if let Some(switch) = joystick::discovery::find_manual_control_switch(&entities) {
                match gateway.get_manual_control_state(&switch).await {
                    Ok(enabled) => status.manual_control = Some(enabled),
                    Err(e) => tracing::warn!(error = %e, %switch, "manual control state unavailable"),
                }
                status.manual_control_switch = Some(switch.0);
            }
        }
        Err(e) => tracing::warn!(error = %e, "switch directory unavailable"),
    }

    match gateway.get_water_usage_preset().await {
        Ok(preset) => status.water_preset = preset,
        Err(e) => tracing::warn!(error = %e, "water usage preset unavailable"),
    }

    status
}
