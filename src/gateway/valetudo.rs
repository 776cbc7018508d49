//! Valetudo REST API client.
//!
//! Thin HTTP wrapper over `/api/v2/robot/...`. Request building and response
//! parsing are pure functions so they can be tested without a robot.

use std::time::Duration;

use joystick::consts::WATER_PRESET_OFF;
use joystick::discovery::{SwitchEntity, SwitchHandle};
use joystick::shaper::MovementVector;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::{Gateway, GatewayError};

const REQUEST_TIMEOUT_SECS: u64 = 5;
const CONNECT_TIMEOUT_SECS: u64 = 5;

const ROBOT_STATE_PATH: &str = "/api/v2/robot/state";
const CAPABILITIES_PATH: &str = "/api/v2/robot/capabilities";
const MOVE_CAPABILITY: &str = "HighResolutionManualControlCapability";
const BASIC_CONTROL_CAPABILITY: &str = "BasicControlCapability";
const LOCATE_CAPABILITY: &str = "LocateCapability";
const WATER_CAPABILITY: &str = "WaterUsageControlCapability";

const BATTERY_ATTRIBUTE: &str = "BatteryStateAttribute";

// =============================================================================
// CLIENT
// =============================================================================

pub struct ValetudoGateway {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl ValetudoGateway {
    /// Build a client for the robot at `url`.
    ///
    /// Basic auth is only sent when both `username` and `password` are present.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(url: &str, username: Option<String>, password: Option<String>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        let credentials = match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };
        Ok(Self { http, base_url: normalize_base_url(url), credentials })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<String, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "valetudo request");

        let mut request = self.http.request(method, &url);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        if let Some(json) = body {
            request = request.json(&json);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        debug!(status, %url, "valetudo response");

        if status != 200 {
            return Err(GatewayError::Status { status, body: text });
        }
        Ok(text)
    }

    async fn put(&self, path: &str, body: Value) -> Result<(), GatewayError> {
        self.request(Method::PUT, path, Some(body)).await.map(drop)
    }
}

#[async_trait::async_trait]
impl Gateway for ValetudoGateway {
    async fn list_switches(&self) -> Result<Vec<SwitchEntity>, GatewayError> {
        let text = self.request(Method::GET, CAPABILITIES_PATH, None).await?;
        parse_capabilities(&text)
    }

    async fn get_manual_control_state(&self, switch: &SwitchHandle) -> Result<bool, GatewayError> {
        let text = self.request(Method::GET, &capability_path(switch.id()), None).await?;
        parse_enabled(&text)
    }

    async fn set_manual_control_state(&self, switch: &SwitchHandle, enable: bool) -> Result<(), GatewayError> {
        self.put(&capability_path(switch.id()), toggle_payload(enable)).await
    }

    async fn send_movement_command(&self, command: MovementVector) -> Result<(), GatewayError> {
        debug!(velocity = command.velocity, angle = command.angle, "sending movement command");
        self.put(&capability_path(MOVE_CAPABILITY), move_payload(command)).await
    }

    async fn dock(&self) -> Result<(), GatewayError> {
        self.put(&capability_path(BASIC_CONTROL_CAPABILITY), serde_json::json!({ "action": "home" }))
            .await
    }

    async fn play_sound(&self) -> Result<(), GatewayError> {
        self.put(&capability_path(LOCATE_CAPABILITY), serde_json::json!({ "action": "locate" }))
            .await
    }

    async fn get_water_usage_preset(&self) -> Result<Option<String>, GatewayError> {
        let text = self.request(Method::GET, &capability_path(WATER_CAPABILITY), None).await?;
        parse_water_preset(&text).map(Some)
    }

    async fn set_water_usage_preset(&self, preset: &str) -> Result<(), GatewayError> {
        let path = format!("{}/preset", capability_path(WATER_CAPABILITY));
        self.put(&path, serde_json::json!({ "name": preset })).await
    }

    async fn battery_level(&self) -> Result<Option<u8>, GatewayError> {
        let text = self.request(Method::GET, ROBOT_STATE_PATH, None).await?;
        parse_battery_level(&text)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Prepend `http://` when no scheme is given and strip trailing slashes.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("http://{url}")
    };
    url.trim_end_matches('/').to_owned()
}

fn capability_path(capability: &str) -> String {
    format!("{CAPABILITIES_PATH}/{capability}")
}

fn move_payload(command: MovementVector) -> Value {
    serde_json::json!({ "action": "move", "vector": command })
}

fn toggle_payload(enable: bool) -> Value {
    serde_json::json!({ "action": if enable { "enable" } else { "disable" } })
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_json(text: &str) -> Result<Value, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Capability names become switch entities labelled with their own name.
fn parse_capabilities(text: &str) -> Result<Vec<SwitchEntity>, GatewayError> {
    let names: Vec<String> = serde_json::from_str(text).map_err(|e| GatewayError::Parse(e.to_string()))?;
    Ok(names.into_iter().map(|name| SwitchEntity::new(name.clone(), name)).collect())
}

/// A capability without an `enabled` field reports disabled.
fn parse_enabled(text: &str) -> Result<bool, GatewayError> {
    let value = parse_json(text)?;
    Ok(value.get("enabled").and_then(Value::as_bool).unwrap_or(false))
}

/// Missing preset information reads as `off`.
fn parse_water_preset(text: &str) -> Result<String, GatewayError> {
    let value = parse_json(text)?;
    Ok(value
        .get("currentPreset")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(WATER_PRESET_OFF)
        .to_owned())
}

fn parse_battery_level(text: &str) -> Result<Option<u8>, GatewayError> {
    let value = parse_json(text)?;
    let level = value
        .get("attributes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|attr| attr.get("__class").and_then(Value::as_str) == Some(BATTERY_ATTRIBUTE))
        .and_then(|attr| attr.get("level"))
        .and_then(Value::as_f64);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = level.map(|l| l.round().clamp(0.0, 100.0) as u8);
    Ok(percent)
}

#[cfg(test)]
#[path = "valetudo_test.rs"]
mod tests;
