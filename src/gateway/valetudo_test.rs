use super::*;

// =============================================================
// URLs and payloads
// =============================================================

#[test]
fn base_url_gets_scheme_and_loses_trailing_slash() {
    assert_eq!(normalize_base_url("192.168.1.50"), "http://192.168.1.50");
    assert_eq!(normalize_base_url("http://robot.local/"), "http://robot.local");
    assert_eq!(normalize_base_url(" https://robot.local// "), "https://robot.local");
}

#[test]
fn capability_paths() {
    assert_eq!(
        capability_path(MOVE_CAPABILITY),
        "/api/v2/robot/capabilities/HighResolutionManualControlCapability"
    );
}

#[test]
fn move_payload_shape() {
    let payload = move_payload(MovementVector::new(0.25, -30.5));
    assert_eq!(
        payload,
        serde_json::json!({ "action": "move", "vector": { "velocity": 0.25, "angle": -30.5 } })
    );
}

#[test]
fn toggle_payload_actions() {
    assert_eq!(toggle_payload(true), serde_json::json!({ "action": "enable" }));
    assert_eq!(toggle_payload(false), serde_json::json!({ "action": "disable" }));
}

#[test]
fn credentials_require_both_parts() {
    let gw = ValetudoGateway::new("robot", Some("user".into()), None).unwrap();
    assert!(gw.credentials.is_none());
    let gw = ValetudoGateway::new("robot", Some("user".into()), Some("pass".into())).unwrap();
    assert_eq!(gw.credentials, Some(("user".to_owned(), "pass".to_owned())));
    assert_eq!(gw.base_url(), "http://robot");
}

// =============================================================
// Parsing
// =============================================================

#[test]
fn parse_capability_list() {
    let entities = parse_capabilities(r#"["BasicControlCapability","HighResolutionManualControlCapability"]"#).unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[1].id, "HighResolutionManualControlCapability");
    assert_eq!(entities[1].label, entities[1].id);
}

#[test]
fn parse_capability_list_rejects_objects() {
    assert!(matches!(parse_capabilities(r#"{"a":1}"#), Err(GatewayError::Parse(_))));
}

#[test]
fn parse_enabled_flag() {
    assert!(parse_enabled(r#"{"enabled":true}"#).unwrap());
    assert!(!parse_enabled(r#"{"enabled":false}"#).unwrap());
    assert!(!parse_enabled("{}").unwrap());
    assert!(parse_enabled("nope").is_err());
}

#[test]
fn parse_water_preset_defaults_to_off() {
    assert_eq!(parse_water_preset(r#"{"currentPreset":{"name":"high"}}"#).unwrap(), "high");
    assert_eq!(parse_water_preset("{}").unwrap(), "off");
}

#[test]
fn parse_battery_from_attributes() {
    let state = serde_json::json!({
        "attributes": [
            { "__class": "StatusStateAttribute", "value": "idle" },
            { "__class": "BatteryStateAttribute", "level": 87, "flag": "none" }
        ]
    })
    .to_string();
    assert_eq!(parse_battery_level(&state).unwrap(), Some(87));
}

#[test]
fn parse_battery_missing_attribute() {
    assert_eq!(parse_battery_level(r#"{"attributes":[]}"#).unwrap(), None);
    assert_eq!(parse_battery_level("{}").unwrap(), None);
}

#[test]
fn transient_errors() {
    assert!(GatewayError::Request("reset".into()).transient());
    assert!(GatewayError::Status { status: 503, body: String::new() }.transient());
    assert!(!GatewayError::Status { status: 400, body: String::new() }.transient());
    assert!(!GatewayError::Parse("x".into()).transient());
}
