use super::*;

#[test]
fn matches_entity_suffix() {
    let entities = vec![
        SwitchEntity::new("switch.kitchen_light", "Kitchen Light"),
        SwitchEntity::new("switch.dreame_manual_control", "Dreame"),
    ];
    assert_eq!(find_manual_control_switch(&entities), Some(SwitchHandle("switch.dreame_manual_control".into())));
}

#[test]
fn matches_entity_prefix() {
    let entities = vec![SwitchEntity::new("switch.manual_control_robot", "Robot")];
    assert!(find_manual_control_switch(&entities).is_some());
}

#[test]
fn matches_label_substring() {
    let entities = vec![SwitchEntity::new("switch.abc123", "Robot Manual Control")];
    assert_eq!(find_manual_control_switch(&entities).map(|h| h.0), Some("switch.abc123".to_owned()));
}

#[test]
fn prefers_high_resolution_capability() {
    let entities = vec![
        SwitchEntity::new("ManualControlCapability", "ManualControlCapability"),
        SwitchEntity::new("HighResolutionManualControlCapability", "HighResolutionManualControlCapability"),
    ];
    assert_eq!(
        find_manual_control_switch(&entities).map(|h| h.0),
        Some("HighResolutionManualControlCapability".to_owned())
    );
}

#[test]
fn ignores_unrelated_names() {
    let entities = vec![
        SwitchEntity::new("BasicControlCapability", "BasicControlCapability"),
        SwitchEntity::new("switch.manual_override", "Override"),
    ];
    assert_eq!(find_manual_control_switch(&entities), None);
}

#[test]
fn empty_directory_finds_nothing() {
    assert_eq!(find_manual_control_switch(&[]), None);
}

#[test]
fn handle_displays_id() {
    assert_eq!(SwitchHandle("x.y".into()).to_string(), "x.y");
}
