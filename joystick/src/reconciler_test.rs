use super::*;

fn ready() -> Reconciler {
    let mut r = Reconciler::default();
    assert!(r.discover(&[SwitchEntity::new("switch.robot_manual_control", "Robot Manual Control")]));
    r
}

fn enabled() -> Reconciler {
    let mut r = ready();
    r.observe(true);
    assert_eq!(r.state(), ManualControlState::Enabled);
    r
}

// =============================================================
// Discovery / readiness
// =============================================================

#[test]
fn toggle_without_switch_is_noop() {
    let mut r = Reconciler::default();
    assert!(r.request_toggle().is_none());
    assert_eq!(r.state(), ManualControlState::Disabled);
}

#[test]
fn discovery_retries_until_found() {
    let mut r = Reconciler::default();
    assert!(!r.discover(&[SwitchEntity::new("switch.lamp", "Lamp")]));
    assert!(r.switch().is_none());
    assert!(r.discover(&[SwitchEntity::new("switch.vac_manual_control", "Vac")]));
    assert!(!r.discover(&[]));
    assert_eq!(r.switch().map(SwitchHandle::id), Some("switch.vac_manual_control"));
}

#[test]
fn custom_lookup_is_used() {
    fn first(entities: &[SwitchEntity]) -> Option<SwitchHandle> {
        entities.first().map(|e| SwitchHandle(e.id.clone()))
    }
    let mut r = Reconciler::new(first);
    assert!(r.discover(&[SwitchEntity::new("anything", "")]));
}

// =============================================================
// Toggle requests
// =============================================================

#[test]
fn toggle_from_disabled_targets_enabled() {
    let mut r = ready();
    let req = r.request_toggle().unwrap();
    assert!(req.target);
    assert!(req.suspend_water);
    assert_eq!(req.restore_preset, None);
    assert_eq!(r.state(), ManualControlState::PendingToggle { target: true });
    assert!(!req.transition.leaves_enabled());
}

#[test]
fn toggle_while_pending_is_ignored() {
    let mut r = ready();
    r.request_toggle().unwrap();
    assert!(r.request_toggle().is_none());
    assert_eq!(r.state(), ManualControlState::PendingToggle { target: true });
}

#[test]
fn toggle_from_enabled_leaves_enabled_and_restores_preset() {
    let mut r = enabled();
    r.save_preset(Some("high".into()));
    let req = r.request_toggle().unwrap();
    assert!(!req.target);
    assert!(!req.suspend_water);
    assert_eq!(req.restore_preset.as_deref(), Some("high"));
    assert!(req.transition.leaves_enabled());
    assert_eq!(r.saved_preset(), None);
}

#[test]
fn off_preset_is_not_saved() {
    let mut r = ready();
    r.save_preset(Some("off".into()));
    assert_eq!(r.saved_preset(), None);
    r.save_preset(None);
    assert_eq!(r.saved_preset(), None);
}

// =============================================================
// Poll convergence
// =============================================================

#[test]
fn poll_confirming_target_settles_enabled() {
    let mut r = ready();
    r.request_toggle().unwrap();
    let t = r.observe(true).unwrap();
    assert_eq!(t.to, ManualControlState::Enabled);
    assert_eq!(r.state(), ManualControlState::Enabled);
}

#[test]
fn unchanged_poll_stays_pending() {
    let mut r = ready();
    r.request_toggle().unwrap();
    assert!(r.observe(false).is_none());
    assert!(r.observe(false).is_none());
    assert_eq!(r.state(), ManualControlState::PendingToggle { target: true });
}

#[test]
fn accepted_disable_keeps_pending_until_poll_changes() {
    let mut r = enabled();
    r.request_toggle().unwrap();
    // The device accepted the request but still reports the old value.
    assert!(r.observe(true).is_none());
    assert!(r.observe(true).is_none());
    assert_eq!(r.state(), ManualControlState::PendingToggle { target: false });
    assert!(!r.is_enabled());

    let t = r.observe(false).unwrap();
    assert_eq!(t.to, ManualControlState::Disabled);
}

#[test]
fn ground_truth_wins_over_intent() {
    let mut r = ready();
    r.request_toggle().unwrap();
    r.observe(true);
    // Something else switched it back off before the toggle was confirmed.
    let t = r.observe(false).unwrap();
    assert_eq!(t.to, ManualControlState::Disabled);
    assert_eq!(r.state(), ManualControlState::Disabled);
}

#[test]
fn external_change_is_adopted_without_pending() {
    let mut r = enabled();
    let t = r.observe(false).unwrap();
    assert!(t.leaves_enabled());
    assert!(r.observe(false).is_none());
}

#[test]
fn state_helpers() {
    assert!(ManualControlState::Enabled.is_enabled());
    assert!(!ManualControlState::PendingToggle { target: true }.is_enabled());
    assert!(ManualControlState::PendingToggle { target: false }.is_pending());
    assert_eq!(ManualControlState::default(), ManualControlState::Disabled);
}
