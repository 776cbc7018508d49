//! Locating the remote manual-control switch by naming convention.
//!
//! Deployments name the switch differently (a Home Assistant style
//! `switch.robot_manual_control`, a Valetudo capability name, a human label),
//! so no fixed identifier is assumed. The reconciler takes the matcher as a
//! plain function pointer, which keeps the heuristic swappable.

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// One entry in the remote directory of switch-like entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEntity {
    pub id: String,
    pub label: String,
}

impl SwitchEntity {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into() }
    }
}

/// Handle to the discovered manual-control switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchHandle(pub String);

impl SwitchHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SwitchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Injected lookup used by the reconciler.
pub type SwitchLookup = fn(&[SwitchEntity]) -> Option<SwitchHandle>;

/// Default matcher: identifier prefix/suffix or label substring.
///
/// A high-resolution capability is preferred when several entries match.
#[must_use]
pub fn find_manual_control_switch(entities: &[SwitchEntity]) -> Option<SwitchHandle> {
    let mut matches = entities.iter().filter(|e| is_manual_control(e));
    let first = matches.next()?;
    let preferred = std::iter::once(first)
        .chain(matches)
        .find(|e| e.id.to_ascii_lowercase().contains("highresolution"))
        .unwrap_or(first);
    Some(SwitchHandle(preferred.id.clone()))
}

fn is_manual_control(entity: &SwitchEntity) -> bool {
    let id = entity.id.to_ascii_lowercase();
    let object_id = id.rsplit('.').next().unwrap_or(&id);
    object_id.starts_with("manual_control")
        || object_id.ends_with("manual_control")
        || object_id.ends_with("manualcontrolcapability")
        || entity.label.to_ascii_lowercase().contains("manual control")
}
