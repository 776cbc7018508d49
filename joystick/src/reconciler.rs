//! Manual-control reconciliation: local intent versus polled remote truth.
//!
//! DESIGN
//! ======
//! The remote enable flag can only be observed by polling, while the
//! operator toggles it asynchronously. An explicit three-state machine
//! (`Disabled`, `Enabled`, `PendingToggle`) replaces a pair of loosely
//! coupled booleans.
//!
//! - A toggle moves to `PendingToggle { target }` and hands the caller a
//!   [`ToggleRequest`] to execute. A toggle while pending is ignored.
//! - A poll that observes a value different from the last known one is
//!   adopted, and it clears any pending toggle to match, whatever the target
//!   was. The poll is ground truth, not a confirmation of intent.
//! - A poll that observes the pre-request value keeps the toggle pending
//!   until a later poll shows a change. An accepted set request does not
//!   settle it: the device may answer before it applies the change.
//!
//! `PendingToggle` has no timeout. If the set request never reaches the
//! device, the state stays pending until a poll shows a change.

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;

use crate::consts::WATER_PRESET_OFF;
use crate::discovery::{SwitchEntity, SwitchHandle, SwitchLookup, find_manual_control_switch};

/// Locally cached manual-control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualControlState {
    #[default]
    Disabled,
    Enabled,
    /// A toggle was requested; `target` is the state the operator asked for.
    PendingToggle { target: bool },
}

impl ManualControlState {
    #[must_use]
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::PendingToggle { .. })
    }
}

/// A change of [`ManualControlState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ManualControlState,
    pub to: ManualControlState,
}

impl Transition {
    /// Whether input must stop: the state left `Enabled`.
    #[must_use]
    pub fn leaves_enabled(&self) -> bool {
        self.from.is_enabled() && !self.to.is_enabled()
    }
}

/// Remote calls the caller must issue for a toggle, in order.
///
/// 1. If `suspend_water`, read the water-usage preset, report it through
///    [`Reconciler::save_preset`], and set it to `off` unless it already is.
/// 2. Set the manual-control switch to `target`.
/// 3. If `restore_preset` is set, restore that water-usage preset.
///
/// No step is rolled back if a later one fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRequest {
    pub switch: SwitchHandle,
    pub target: bool,
    pub suspend_water: bool,
    pub restore_preset: Option<String>,
    pub transition: Transition,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    lookup: SwitchLookup,
    switch: Option<SwitchHandle>,
    state: ManualControlState,
    /// Last value observed from, or assumed about, the remote switch.
    known: bool,
    saved_preset: Option<String>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(find_manual_control_switch)
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(lookup: SwitchLookup) -> Self {
        Self {
            lookup,
            switch: None,
            state: ManualControlState::Disabled,
            known: false,
            saved_preset: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ManualControlState {
        self.state
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// The discovered switch, if any.
    #[must_use]
    pub fn switch(&self) -> Option<&SwitchHandle> {
        self.switch.as_ref()
    }

    /// The water preset to restore on the next disable.
    #[must_use]
    pub fn saved_preset(&self) -> Option<&str> {
        self.saved_preset.as_deref()
    }

    /// Run the lookup if no switch has been found yet.
    ///
    /// Returns `true` when this call discovered the switch.
    pub fn discover(&mut self, entities: &[SwitchEntity]) -> bool {
        if self.switch.is_some() {
            return false;
        }
        self.switch = (self.lookup)(entities);
        self.switch.is_some()
    }

    /// Ask to flip the switch.
    ///
    /// Returns `None` while not ready (no switch) or already pending.
    pub fn request_toggle(&mut self) -> Option<ToggleRequest> {
        let switch = self.switch.clone()?;
        if self.state.is_pending() {
            return None;
        }
        let target = !self.state.is_enabled();
        let transition = self.transition_to(ManualControlState::PendingToggle { target });
        Some(ToggleRequest {
            switch,
            target,
            suspend_water: target,
            restore_preset: if target { None } else { self.saved_preset.take() },
            transition,
        })
    }

    /// Remember the water preset read before enabling.
    ///
    /// `off` and unknown presets are not saved; there is nothing to restore.
    pub fn save_preset(&mut self, preset: Option<String>) {
        self.saved_preset = preset.filter(|p| p != WATER_PRESET_OFF);
    }

    /// Apply a polled observation of the remote switch.
    ///
    /// Returns the transition, if the state changed.
    pub fn observe(&mut self, observed: bool) -> Option<Transition> {
        if observed == self.known {
            return None;
        }
        self.known = observed;
        let transition = self.transition_to(ManualControlState::from_enabled(observed));
        (transition.from != transition.to).then_some(transition)
    }

    fn transition_to(&mut self, to: ManualControlState) -> Transition {
        let from = self.state;
        self.state = to;
        Transition { from, to }
    }
}
