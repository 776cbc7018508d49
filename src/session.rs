//! Control session: the event loop behind one mounted control surface.
//!
//! DESIGN
//! ======
//! One tokio task owns the surface controller, the dispatcher and the
//! reconciler. A `select!` loop multiplexes:
//! - host events (pointer, toggle, dock, locate, shutdown),
//! - the resend interval, armed only while dragging,
//! - the poll interval, alive for the whole session,
//! - completions of gateway calls.
//!
//! Each branch runs to completion before the next, so the owned state needs
//! no locks.
//!
//! Gateway calls are spawned and never awaited inside the loop. A new command
//! can go out before the previous round-trip finishes. Every command is a
//! full snapshot, so reordering on the wire is harmless and a slow robot
//! never delays the next tick's decision.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures are logged where they happen and produce no
//! completion, so they never mutate state. The next tick decides afresh.
//! Completions that arrive after shutdown find the channel closed and are
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use joystick::consts::WATER_PRESET_OFF;
use joystick::discovery::{SwitchEntity, SwitchHandle};
use joystick::dispatcher::{Decision, Dispatcher};
use joystick::reconciler::{ManualControlState, Reconciler, ToggleRequest, Transition};
use joystick::shaper::MovementVector;
use joystick::surface::{Point, PointerId, SurfaceAction, SurfaceController, SurfaceRect};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::ControlSettings;
use crate::gateway::{Gateway, GatewayError};

const EVENT_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Input from the host driving the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PointerDown { pointer_id: PointerId, point: Point, rect: SurfaceRect },
    PointerMove { pointer_id: PointerId, point: Point },
    PointerUp { pointer_id: PointerId },
    PointerCancel { pointer_id: PointerId },
    ToggleManualControl,
    Dock,
    Locate,
    /// Unmount the surface.
    Shutdown,
}

/// What the host displays.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SessionStatus {
    pub manual_control: ManualControlStatus,
    pub dragging: bool,
    pub vector: MovementVector,
    pub battery_level: Option<u8>,
    pub switch_found: bool,
}

/// Serializable mirror of [`ManualControlState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ManualControlStatus {
    #[default]
    Disabled,
    Enabled,
    Pending { target: bool },
}

impl From<ManualControlState> for ManualControlStatus {
    fn from(state: ManualControlState) -> Self {
        match state {
            ManualControlState::Disabled => Self::Disabled,
            ManualControlState::Enabled => Self::Enabled,
            ManualControlState::PendingToggle { target } => Self::Pending { target },
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("control session has shut down")]
pub struct SessionClosed;

/// Handle to a running session.
pub struct SessionHandle {
    events: mpsc::Sender<HostEvent>,
    status: watch::Receiver<SessionStatus>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a host event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] once the session loop has exited.
    pub async fn send(&self, event: HostEvent) -> Result<(), SessionClosed> {
        self.events.send(event).await.map_err(|_| SessionClosed)
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Unmount: stop both timers, issue the final stop and wait for the loop to exit.
    pub async fn shutdown(self) {
        if self.events.send(HostEvent::Shutdown).await.is_err() {
            debug!("session already stopped");
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "control session task failed");
        }
    }
}

/// Spawn a control session against `gateway`.
#[must_use]
pub fn spawn_session(gateway: Arc<dyn Gateway>, settings: ControlSettings) -> SessionHandle {
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (status_tx, status_rx) = watch::channel(SessionStatus::default());
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    info!(
        deadzone = settings.deadzone,
        speed = ?settings.speed,
        resend_ms = settings.dispatch.resend_interval_ms,
        poll_ms = settings.poll_interval_ms,
        "control session starting"
    );

    let session = ControlSession {
        gateway,
        surface: SurfaceController::new(settings.shaper(), settings.timing),
        dispatcher: Dispatcher::new(settings.dispatch),
        reconciler: Reconciler::default(),
        started: Instant::now(),
        resend: None,
        battery_level: None,
        completions: completion_tx,
        status: status_tx,
    };
    let poll_every = Duration::from_millis(settings.poll_interval_ms);
    let task = tokio::spawn(session.run(event_rx, completion_rx, poll_every));

    SessionHandle { events: event_tx, status: status_rx, task }
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Results of spawned gateway calls, fed back into the loop.
#[derive(Debug)]
enum Completion {
    CommandSent(MovementVector),
    Battery(Option<u8>),
    Switches(Vec<SwitchEntity>),
    Polled(bool),
    PresetRead(Option<String>),
}

struct ControlSession {
    gateway: Arc<dyn Gateway>,
    surface: SurfaceController,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    started: Instant,
    resend: Option<Interval>,
    battery_level: Option<u8>,
    completions: mpsc::UnboundedSender<Completion>,
    status: watch::Sender<SessionStatus>,
}

impl ControlSession {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<HostEvent>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        poll_every: Duration,
    ) {
        let mut poll = tokio::time::interval(poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(HostEvent::Shutdown) | None => break,
                    Some(event) => self.on_event(event),
                },
                _ = poll.tick() => self.poll(),
                () = next_resend(&mut self.resend) => self.on_resend_tick(),
                Some(done) = completions.recv() => self.on_completion(done),
            }
            self.publish();
        }

        self.teardown().await;
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Notify watchers only when the snapshot actually changed.
    fn publish(&self) {
        let next = SessionStatus {
            manual_control: self.reconciler.state().into(),
            dragging: self.surface.is_dragging(),
            vector: self.surface.vector(),
            battery_level: self.battery_level,
            switch_found: self.reconciler.switch().is_some(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    // --- Host events ---

    fn on_event(&mut self, event: HostEvent) {
        let enabled = self.reconciler.is_enabled();
        let actions = match event {
            HostEvent::PointerDown { pointer_id, point, rect } => {
                let actions = self.surface.pointer_down(pointer_id, point, rect, enabled);
                if actions.is_empty() && !enabled {
                    debug!(state = ?self.reconciler.state(), "drag ignored: manual control not enabled");
                }
                actions
            }
            HostEvent::PointerMove { pointer_id, point } => self.surface.pointer_move(pointer_id, point),
            HostEvent::PointerUp { pointer_id } => self.surface.pointer_up(pointer_id),
            HostEvent::PointerCancel { pointer_id } => self.surface.pointer_cancel(pointer_id),
            HostEvent::ToggleManualControl => {
                self.request_toggle();
                Vec::new()
            }
            HostEvent::Dock => {
                self.spawn_oneshot("dock", |gw| async move { gw.dock().await });
                Vec::new()
            }
            HostEvent::Locate => {
                self.spawn_oneshot("locate", |gw| async move { gw.play_sound().await });
                Vec::new()
            }
            HostEvent::Shutdown => Vec::new(),
        };
        self.apply(actions);
    }

    fn apply(&mut self, actions: Vec<SurfaceAction>) {
        for action in actions {
            match action {
                SurfaceAction::Dispatch(vector) => self.dispatch(vector),
                SurfaceAction::StartResend { delay_ms, interval_ms } => {
                    let mut resend = tokio::time::interval_at(
                        Instant::now() + Duration::from_millis(delay_ms),
                        Duration::from_millis(interval_ms),
                    );
                    resend.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.resend = Some(resend);
                }
                SurfaceAction::StopResend => self.resend = None,
                SurfaceAction::ForceStop => {
                    debug!("forced stop");
                    self.transmit(self.dispatcher.forced_stop());
                }
            }
        }
    }

    fn on_resend_tick(&mut self) {
        if let Some(vector) = self.surface.tick() {
            self.dispatch(vector);
        }
    }

    // --- Dispatch ---

    fn dispatch(&mut self, vector: MovementVector) {
        match self.dispatcher.decide(vector, self.now_ms(), self.reconciler.is_enabled()) {
            Ok(Decision::Send(command)) => self.transmit(command),
            Ok(Decision::Skip(reason)) => trace!(?reason, "command suppressed"),
            Err(e) => warn!(error = %e, "movement vector rejected"),
        }
    }

    fn transmit(&self, command: MovementVector) {
        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            match gateway.send_movement_command(command).await {
                Ok(()) => report(&completions, Completion::CommandSent(command)),
                Err(e) => log_failure("movement command", &e),
            }
        });
    }

    // --- Reconciliation ---

    fn poll(&self) {
        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions.clone();
        let switch = self.reconciler.switch().cloned();
        tokio::spawn(async move {
            match gateway.battery_level().await {
                Ok(level) => report(&completions, Completion::Battery(level)),
                Err(e) => log_failure("battery level", &e),
            }
            match switch {
                Some(switch) => poll_switch(gateway.as_ref(), &switch, &completions).await,
                None => match gateway.list_switches().await {
                    Ok(entities) => report(&completions, Completion::Switches(entities)),
                    Err(e) => log_failure("switch directory", &e),
                },
            }
        });
    }

    fn poll_switch_now(&self, switch: SwitchHandle) {
        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions.clone();
        tokio::spawn(async move { poll_switch(gateway.as_ref(), &switch, &completions).await });
    }

    fn request_toggle(&mut self) {
        let Some(request) = self.reconciler.request_toggle() else {
            debug!(
                state = ?self.reconciler.state(),
                switch_found = self.reconciler.switch().is_some(),
                "toggle ignored"
            );
            return;
        };
        info!(enable = request.target, switch = %request.switch, "manual control toggle requested");
        self.on_transition(request.transition);

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions.clone();
        tokio::spawn(async move { run_toggle(gateway.as_ref(), request, &completions).await });
    }

    fn on_transition(&mut self, transition: Transition) {
        info!(from = ?transition.from, to = ?transition.to, "manual control state changed");
        if transition.leaves_enabled() {
            let actions = self.surface.force_idle();
            self.apply(actions);
        }
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::CommandSent(command) => {
                let now = self.now_ms();
                self.dispatcher.record_sent(command, now);
            }
            Completion::Battery(level) => self.battery_level = level,
            Completion::Switches(entities) => {
                if self.reconciler.discover(&entities) {
                    if let Some(switch) = self.reconciler.switch().cloned() {
                        info!(%switch, "manual control switch discovered");
                        self.poll_switch_now(switch);
                    }
                } else {
                    debug!(count = entities.len(), "no manual control switch yet");
                }
            }
            Completion::Polled(enabled) => {
                if let Some(transition) = self.reconciler.observe(enabled) {
                    self.on_transition(transition);
                }
            }
            Completion::PresetRead(preset) => self.reconciler.save_preset(preset),
        }
    }

    // --- Misc ---

    fn spawn_oneshot<F, Fut>(&self, what: &'static str, call: F)
    where
        F: FnOnce(Arc<dyn Gateway>) -> Fut,
        Fut: Future<Output = Result<(), GatewayError>> + Send + 'static,
    {
        let fut = call(Arc::clone(&self.gateway));
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => info!(what, "command accepted"),
                Err(e) => log_failure(what, &e),
            }
        });
    }

    async fn teardown(mut self) {
        self.resend = None;
        if self.surface.is_dragging() {
            debug!("unmounted mid-drag");
        }
        let stop = self.dispatcher.forced_stop();
        if let Err(e) = self.gateway.send_movement_command(stop).await {
            log_failure("final stop", &e);
        }
        info!("control session stopped");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn next_resend(resend: &mut Option<Interval>) {
    match resend {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn poll_switch(gateway: &dyn Gateway, switch: &SwitchHandle, completions: &mpsc::UnboundedSender<Completion>) {
    match gateway.get_manual_control_state(switch).await {
        Ok(enabled) => report(completions, Completion::Polled(enabled)),
        Err(e) => log_failure("manual control state", &e),
    }
}

/// Execute a toggle: suspend dispensing, flip the switch, restore dispensing.
async fn run_toggle(gateway: &dyn Gateway, request: ToggleRequest, completions: &mpsc::UnboundedSender<Completion>) {
    if request.suspend_water {
        match gateway.get_water_usage_preset().await {
            Ok(preset) => {
                let active = preset.as_deref().is_some_and(|p| p != WATER_PRESET_OFF);
                report(completions, Completion::PresetRead(preset));
                if active {
                    if let Err(e) = gateway.set_water_usage_preset(WATER_PRESET_OFF).await {
                        log_failure("water usage suspend", &e);
                    }
                }
            }
            Err(e) => log_failure("water usage read", &e),
        }
    }

    match gateway.set_manual_control_state(&request.switch, request.target).await {
        Ok(()) => info!(enable = request.target, "manual control toggle accepted; awaiting poll"),
        Err(e) => log_failure("manual control toggle", &e),
    }

    if let Some(preset) = request.restore_preset {
        if let Err(e) = gateway.set_water_usage_preset(&preset).await {
            log_failure("water usage restore", &e);
        }
    }
}

fn report(completions: &mpsc::UnboundedSender<Completion>, done: Completion) {
    if let Err(e) = completions.send(done) {
        debug!(completion = ?e.0, "session gone; completion discarded");
    }
}

fn log_failure(what: &'static str, e: &GatewayError) {
    if e.transient() {
        warn!(what, error = %e, "gateway call failed");
    } else {
        error!(what, error = %e, "gateway call failed");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
