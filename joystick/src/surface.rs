//! Control surface: pointer capture, geometry and the drag state machine.
//!
//! The controller is driven by pointer events and returns [`SurfaceAction`]s
//! for the host to execute: dispatch a vector, arm or cancel the resend
//! tick, and issue the forced stop. It never touches timers or the network.
//!
//! Geometry is snapshotted once at pointer-down. The operator may drag past
//! the widget's edges; the radial distance is capped at the surface radius,
//! which keeps the gesture's angle.

#[cfg(test)]
#[path = "surface_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_GRACE_DELAY_MS, DEFAULT_RESEND_INTERVAL_MS};
use crate::shaper::{MovementVector, NormalizedAxes, Shaper};

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in screen space (CSS pixels, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen-space bounding box of the circular control surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point { x: self.left + self.width / 2.0, y: self.top + self.height / 2.0 }
    }

    /// Radius of the inscribed circle.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }

    /// Convert a screen point to normalized axes.
    ///
    /// The offset from the centre is capped at the radius before dividing, so
    /// points outside the circle land on its edge at the same angle.
    #[must_use]
    pub fn axes_at(&self, point: Point) -> NormalizedAxes {
        let radius = self.radius();
        if radius <= 0.0 {
            return NormalizedAxes::default();
        }
        let center = self.center();
        let mut dx = point.x - center.x;
        let mut dy = point.y - center.y;
        let dist = dx.hypot(dy);
        if dist > radius {
            let scale = radius / dist;
            dx *= scale;
            dy *= scale;
        }
        NormalizedAxes { x: dx / radius, y: -dy / radius }
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Identifier of the pointer that owns the capture.
pub type PointerId = u32;

/// Context held between pointer-down and pointer-up/cancel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// The captured pointer; moves from other pointers are ignored.
    pub pointer_id: PointerId,
    /// Geometry snapshot taken at pointer-down.
    pub rect: SurfaceRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SurfaceState {
    /// No pointer captured; the vector is pinned at `(0, 0)`.
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Work the host must carry out after a surface event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceAction {
    /// Run this vector through the dispatcher now.
    Dispatch(MovementVector),
    /// Arm the resend tick: first fire after `delay_ms`, then every `interval_ms`.
    StartResend { delay_ms: u64, interval_ms: u64 },
    /// Cancel the resend tick.
    StopResend,
    /// Transmit the forced stop, bypassing suppression.
    ForceStop,
}

/// Resend tick timing for a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTiming {
    pub grace_delay_ms: u64,
    pub resend_interval_ms: u64,
}

impl Default for SurfaceTiming {
    fn default() -> Self {
        Self { grace_delay_ms: DEFAULT_GRACE_DELAY_MS, resend_interval_ms: DEFAULT_RESEND_INTERVAL_MS }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceController {
    shaper: Shaper,
    timing: SurfaceTiming,
    state: SurfaceState,
    vector: MovementVector,
}

impl SurfaceController {
    #[must_use]
    pub fn new(shaper: Shaper, timing: SurfaceTiming) -> Self {
        Self { shaper, timing, state: SurfaceState::Idle, vector: MovementVector::STOP }
    }

    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SurfaceState::Dragging(_))
    }

    /// The currently intended (displayed) vector.
    #[must_use]
    pub fn vector(&self) -> MovementVector {
        self.vector
    }

    #[must_use]
    pub fn shaper(&self) -> Shaper {
        self.shaper
    }

    /// Begin a drag. A no-op unless manual control is `enabled` and the
    /// surface is idle.
    pub fn pointer_down(&mut self, pointer_id: PointerId, point: Point, rect: SurfaceRect, enabled: bool) -> Vec<SurfaceAction> {
        if !enabled || self.is_dragging() {
            return Vec::new();
        }
        self.state = SurfaceState::Dragging(DragSession { pointer_id, rect });
        self.vector = self.shaper.shape(rect.axes_at(point));
        vec![
            SurfaceAction::Dispatch(self.vector),
            SurfaceAction::StartResend {
                delay_ms: self.timing.grace_delay_ms,
                interval_ms: self.timing.resend_interval_ms,
            },
        ]
    }

    /// Recompute the vector from the pointer's current position.
    pub fn pointer_move(&mut self, pointer_id: PointerId, point: Point) -> Vec<SurfaceAction> {
        let SurfaceState::Dragging(drag) = self.state else {
            return Vec::new();
        };
        if drag.pointer_id != pointer_id {
            return Vec::new();
        }
        self.vector = self.shaper.shape(drag.rect.axes_at(point));
        vec![SurfaceAction::Dispatch(self.vector)]
    }

    /// End the drag owned by `pointer_id`.
    pub fn pointer_up(&mut self, pointer_id: PointerId) -> Vec<SurfaceAction> {
        match self.state {
            SurfaceState::Dragging(drag) if drag.pointer_id == pointer_id => self.end_drag(),
            _ => Vec::new(),
        }
    }

    /// Pointer cancel behaves like release.
    pub fn pointer_cancel(&mut self, pointer_id: PointerId) -> Vec<SurfaceAction> {
        self.pointer_up(pointer_id)
    }

    /// Force the surface back to idle, e.g. when manual control leaves `Enabled`.
    pub fn force_idle(&mut self) -> Vec<SurfaceAction> {
        if self.is_dragging() { self.end_drag() } else { Vec::new() }
    }

    /// The vector to feed the dispatcher on a resend tick, if dragging.
    #[must_use]
    pub fn tick(&self) -> Option<MovementVector> {
        self.is_dragging().then_some(self.vector)
    }

    fn end_drag(&mut self) -> Vec<SurfaceAction> {
        self.state = SurfaceState::Idle;
        self.vector = MovementVector::STOP;
        vec![SurfaceAction::StopResend, SurfaceAction::ForceStop]
    }
}
