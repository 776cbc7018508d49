//! Joystick control core for steering a robot in manual-control mode.
//!
//! This crate holds every decision the control loop makes, with no I/O and no
//! clocks of its own. Time arrives as millisecond timestamps and pointer
//! events arrive as plain data. The session runtime in the host binary
//! executes the returned actions against the network and owns the timers.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`shaper`] | Normalized axes to a bounded `(velocity, angle)` vector |
//! | [`surface`] | Pointer-capture lifecycle and the drag state machine |
//! | [`dispatcher`] | Send/suppress decision and the last-sent cache |
//! | [`reconciler`] | Local manual-control state versus polled remote state |
//! | [`discovery`] | Locating the manual-control switch by naming convention |
//! | [`consts`] | Default thresholds, periods and speed levels |

pub mod consts;
pub mod discovery;
pub mod dispatcher;
pub mod reconciler;
pub mod shaper;
pub mod surface;
