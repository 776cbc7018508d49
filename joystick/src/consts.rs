//! Shared numeric constants for the joystick crate.

// ── Shaping ─────────────────────────────────────────────────────

/// Radius around the surface centre treated as no movement.
pub const DEFAULT_DEADZONE: f64 = 0.15;

/// Multiplier on the deadzone that separates the axis lanes from the arc lane.
pub const LANE_WIDTH_FACTOR: f64 = 1.5;

/// Maximum speed for each [`crate::shaper::SpeedLevel`], slowest first.
pub const SPEED_LEVELS: [f64; 3] = [0.1, 0.6, 1.0];

// ── Dispatch ────────────────────────────────────────────────────

/// Minimum angle change in degrees that justifies a resend.
pub const DEFAULT_ANGLE_EPSILON: f64 = 3.0;

/// Minimum velocity change that justifies a resend.
pub const DEFAULT_VELOCITY_EPSILON: f64 = 0.02;

/// Unchanged commands are refreshed at this period so the remote session stays alive.
pub const DEFAULT_RESEND_INTERVAL_MS: u64 = 250;

/// Delay between gesture start and the first resend tick.
pub const DEFAULT_GRACE_DELAY_MS: u64 = 50;

/// Decimal places kept on the wire for velocity.
pub const VELOCITY_DECIMALS: i32 = 3;

/// Decimal places kept on the wire for angle.
pub const ANGLE_DECIMALS: i32 = 1;

// ── Reconciliation ──────────────────────────────────────────────

/// Period of the remote manual-control state poll.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Water-usage preset that disables liquid dispensing.
pub const WATER_PRESET_OFF: &str = "off";
