//! Output Command Ranges
//!
//! Inclusive bounds enforced on the output state command before any
//! controller state is touched.

// ===== DUTY =====

/// Lowest accepted duty fraction.
pub const DUTY_MIN: f32 = 0.0;

/// Highest accepted duty fraction (100% on).
pub const DUTY_MAX: f32 = 1.0;

// ===== TARGETS =====

/// Coldest accepted heater target (°C).
pub const TARGET_TEMPERATURE_MIN_C: f32 = -50.0;

/// Hottest accepted heater target (°C).
///
/// Dew straps are glued to optics; anything hotter risks the lens cement.
pub const TARGET_TEMPERATURE_MAX_C: f32 = 50.0;

/// Most negative offset from ambient dewpoint (°C).
pub const DEWPOINT_OFFSET_MIN_C: f32 = -30.0;

/// Largest offset above ambient dewpoint (°C).
pub const DEWPOINT_OFFSET_MAX_C: f32 = 30.0;

// ===== RAMP =====

/// Smallest ramp width. Zero disables ramping (bang-bang at `max_duty`).
pub const RAMP_OFFSET_MIN_C: f32 = 0.0;

/// Widest ramp below target over which duty scales from min to max (°C).
pub const RAMP_OFFSET_MAX_C: f32 = 20.0;
