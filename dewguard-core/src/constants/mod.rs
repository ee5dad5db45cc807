//! Constants for DewGuard Core
//!
//! Centralized numeric limits used by the controller, the command validator
//! and the telemetry history. Grouped by domain:
//! - **Sensors**: reading validity and psychrometric coefficients
//! - **Control**: accepted ranges for output commands
//! - **Time**: default tick intervals
//! - **Buffers**: history and streaming sizes

/// Sensor reading limits and dewpoint coefficients.
pub mod sensors;

/// Accepted ranges for output state commands.
pub mod control;

/// Default scheduling intervals.
pub mod time;

/// History capacity and streaming buffer sizes.
pub mod buffers;

pub use sensors::{TEMPERATURE_VALIDITY_FLOOR_C, ABSENT_HUNDREDTHS};
pub use control::{
    DUTY_MIN, DUTY_MAX,
    TARGET_TEMPERATURE_MIN_C, TARGET_TEMPERATURE_MAX_C,
    DEWPOINT_OFFSET_MIN_C, DEWPOINT_OFFSET_MAX_C,
    RAMP_OFFSET_MIN_C, RAMP_OFFSET_MAX_C,
};
pub use time::{CONTROL_INTERVAL_SECS, HISTORY_INTERVAL_SECS};
pub use buffers::{DEFAULT_HISTORY_SIZE, HISTORY_ENTRY_JSON_SIZE};
