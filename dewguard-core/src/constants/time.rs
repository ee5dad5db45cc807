//! Scheduling Intervals
//!
//! Defaults for the external scheduler. The core never sleeps; these only
//! seed [`DeviceConfig`](crate::config::DeviceConfig).

/// Seconds between control ticks (sensor sampling + regulation).
pub const CONTROL_INTERVAL_SECS: u32 = 5;

/// Seconds between history snapshots.
///
/// 300 entries at 60 s covers the last five hours of a session.
pub const HISTORY_INTERVAL_SECS: u32 = 60;
