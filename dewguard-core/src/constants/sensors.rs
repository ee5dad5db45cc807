//! Sensor Reading Limits
//!
//! Validity thresholds for heater and ambient readings, and the Magnus
//! coefficients used for dewpoint.

/// Lowest heater temperature accepted as a real reading (°C).
///
/// Thermistor channels with no probe attached float to extreme negative
/// values. Anything below this floor is treated as "no reading" and never
/// stored on the output.
pub const TEMPERATURE_VALIDITY_FLOOR_C: f32 = -50.0;

/// Quantized sentinel for an absent reading (hundredths).
///
/// -100.00 °C sits below [`TEMPERATURE_VALIDITY_FLOOR_C`], so a stored
/// sentinel always serializes as `null`.
pub const ABSENT_HUNDREDTHS: i16 = -10_000;

/// Magnus formula coefficient `a` (dimensionless).
///
/// Source: Sonntag (1990), valid -45°C to 60°C over water
pub const MAGNUS_A: f32 = 17.62;

/// Magnus formula coefficient `b` (°C).
///
/// Source: Sonntag (1990)
pub const MAGNUS_B_C: f32 = 243.12;

/// Lowest relative humidity reported by simulated ambient sensors (%).
pub const HUMIDITY_MIN_PCT: f32 = 0.0;

/// Highest relative humidity reported by simulated ambient sensors (%).
pub const HUMIDITY_MAX_PCT: f32 = 100.0;
