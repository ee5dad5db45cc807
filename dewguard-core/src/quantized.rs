//! Fixed-point readings for bulk telemetry storage
//!
//! History entries store readings as signed hundredths so one entry stays a
//! few dozen bytes regardless of how many floats a snapshot carries.

use crate::constants::{ABSENT_HUNDREDTHS, TEMPERATURE_VALIDITY_FLOOR_C};

/// A reading stored as hundredths of its unit in an `i16`.
///
/// Covers -327.68..=327.67, enough for °C, %RH, volts and amps on a 12V
/// dew controller. Out-of-range inputs saturate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hundredths(i16);

impl Hundredths {
    /// Sentinel meaning "no reading".
    pub const ABSENT: Self = Self(ABSENT_HUNDREDTHS);

    /// Quantize a float, rounding to the nearest hundredth.
    ///
    /// NaN quantizes to [`Hundredths::ABSENT`].
    pub fn from_f32(value: f32) -> Self {
        if value.is_nan() {
            return Self::ABSENT;
        }
        let scaled = libm::roundf(value * 100.0);
        // `as` saturates float-to-int conversions
        Self(scaled as i16)
    }

    /// Quantize an optional reading, using the sentinel for `None`.
    pub fn from_option(value: Option<f32>) -> Self {
        value.map_or(Self::ABSENT, Self::from_f32)
    }

    /// Wrap raw hundredths.
    pub const fn from_raw(raw: i16) -> Self {
        Self(raw)
    }

    /// Raw hundredths.
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// Value in whole units.
    pub fn to_f32(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Value in whole units, or `None` when below the validity floor.
    ///
    /// The sentinel is below the floor, so it always maps to `None`.
    pub fn to_option(self) -> Option<f32> {
        let value = self.to_f32();
        (value >= TEMPERATURE_VALIDITY_FLOOR_C).then_some(value)
    }

    /// Whether this is the absent sentinel.
    pub const fn is_absent(self) -> bool {
        self.0 == ABSENT_HUNDREDTHS
    }
}

impl From<f32> for Hundredths {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

/// Duty fraction (0..=1) as a whole percentage.
pub fn duty_percent(duty: f32) -> u8 {
    let clamped = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
    libm::roundf(clamped * 100.0) as u8
}
