//! Output state commands
//!
//! The HTTP layer decodes the POST body into an [`OutputCommandPayload`],
//! where every field is optional, and [`validate`](OutputCommandPayload::validate)
//! turns it into a typed [`OutputCommand`]. Checks run in a fixed order and
//! the first failure is returned:
//!
//! 1. `index` and `mode` are present
//! 2. `index` exists, `max_duty` (if given) is in range, `mode` is known
//! 3. any mode but `off` carries `max_duty`
//! 4. mode-specific fields are present and in range
//!
//! Persisted configuration elements use the same shape, so the same
//! validation applies on restore.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEWPOINT_OFFSET_MAX_C, DEWPOINT_OFFSET_MIN_C, DUTY_MAX, DUTY_MIN, RAMP_OFFSET_MAX_C, RAMP_OFFSET_MIN_C,
    TARGET_TEMPERATURE_MAX_C, TARGET_TEMPERATURE_MIN_C,
};
use crate::errors::{ValidationError, ValidationResult};
use crate::output::Mode;

/// Output command as received on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputCommandPayload {
    /// Channel index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Mode name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Upper duty bound, 0..=1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duty: Option<f32>,
    /// Lower duty bound, 0..=1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duty: Option<f32>,
    /// Target in °C, -50..=50
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f32>,
    /// Offset above dewpoint in °C, -30..=30
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dewpoint_offset: Option<f32>,
    /// Ramp width in °C, 0..=20
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ramp_offset: Option<f32>,
    /// Re-apply this state on boot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_at_startup: Option<bool>,
}

/// Mode-specific parameters of a validated command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeRequest {
    /// Switch off
    Off,
    /// Constant duty
    Fixed {
        /// Duty to hold
        max_duty: f32,
    },
    /// Regulate towards a fixed temperature
    TargetTemperature {
        /// °C
        target: f32,
        /// Upper duty bound
        max_duty: f32,
        /// Lower duty bound
        min_duty: f32,
        /// Ramp width in °C
        ramp_offset: f32,
    },
    /// Regulate towards ambient dewpoint plus an offset
    Dewpoint {
        /// °C above dewpoint
        offset: f32,
        /// Upper duty bound
        max_duty: f32,
        /// Lower duty bound
        min_duty: f32,
        /// Ramp width in °C
        ramp_offset: f32,
    },
}

impl ModeRequest {
    /// Mode this request enters
    pub fn mode(&self) -> Mode {
        match self {
            Self::Off => Mode::Off,
            Self::Fixed { .. } => Mode::Fixed,
            Self::TargetTemperature { .. } => Mode::TargetTemperature,
            Self::Dewpoint { .. } => Mode::Dewpoint,
        }
    }
}

/// Validated output command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputCommand {
    /// Channel index, in range for the registry it was validated against
    pub index: u8,
    /// Mode and parameters
    pub request: ModeRequest,
    /// Re-apply this state on boot
    pub apply_at_startup: bool,
}

impl OutputCommandPayload {
    /// Validate against a registry of `channels` outputs
    pub fn validate(&self, channels: usize) -> ValidationResult<OutputCommand> {
        let index = self.index.ok_or(ValidationError::MissingField { field: "index" })?;
        let mode = self.mode.as_deref().ok_or(ValidationError::MissingField { field: "mode" })?;

        let index = u8::try_from(index)
            .ok()
            .filter(|i| usize::from(*i) < channels)
            .ok_or(ValidationError::InvalidIndex { index, channels })?;
        if let Some(max_duty) = self.max_duty {
            check_range("max_duty", max_duty, DUTY_MIN, DUTY_MAX)?;
        }
        let mode: Mode = mode.parse()?;

        let request = match mode {
            Mode::Off => ModeRequest::Off,
            mode => self.active_request(mode)?,
        };

        Ok(OutputCommand {
            index,
            request,
            apply_at_startup: self.apply_at_startup.unwrap_or(false),
        })
    }

    fn active_request(&self, mode: Mode) -> ValidationResult<ModeRequest> {
        let max_duty = self.max_duty.ok_or(ValidationError::MissingField { field: "max_duty" })?;

        Ok(match mode {
            Mode::Dewpoint => {
                let offset = required_in_range(
                    "dewpoint_offset",
                    self.dewpoint_offset,
                    DEWPOINT_OFFSET_MIN_C,
                    DEWPOINT_OFFSET_MAX_C,
                )?;
                let (min_duty, ramp_offset) = self.ramp_fields()?;
                ModeRequest::Dewpoint { offset, max_duty, min_duty, ramp_offset }
            }
            Mode::TargetTemperature => {
                let target = required_in_range(
                    "target_temperature",
                    self.target_temperature,
                    TARGET_TEMPERATURE_MIN_C,
                    TARGET_TEMPERATURE_MAX_C,
                )?;
                let (min_duty, ramp_offset) = self.ramp_fields()?;
                ModeRequest::TargetTemperature { target, max_duty, min_duty, ramp_offset }
            }
            Mode::Fixed | Mode::Off => ModeRequest::Fixed { max_duty },
        })
    }

    /// Optional `min_duty` and `ramp_offset`, defaulting to 0
    fn ramp_fields(&self) -> ValidationResult<(f32, f32)> {
        let min_duty = optional_in_range("min_duty", self.min_duty, DUTY_MIN, DUTY_MAX)?;
        let ramp_offset = optional_in_range("ramp_offset", self.ramp_offset, RAMP_OFFSET_MIN_C, RAMP_OFFSET_MAX_C)?;
        Ok((min_duty.unwrap_or(0.0), ramp_offset.unwrap_or(0.0)))
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> ValidationResult<f32> {
    if !value.is_finite() {
        return Err(ValidationError::NotANumber { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value, min, max });
    }
    Ok(value)
}

fn required_in_range(field: &'static str, value: Option<f32>, min: f32, max: f32) -> ValidationResult<f32> {
    let value = value.ok_or(ValidationError::MissingField { field })?;
    check_range(field, value, min, max)
}

fn optional_in_range(field: &'static str, value: Option<f32>, min: f32, max: f32) -> ValidationResult<Option<f32>> {
    value.map(|v| check_range(field, v, min, max)).transpose()
}
