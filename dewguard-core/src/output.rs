//! PWM Output Controller
//!
//! One [`Output`] per channel. Every control tick the owner samples the
//! channel's probe and calls [`Output::regulate`], which turns the reading and
//! the active [`Mode`] into a duty cycle and hands it to the [`PwmDriver`].
//!
//! ## Modes
//!
//! | Mode                 | Duty                                              |
//! |----------------------|---------------------------------------------------|
//! | `off`                | 0                                                 |
//! | `fixed`              | `max_duty`                                        |
//! | `target_temperature` | ramp towards `target_temperature`                 |
//! | `dewpoint`           | ramp towards ambient dewpoint + `dewpoint_offset` |
//!
//! The two temperature modes share the ramp:
//!
//! ```text
//! current >= target  ->  0
//! ramp_offset > 0    ->  factor = clamp((target - current) / ramp_offset, 0, 1)
//! otherwise          ->  factor = 1
//! duty = clamp(factor * (max_duty - min_duty) + min_duty, 0, 1)
//! ```
//!
//! ## Sensor loss
//!
//! A reading below -50°C or not finite is discarded. While a temperature mode
//! has no reading the duty drops to 0 and a warning is logged; the mode is
//! kept, so regulation resumes by itself once the probe answers again.
//! Activating a temperature mode without a reading is refused instead.

use core::fmt::{self, Write as _};
use core::str::FromStr;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::command::ModeRequest;
use crate::constants::{DUTY_MAX, DUTY_MIN, RAMP_OFFSET_MIN_C, TEMPERATURE_VALIDITY_FLOOR_C};
use crate::errors::{ControlError, ControlResult, ValidationError};
use crate::sensors::PwmDriver;

/// Capacity of the per-output log scope, `"PWMOutput[255] -"` fits
const LOG_SCOPE_CAPACITY: usize = 20;

/// Hardware behind a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    /// Dew heater strip with a temperature probe
    #[serde(rename = "heater")]
    Heater,
    /// Switched 12V output, no probe
    #[serde(rename = "output")]
    PlainOutput,
}

impl OutputKind {
    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heater => "heater",
            Self::PlainOutput => "output",
        }
    }

    /// Whether temperature modes can run on this kind
    pub const fn supports_temperature(self) -> bool {
        matches!(self, Self::Heater)
    }
}

/// Control mode of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Output disabled
    #[default]
    Off,
    /// Constant duty
    Fixed,
    /// Hold the heater at a fixed temperature
    TargetTemperature,
    /// Hold the heater above the ambient dewpoint
    Dewpoint,
}

impl Mode {
    /// Every mode, in wire order
    pub const ALL: [Mode; 4] = [Mode::Off, Mode::Fixed, Mode::TargetTemperature, Mode::Dewpoint];

    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Fixed => "fixed",
            Self::TargetTemperature => "target_temperature",
            Self::Dewpoint => "dewpoint",
        }
    }

    /// Whether the mode regulates against a temperature reading
    pub const fn is_temperature_driven(self) -> bool {
        matches!(self, Self::TargetTemperature | Self::Dewpoint)
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or(ValidationError::InvalidMode)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One PWM channel and its regulation state
#[derive(Debug, Clone)]
pub struct Output {
    index: u8,
    kind: OutputKind,
    mode: Mode,
    max_duty: f32,
    min_duty: f32,
    target_temperature: f32,
    dewpoint_offset: f32,
    ramp_offset: f32,
    apply_at_startup: bool,
    /// Last valid probe reading
    temperature: Option<f32>,
    /// Last duty handed to the driver
    current_duty: f32,
    log_scope: String<LOG_SCOPE_CAPACITY>,
}

impl Output {
    /// Create channel `index`, `Off` with duty 0
    pub fn new(index: u8, kind: OutputKind) -> Self {
        let mut log_scope = String::new();
        // Cannot overflow: the longest scope is 16 bytes
        let _ = write!(log_scope, "PWMOutput[{}] -", index);
        log_info!("{} PWMOutput initialised, type={}", log_scope, kind.as_str());

        Self {
            index,
            kind,
            mode: Mode::Off,
            max_duty: 0.0,
            min_duty: 0.0,
            target_temperature: 0.0,
            dewpoint_offset: 0.0,
            ramp_offset: 0.0,
            apply_at_startup: false,
            temperature: None,
            current_duty: 0.0,
            log_scope,
        }
    }

    /// Force the hardware to duty 0, regardless of the cached duty
    pub fn reset<D: PwmDriver + ?Sized>(&mut self, driver: &mut D) {
        self.current_duty = DUTY_MIN;
        driver.write_duty(self.index, DUTY_MIN);
    }

    /// Record a probe sample without regulating.
    ///
    /// Used before activation so a temperature mode can be entered before
    /// the first control tick. Invalid samples clear the stored reading.
    pub fn observe_temperature(&mut self, reading: Option<f32>) {
        self.temperature = valid_reading(reading);
        if reading.is_some() && self.temperature.is_none() {
            log_trace!("{} invalid temperature detected, discarding temperature", self.log_scope);
        }
    }

    /// Run one regulation step and return the committed duty.
    ///
    /// `reading` is this tick's probe sample, `ambient_dewpoint` the dewpoint
    /// of this tick's ambient reading. The driver is written only when the
    /// duty changes.
    pub fn regulate<D: PwmDriver + ?Sized>(
        &mut self,
        reading: Option<f32>,
        ambient_dewpoint: Option<f32>,
        driver: &mut D,
    ) -> f32 {
        self.observe_temperature(reading);
        let duty = self.compute_duty(ambient_dewpoint);
        self.commit(duty, driver)
    }

    /// Switch to a new mode.
    ///
    /// Temperature modes need a stored reading on a heater channel, dewpoint
    /// also needs `ambient_dewpoint`. On failure nothing changes. On success
    /// one regulation step runs with the stored reading.
    pub fn apply_state<D: PwmDriver + ?Sized>(
        &mut self,
        request: ModeRequest,
        ambient_dewpoint: Option<f32>,
        driver: &mut D,
    ) -> ControlResult<f32> {
        match request {
            ModeRequest::Off => {
                self.mode = Mode::Off;
            }
            ModeRequest::Fixed { max_duty } => {
                if max_duty > 0.0 {
                    self.max_duty = max_duty;
                    self.mode = Mode::Fixed;
                } else {
                    self.mode = Mode::Off;
                }
            }
            ModeRequest::TargetTemperature { target, max_duty, min_duty, ramp_offset } => {
                self.require_temperature()?;
                self.target_temperature = target;
                self.set_ramp(max_duty, min_duty, ramp_offset);
                self.mode = Mode::TargetTemperature;
            }
            ModeRequest::Dewpoint { offset, max_duty, min_duty, ramp_offset } => {
                self.require_temperature()?;
                if valid_dewpoint(ambient_dewpoint).is_none() {
                    log_warn!("{} Cannot set PWM output temperature without ambient sensor", self.log_scope);
                    return Err(ControlError::SensorUnavailable {
                        channel: self.index,
                        reason: "ambient sensor not available",
                    });
                }
                self.dewpoint_offset = offset;
                self.set_ramp(max_duty, min_duty, ramp_offset);
                self.mode = Mode::Dewpoint;
            }
        }
        log_info!("{} mode set to {}", self.log_scope, self.mode);

        let duty = self.compute_duty(ambient_dewpoint);
        Ok(self.commit(duty, driver))
    }

    /// Set the persistence flag
    pub fn set_apply_at_startup(&mut self, apply_at_startup: bool) {
        self.apply_at_startup = apply_at_startup;
    }

    fn require_temperature(&self) -> ControlResult<()> {
        if !self.kind.supports_temperature() || self.temperature.is_none() {
            log_warn!("{} Cannot set PWM output temperature without temperature sensor", self.log_scope);
            return Err(ControlError::SensorUnavailable {
                channel: self.index,
                reason: "temperature sensor not available",
            });
        }
        Ok(())
    }

    fn set_ramp(&mut self, max_duty: f32, min_duty: f32, ramp_offset: f32) {
        self.max_duty = max_duty;
        self.min_duty = min_duty;
        self.ramp_offset = ramp_offset.max(RAMP_OFFSET_MIN_C);
    }

    fn compute_duty(&self, ambient_dewpoint: Option<f32>) -> f32 {
        let target = match self.mode {
            Mode::Off => return DUTY_MIN,
            Mode::Fixed => return self.max_duty,
            Mode::TargetTemperature => self.target_temperature,
            Mode::Dewpoint => match valid_dewpoint(ambient_dewpoint) {
                Some(dewpoint) => dewpoint + self.dewpoint_offset,
                None => {
                    log_warn!("{} Unable to set target temperature, ambient sensor not found.", self.log_scope);
                    return DUTY_MIN;
                }
            },
        };

        let Some(current) = self.temperature else {
            log_warn!("{} Unable to set target temperature, sensor not found.", self.log_scope);
            return DUTY_MIN;
        };

        log_trace!("{} Got target temperature=`{}`, current temperature=`{}`", self.log_scope, target, current);
        if current >= target {
            log_info!(
                "{} temperature `{}` reached target temperature `{}`, setting PWM to 0",
                self.log_scope, current, target
            );
            return DUTY_MIN;
        }

        let ramp_factor = if self.ramp_offset > 0.0 {
            ((target - current) / self.ramp_offset).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let duty = (ramp_factor * (self.max_duty - self.min_duty) + self.min_duty).clamp(DUTY_MIN, DUTY_MAX);
        log_info!(
            "{} temperature `{}` lower than target temperature `{}`, ramp=`{}` and PWM range is `{}-{}`, ramp factor=`{}`, setting PWM to `{}`",
            self.log_scope, current, target, self.ramp_offset, self.min_duty, self.max_duty, ramp_factor, duty
        );
        duty
    }

    fn commit<D: PwmDriver + ?Sized>(&mut self, duty: f32, driver: &mut D) -> f32 {
        let duty = if duty.is_nan() { DUTY_MIN } else { duty.clamp(DUTY_MIN, DUTY_MAX) };
        if duty != self.current_duty {
            log_trace!("{} setting PWM={}", self.log_scope, duty);
            self.current_duty = duty;
            driver.write_duty(self.index, duty);
        }
        self.current_duty
    }

    /// Channel index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Hardware kind
    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Active mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Upper duty bound
    pub fn max_duty(&self) -> f32 {
        self.max_duty
    }

    /// Last committed duty
    pub fn duty(&self) -> f32 {
        self.current_duty
    }

    /// Whether the output is driving its load
    pub fn active(&self) -> bool {
        self.current_duty > 0.0
    }

    /// Last valid probe reading
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Whether the saved state is re-applied on boot
    pub fn apply_at_startup(&self) -> bool {
        self.apply_at_startup
    }

    /// Target temperature, in target mode only
    pub fn target_temperature(&self) -> Option<f32> {
        (self.mode == Mode::TargetTemperature).then_some(self.target_temperature)
    }

    /// Dewpoint offset, in dewpoint mode only
    pub fn dewpoint_offset(&self) -> Option<f32> {
        (self.mode == Mode::Dewpoint).then_some(self.dewpoint_offset)
    }

    /// Ramp offset, in temperature modes only
    pub fn ramp_offset(&self) -> Option<f32> {
        self.mode.is_temperature_driven().then_some(self.ramp_offset)
    }

    /// Lower duty bound, in temperature modes only
    pub fn min_duty(&self) -> Option<f32> {
        self.mode.is_temperature_driven().then_some(self.min_duty)
    }

    /// Prefix used in this output's log lines
    pub fn log_scope(&self) -> &str {
        &self.log_scope
    }

    /// Reportable state
    pub fn snapshot(&self) -> OutputSnapshot {
        OutputSnapshot {
            index: self.index,
            mode: self.mode,
            kind: self.kind,
            max_duty: self.max_duty,
            duty: self.current_duty,
            active: self.active(),
            has_temperature: self.temperature.is_some(),
            apply_at_startup: self.apply_at_startup,
            min_duty: self.min_duty(),
            ramp_offset: self.ramp_offset(),
            temperature: self.temperature,
            target_temperature: self.target_temperature(),
            dewpoint_offset: self.dewpoint_offset(),
        }
    }
}

/// Reported state of one output, also the persisted config element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSnapshot {
    /// Channel index
    pub index: u8,
    /// Active mode
    pub mode: Mode,
    /// Hardware kind
    #[serde(rename = "type")]
    pub kind: OutputKind,
    /// Upper duty bound
    pub max_duty: f32,
    /// Last committed duty
    pub duty: f32,
    /// Duty above 0
    pub active: bool,
    /// A valid reading is stored
    pub has_temperature: bool,
    /// Re-applied on boot
    pub apply_at_startup: bool,
    /// Lower duty bound (temperature modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duty: Option<f32>,
    /// Ramp width in °C (temperature modes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_offset: Option<f32>,
    /// Last valid reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Target temperature (target mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f32>,
    /// Offset above dewpoint (dewpoint mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dewpoint_offset: Option<f32>,
}

fn valid_reading(reading: Option<f32>) -> Option<f32> {
    reading.filter(|t| t.is_finite() && *t >= TEMPERATURE_VALIDITY_FLOOR_C)
}

fn valid_dewpoint(dewpoint: Option<f32>) -> Option<f32> {
    dewpoint.filter(|d| d.is_finite())
}
