//! Sensor and actuator seams
//!
//! The core never talks to hardware directly. Each concrete part (NTC
//! thermistor on an ADC pin, SHT3x/SHT4x on I²C, INA219 power monitor,
//! LEDC PWM) is wrapped in one of these traits by the firmware and injected
//! into the [`Device`](crate::device::Device) at startup. Hosts and tests use
//! the implementations in [`sim`].

pub mod sim;

use serde::{Deserialize, Serialize};

use crate::constants::sensors::{MAGNUS_A, MAGNUS_B_C};

/// Heater temperature probe for one channel
pub trait TemperatureSource {
    /// Current temperature in °C, or `None` if the probe can't be read.
    ///
    /// Implementations may return implausible values from a disconnected
    /// probe; the controller discards anything below its validity floor.
    fn read(&mut self) -> Option<f32>;
}

/// Ambient temperature/humidity sensor
pub trait AmbientSource {
    /// Current ambient reading, or `None` if the sensor didn't answer.
    fn read(&mut self) -> Option<AmbientReading>;
}

/// Bus power monitor
pub trait PowerSource {
    /// Current power status, or `None` if the monitor isn't initialised.
    fn read(&mut self) -> Option<PowerStatus>;
}

/// PWM peripheral driving the outputs
pub trait PwmDriver {
    /// Set `channel` to `duty` (0.0..=1.0). Called only when the duty changes.
    fn write_duty(&mut self, channel: u8, duty: f32);
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for &mut T {
    fn read(&mut self) -> Option<f32> {
        (**self).read()
    }
}

impl<T: PwmDriver + ?Sized> PwmDriver for &mut T {
    fn write_duty(&mut self, channel: u8, duty: f32) {
        (**self).write_duty(channel, duty)
    }
}

/// Ambient air reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientReading {
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
}

impl AmbientReading {
    /// Create a reading
    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self { temperature, humidity }
    }

    /// Dewpoint of this reading (°C)
    pub fn dewpoint(&self) -> f32 {
        dewpoint(self.temperature, self.humidity)
    }
}

/// Dewpoint from air temperature (°C) and relative humidity (%).
///
/// Magnus formula:
/// ```text
/// γ  = ln(RH/100) + a·T/(b + T)
/// Td = b·γ / (a - γ)
/// ```
/// Returns NaN for humidity ≤ 0.
pub fn dewpoint(temperature: f32, humidity: f32) -> f32 {
    let gamma = libm::logf(humidity / 100.0) + (MAGNUS_A * temperature) / (MAGNUS_B_C + temperature);
    (MAGNUS_B_C * gamma) / (MAGNUS_A - gamma)
}

/// Power monitor status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerStatus {
    /// Bus voltage (V)
    pub bus_voltage: f32,
    /// Current draw (A)
    pub current: f32,
    /// Power (W)
    pub power: f32,
}

impl PowerStatus {
    /// Status from voltage and current; power is the product.
    pub fn new(bus_voltage: f32, current: f32) -> Self {
        Self {
            bus_voltage,
            current,
            power: bus_voltage * current,
        }
    }
}
