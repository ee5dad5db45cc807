//! Simulated sensors for tests and host demos
//!
//! Stand-ins for the real drivers with values set by the caller. The
//! ambient simulator mirrors the firmware's simulator build, where the
//! web UI posts a temperature/humidity pair.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::{AmbientReading, AmbientSource, PowerSource, PowerStatus, PwmDriver, TemperatureSource};
use crate::constants::sensors::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT};

/// Probe that always reads the same value
#[derive(Debug, Clone)]
pub struct FixedTemperature {
    value: Option<f32>,
}

impl FixedTemperature {
    /// Probe reading `value`
    pub fn new(value: f32) -> Self {
        Self { value: Some(value) }
    }

    /// Probe that never answers
    pub fn disconnected() -> Self {
        Self { value: None }
    }

    /// Change the reading
    pub fn set(&mut self, value: Option<f32>) {
        self.value = value;
    }
}

impl TemperatureSource for FixedTemperature {
    fn read(&mut self) -> Option<f32> {
        self.value
    }
}

/// Probe that replays a script, then repeats its last value
#[derive(Debug, Clone, Default)]
pub struct ScriptedTemperature {
    script: VecDeque<Option<f32>>,
    last: Option<f32>,
}

impl ScriptedTemperature {
    /// Replay `readings` in order
    pub fn new(readings: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self {
            script: readings.into_iter().collect(),
            last: None,
        }
    }
}

impl TemperatureSource for ScriptedTemperature {
    fn read(&mut self) -> Option<f32> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Ambient sensor with a settable reading
#[derive(Debug, Clone, Default)]
pub struct SimulatedAmbient {
    reading: Option<AmbientReading>,
}

impl SimulatedAmbient {
    /// Simulator reading `temperature`/`humidity`
    pub fn new(temperature: f32, humidity: f32) -> Self {
        let mut sim = Self::default();
        sim.set(temperature, humidity);
        sim
    }

    /// Set the reading. Humidity is clamped to 0..=100%.
    pub fn set(&mut self, temperature: f32, humidity: f32) {
        let humidity = humidity.clamp(HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT);
        log_info!("Ambient simulator: temperature={}, humidity={}", temperature, humidity);
        self.reading = Some(AmbientReading::new(temperature, humidity));
    }

    /// Make the sensor stop answering
    pub fn disconnect(&mut self) {
        self.reading = None;
    }
}

impl AmbientSource for SimulatedAmbient {
    fn read(&mut self) -> Option<AmbientReading> {
        self.reading
    }
}

/// Power monitor with a fixed status
#[derive(Debug, Clone, Default)]
pub struct FixedPower {
    status: Option<PowerStatus>,
}

impl FixedPower {
    /// Monitor reporting `bus_voltage`/`current`
    pub fn new(bus_voltage: f32, current: f32) -> Self {
        Self {
            status: Some(PowerStatus::new(bus_voltage, current)),
        }
    }
}

impl PowerSource for FixedPower {
    fn read(&mut self) -> Option<PowerStatus> {
        self.status
    }
}

/// PWM driver that records every write
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    /// `(channel, duty)` in write order
    pub writes: Vec<(u8, f32)>,
}

impl RecordingDriver {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes issued to `channel`
    pub fn writes_for(&self, channel: u8) -> impl Iterator<Item = f32> + '_ {
        self.writes
            .iter()
            .filter(move |(c, _)| *c == channel)
            .map(|(_, duty)| *duty)
    }

    /// Last duty written to `channel`
    pub fn last_duty(&self, channel: u8) -> Option<f32> {
        self.writes_for(channel).last()
    }
}

impl PwmDriver for RecordingDriver {
    fn write_duty(&mut self, channel: u8, duty: f32) {
        self.writes.push((channel, duty));
    }
}
