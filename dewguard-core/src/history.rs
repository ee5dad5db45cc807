//! Telemetry history ring buffer
//!
//! Every history tick the device captures a [`HistoryEntry`] of ambient,
//! power and per-output readings. Entries are quantized to hundredths so the
//! whole buffer fits in a few KB, and evicted oldest-first once
//! `max_size` is reached.
//!
//! While an export is streaming the buffer is locked and pushes are dropped,
//! so the serializer's cursor always points at the entry it expects.

use alloc::collections::VecDeque;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::constants::{DEFAULT_HISTORY_SIZE, HISTORY_ENTRY_JSON_SIZE};
use crate::output::Output;
use crate::quantized::{duty_percent, Hundredths};
use crate::registry::OutputRegistry;
use crate::sensors::{dewpoint, AmbientReading, PowerStatus};

/// Ambient reading at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientSample {
    /// Air temperature (°C)
    pub temperature: Hundredths,
    /// Relative humidity (%)
    pub humidity: Hundredths,
}

impl AmbientSample {
    /// Sensor present but no reading
    pub const ABSENT: Self = Self {
        temperature: Hundredths::ABSENT,
        humidity: Hundredths::ABSENT,
    };

    /// Quantize `reading`, or store the sentinel when there is none
    pub fn from_reading(reading: Option<&AmbientReading>) -> Self {
        reading.map_or(Self::ABSENT, |r| Self {
            temperature: Hundredths::from_f32(r.temperature),
            humidity: Hundredths::from_f32(r.humidity),
        })
    }

    /// Dewpoint of the stored values, if both are valid
    pub fn dewpoint(&self) -> Option<f32> {
        let temperature = self.temperature.to_option()?;
        let humidity = self.humidity.to_option()?;
        Some(dewpoint(temperature, humidity))
    }
}

/// Power monitor reading at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSample {
    /// Bus voltage (V)
    pub bus_voltage: Hundredths,
    /// Current (A)
    pub current: Hundredths,
}

impl PowerSample {
    /// Quantize `status`; no monitor reads as 0V, 0A
    pub fn from_status(status: Option<&PowerStatus>) -> Self {
        let status = status.copied().unwrap_or_default();
        Self {
            bus_voltage: Hundredths::from_f32(status.bus_voltage),
            current: Hundredths::from_f32(status.current),
        }
    }

    /// Power (W) from the stored values
    pub fn power(&self) -> f32 {
        self.bus_voltage.to_f32() * self.current.to_f32()
    }
}

/// One output at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSample {
    /// Probe reading, sentinel when absent
    pub temperature: Hundredths,
    /// Duty, 0..=100
    pub duty_percent: u8,
}

impl OutputSample {
    /// Capture `output`
    pub fn from_output(output: &Output) -> Self {
        Self {
            temperature: Hundredths::from_option(output.temperature()),
            duty_percent: duty_percent(output.duty()),
        }
    }
}

impl Serialize for OutputSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OutputSample", 2)?;
        state.serialize_field("duty", &self.duty_percent)?;
        state.serialize_field("temperature", &self.temperature.to_option())?;
        state.end()
    }
}

/// Telemetry snapshot of an `N`-channel device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry<const N: usize> {
    /// Uptime at capture
    pub seconds_from_boot: u32,
    /// `None` when the device has no ambient sensor at all
    pub ambient: Option<AmbientSample>,
    /// Power monitor
    pub power: PowerSample,
    /// One sample per channel
    pub outputs: [OutputSample; N],
}

impl<const N: usize> HistoryEntry<N> {
    /// Capture the registry together with the latest ambient and power samples
    pub fn capture(
        seconds_from_boot: u32,
        ambient: Option<AmbientSample>,
        power: PowerSample,
        registry: &OutputRegistry<N>,
    ) -> Self {
        let outputs = registry.outputs();
        Self {
            seconds_from_boot,
            ambient,
            power,
            outputs: core::array::from_fn(|i| OutputSample::from_output(&outputs[i])),
        }
    }
}

impl<const N: usize> Serialize for HistoryEntry<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.ambient.is_some() { 8 } else { 5 };
        let mut state = serializer.serialize_struct("HistoryEntry", fields)?;
        state.serialize_field("uptime", &self.seconds_from_boot)?;
        if let Some(ambient) = &self.ambient {
            state.serialize_field("ambientTemperature", &ambient.temperature.to_option())?;
            state.serialize_field("ambientHumidity", &ambient.humidity.to_option())?;
            state.serialize_field("ambientDewpoint", &ambient.dewpoint())?;
        }
        state.serialize_field("outputs", &self.outputs[..])?;
        state.serialize_field("busVoltage", &self.power.bus_voltage.to_f32())?;
        state.serialize_field("power", &self.power.power())?;
        state.serialize_field("current", &self.power.current.to_f32())?;
        state.end()
    }
}

/// Bounded FIFO of history entries
#[derive(Debug, Clone)]
pub struct History<const N: usize> {
    entries: VecDeque<HistoryEntry<N>>,
    max_size: usize,
    locked: bool,
}

impl<const N: usize> Default for History<N> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl<const N: usize> History<N> {
    /// Empty history holding at most `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
            locked: false,
        }
    }

    /// Append `entry`, evicting the oldest beyond `max_size`.
    ///
    /// Returns `false` (and drops the entry) while locked.
    pub fn push(&mut self, entry: HistoryEntry<N>) -> bool {
        if self.locked {
            log_warn!("[History] locked for export, dropping entry at uptime {}", entry.seconds_from_boot);
            return false;
        }
        self.entries.push_back(entry);
        self.evict();
        true
    }

    /// Change the capacity, evicting the oldest entries if it shrinks.
    ///
    /// While locked, eviction waits for [`unlock`](Self::unlock) so the
    /// export cursor keeps pointing at the entries it announced.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        if !self.locked {
            self.evict();
        }
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
    }

    /// Capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry<N>> + '_ {
        self.entries.iter()
    }

    /// Entry at `index`, 0 is the oldest
    pub fn get(&self, index: usize) -> Option<&HistoryEntry<N>> {
        self.entries.get(index)
    }

    /// Stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject pushes until [`unlock`](Self::unlock)
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Accept pushes again, applying any capacity change made while locked
    pub fn unlock(&mut self) {
        self.locked = false;
        self.evict();
    }

    /// Whether pushes are rejected
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Rough upper bound of the exported document size (bytes)
    pub fn json_size_hint(&self) -> usize {
        self.entries.len() * HISTORY_ENTRY_JSON_SIZE
    }
}
