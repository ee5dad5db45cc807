//! Common fixtures for integration tests
//!
//! - A four-channel rig (three heaters, one plain output) with probes whose
//!   readings can be changed while the device owns them
//! - History builders and export drain helpers

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use dewguard_core::history::{AmbientSample, OutputSample, PowerSample};
use dewguard_core::sensors::sim::{FixedPower, RecordingDriver};
use dewguard_core::sensors::{AmbientReading, AmbientSource, TemperatureSource};
use dewguard_core::{
    Device, DeviceConfig, History, HistoryEntry, HistoryStream, Hundredths, OutputCommandPayload, OutputKind,
    SensorBank,
};

/// Channel layout of the test rig
pub const RIG_KINDS: [OutputKind; 4] = [
    OutputKind::Heater,
    OutputKind::Heater,
    OutputKind::Heater,
    OutputKind::PlainOutput,
];

/// Probe whose reading is set from the test
#[derive(Clone, Default)]
pub struct SharedProbe(Rc<Cell<Option<f32>>>);

impl SharedProbe {
    pub fn new(value: Option<f32>) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    pub fn set(&self, value: Option<f32>) {
        self.0.set(value);
    }
}

impl TemperatureSource for SharedProbe {
    fn read(&mut self) -> Option<f32> {
        self.0.get()
    }
}

/// Ambient sensor whose reading is set from the test
#[derive(Clone, Default)]
pub struct SharedAmbient(Rc<Cell<Option<AmbientReading>>>);

impl SharedAmbient {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self(Rc::new(Cell::new(Some(AmbientReading::new(temperature, humidity)))))
    }

    pub fn set(&self, reading: Option<AmbientReading>) {
        self.0.set(reading);
    }
}

impl AmbientSource for SharedAmbient {
    fn read(&mut self) -> Option<AmbientReading> {
        self.0.get()
    }
}

/// Four-channel device plus handles to its sensors
pub struct Rig {
    pub device: Device<RecordingDriver, 4>,
    pub probes: [SharedProbe; 3],
    pub ambient: SharedAmbient,
}

impl Rig {
    /// Heater probes at `temperatures`, ambient 10°C / 80%
    pub fn new(temperatures: [f32; 3]) -> Self {
        Self::with_config(DeviceConfig::default(), temperatures)
    }

    pub fn with_config(config: DeviceConfig, temperatures: [f32; 3]) -> Self {
        let probes = temperatures.map(|t| SharedProbe::new(Some(t)));
        let ambient = SharedAmbient::new(10.0, 80.0);

        let sensors = SensorBank::new()
            .with_temperature(0, probes[0].clone())
            .with_temperature(1, probes[1].clone())
            .with_temperature(2, probes[2].clone())
            .with_ambient(ambient.clone())
            .with_power(FixedPower::new(12.2, 1.5));
        let device = Device::new(config, RIG_KINDS, sensors, RecordingDriver::new());

        Self { device, probes, ambient }
    }
}

/// Decode a command from JSON
pub fn payload(json: &str) -> OutputCommandPayload {
    serde_json::from_str(json).expect("test payload")
}

/// Entry with recognisable values derived from `t`
pub fn entry(t: u32, with_ambient: bool) -> HistoryEntry<2> {
    HistoryEntry {
        seconds_from_boot: t,
        ambient: with_ambient.then(|| AmbientSample {
            temperature: Hundredths::from_f32(5.0 + t as f32 / 10.0),
            humidity: Hundredths::from_f32(70.0),
        }),
        power: PowerSample {
            bus_voltage: Hundredths::from_f32(12.0),
            current: Hundredths::from_f32(t as f32 / 100.0),
        },
        outputs: [
            OutputSample { temperature: Hundredths::from_f32(t as f32), duty_percent: (t % 101) as u8 },
            OutputSample { temperature: Hundredths::ABSENT, duty_percent: 0 },
        ],
    }
}

/// History holding `count` entries
pub fn history(count: u32, with_ambient: bool) -> History<2> {
    let mut history = History::new(count as usize + 1);
    for t in 0..count {
        history.push(entry(t, with_ambient));
    }
    history
}

/// Run a whole export, cycling through `sizes` for the buffers
pub fn drain<const N: usize>(stream: &mut HistoryStream, history: &mut History<N>, sizes: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    for size in sizes.iter().cycle() {
        let mut buffer = vec![0u8; *size];
        let n = stream.pull(history, &mut buffer, out.len());
        if n == 0 && *size > 0 {
            break;
        }
        out.extend_from_slice(&buffer[..n]);
    }
    out
}

/// Whole document from one large buffer
pub fn reference_document<const N: usize>(history: &mut History<N>, now: u64) -> Vec<u8> {
    drain(&mut HistoryStream::new(now), history, &[1 << 20])
}
