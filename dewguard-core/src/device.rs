//! Device context
//!
//! [`Device`] owns everything the firmware's scheduler and HTTP handlers
//! touch: the output registry, the history, the injected sensors, the PWM
//! driver and the export session in flight. Handlers borrow it for the
//! duration of one call; nothing here is global.
//!
//! ```text
//! every 5s     control_tick()          sample sensors, regulate outputs
//! every 60s    history_tick(uptime)    snapshot into the history
//! POST /pwm    apply_command(payload)  validate, apply, report
//! GET /history begin_export(now), then pull_export(buf, offset) until 0
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;

use crate::command::OutputCommandPayload;
use crate::config::{DeviceConfig, OutputConfig};
use crate::errors::{ConfigError, Error};
use crate::history::{AmbientSample, History, HistoryEntry, PowerSample};
use crate::metrics::{self, Labels};
use crate::output::{OutputKind, OutputSnapshot};
use crate::registry::OutputRegistry;
use crate::sensors::{AmbientReading, AmbientSource, PowerSource, PowerStatus, PwmDriver, TemperatureSource};
use crate::serializer::HistoryStream;

/// Sensors injected into a [`Device`]
pub struct SensorBank<const N: usize> {
    temperatures: [Option<Box<dyn TemperatureSource>>; N],
    ambient: Option<Box<dyn AmbientSource>>,
    power: Option<Box<dyn PowerSource>>,
}

impl<const N: usize> Default for SensorBank<N> {
    fn default() -> Self {
        Self {
            temperatures: core::array::from_fn(|_| None),
            ambient: None,
            power: None,
        }
    }
}

impl<const N: usize> SensorBank<N> {
    /// No sensors at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a probe to channel `index`. Out-of-range indices are ignored.
    pub fn with_temperature(mut self, index: usize, source: impl TemperatureSource + 'static) -> Self {
        if let Some(slot) = self.temperatures.get_mut(index) {
            *slot = Some(Box::new(source));
        } else {
            log_warn!("[Device] no output {} for temperature sensor", index);
        }
        self
    }

    /// Attach the ambient sensor
    pub fn with_ambient(mut self, source: impl AmbientSource + 'static) -> Self {
        self.ambient = Some(Box::new(source));
        self
    }

    /// Attach the power monitor
    pub fn with_power(mut self, source: impl PowerSource + 'static) -> Self {
        self.power = Some(Box::new(source));
        self
    }

    /// Whether an ambient sensor is fitted
    pub fn has_ambient(&self) -> bool {
        self.ambient.is_some()
    }

    fn read_temperature(&mut self, index: usize) -> Option<f32> {
        self.temperatures.get_mut(index)?.as_mut()?.read()
    }

    fn read_ambient(&mut self) -> Option<AmbientReading> {
        self.ambient.as_mut()?.read()
    }

    fn read_power(&mut self) -> Option<PowerStatus> {
        self.power.as_mut()?.read()
    }
}

/// Result of an applied command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    /// Registry state after the command
    #[serde(rename = "pwmOutputs")]
    pub outputs: Vec<OutputSnapshot>,
    /// The saved output configuration should be rewritten
    #[serde(skip)]
    pub persist: bool,
}

/// Control and telemetry state of one `N`-channel device
pub struct Device<D: PwmDriver, const N: usize> {
    config: DeviceConfig,
    registry: OutputRegistry<N>,
    history: History<N>,
    sensors: SensorBank<N>,
    driver: D,
    ambient: Option<AmbientReading>,
    power: Option<PowerStatus>,
    export: Option<HistoryStream>,
}

impl<D: PwmDriver, const N: usize> Device<D, N> {
    /// Bring up a device: every output `Off` at duty 0, sensors sampled once
    pub fn new(config: DeviceConfig, kinds: [OutputKind; N], sensors: SensorBank<N>, mut driver: D) -> Self {
        let mut registry = OutputRegistry::new(kinds);
        registry.reset(&mut driver);

        let mut device = Self {
            history: History::new(config.history_max_size),
            config,
            registry,
            sensors,
            driver,
            ambient: None,
            power: None,
            export: None,
        };
        device.sample_environment();
        let readings = device.read_probes();
        device.registry.observe_all(&readings);
        log_info!("[Device] initialised with {} outputs", N);
        device
    }

    /// Re-apply the saved output states flagged `apply_at_startup`.
    ///
    /// Returns how many outputs were restored. An unreadable document is an
    /// error; a bad element is logged and leaves its output `Off`.
    pub fn restore(&mut self, config_json: &str) -> Result<usize, ConfigError> {
        let config = OutputConfig::parse(config_json).map_err(|err| {
            log_error!("[PWMOutputs] Error parsing pwmOutputs configuration file: {}", err);
            err
        })?;
        Ok(self.restore_config(&config))
    }

    /// Load and re-apply the saved output states from `path`
    #[cfg(feature = "std")]
    pub fn restore_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<usize, ConfigError> {
        match OutputConfig::load_file(path)? {
            Some(config) => Ok(self.restore_config(&config)),
            None => Ok(0),
        }
    }

    /// Re-apply a parsed output configuration. See [`restore`](Self::restore).
    pub fn restore_config(&mut self, config: &OutputConfig) -> usize {
        let mut restored = 0;
        for index in 0..N {
            match self.restore_output(config, index) {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(_err) => {
                    log_error!("PWMOutput[{}] - Error setting pwm output state from configuration: {}", index, _err);
                }
            }
        }
        restored
    }

    fn restore_output(&mut self, config: &OutputConfig, index: usize) -> Result<bool, Error> {
        let mut payload = config.element(index)?;
        let apply_at_startup = payload.apply_at_startup.unwrap_or(false);
        log_info!("PWMOutput[{}] - configuration loaded, applyAtStartup={}", index, apply_at_startup);
        if !apply_at_startup {
            return Ok(false);
        }

        // Elements are positional
        payload.index = Some(index as i64);
        let command = payload.validate(N)?;
        let reading = self.sensors.read_temperature(index);
        self.registry.observe_temperature(index, reading)?;
        let dewpoint = self.ambient_dewpoint();
        self.registry.apply_command(&command, dewpoint, &mut self.driver)?;
        Ok(true)
    }

    /// Sample every sensor and regulate every output
    pub fn control_tick(&mut self) -> [f32; N] {
        self.sample_environment();
        let readings = self.read_probes();
        let dewpoint = self.ambient_dewpoint();
        self.registry.regulate_all(&readings, dewpoint, &mut self.driver)
    }

    /// Snapshot the device into the history.
    ///
    /// Uses the readings of the last control tick. Returns `false` when the
    /// history is locked by an export.
    pub fn history_tick(&mut self, seconds_from_boot: u32) -> bool {
        let ambient = self
            .sensors
            .has_ambient()
            .then(|| AmbientSample::from_reading(self.ambient.as_ref()));
        let power = PowerSample::from_status(self.power.as_ref());
        let entry = HistoryEntry::capture(seconds_from_boot, ambient, power, &self.registry);
        self.history.push(entry)
    }

    /// Validate and apply an output command.
    ///
    /// The target channel's probe and the ambient sensor are sampled first
    /// so a temperature mode can be entered right away.
    pub fn apply_command(&mut self, payload: &OutputCommandPayload) -> Result<CommandOutcome, Error> {
        let command = payload.validate(N).map_err(|err| {
            log_warn!("[Device] rejected output command: {}", err);
            err
        })?;

        let index = usize::from(command.index);
        self.ambient = self.sensors.read_ambient();
        let reading = self.sensors.read_temperature(index);
        self.registry.observe_temperature(index, reading)?;
        let dewpoint = self.ambient_dewpoint();
        self.registry.apply_command(&command, dewpoint, &mut self.driver)?;

        Ok(CommandOutcome {
            outputs: self.registry.snapshot(),
            persist: command.apply_at_startup,
        })
    }

    /// Start a history export stamped `now`, replacing any unfinished one
    pub fn begin_export(&mut self, now: u64) {
        self.abort_export();
        self.export = Some(HistoryStream::new(now));
    }

    /// Fill `buffer` with the next part of the export. See [`HistoryStream::pull`].
    ///
    /// Returns 0 when no export is running; the session ends by itself once
    /// its last byte has been handed out.
    pub fn pull_export(&mut self, buffer: &mut [u8], index: usize) -> usize {
        let Some(stream) = self.export.as_mut() else {
            return 0;
        };
        let written = stream.pull(&mut self.history, buffer, index);
        if stream.is_complete() {
            self.export = None;
        }
        written
    }

    /// Drop the running export, unlocking the history
    pub fn abort_export(&mut self) {
        if let Some(stream) = self.export.take() {
            stream.abort(&mut self.history);
        }
    }

    /// Whether an export session is running
    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    /// Reportable state of every output
    pub fn snapshot(&self) -> Vec<OutputSnapshot> {
        self.registry.snapshot()
    }

    /// Output configuration to store, as a JSON array
    pub fn save_config(&self) -> Result<String, ConfigError> {
        log_info!("[PWMOutputs] Saving pwmOutputs configuration");
        OutputConfig::from_snapshot(&self.registry.snapshot())?.to_json()
    }

    /// Prometheus exposition of the current state
    pub fn metrics(&self, fixed: Labels) -> String {
        metrics::render(fixed, self.ambient.as_ref(), self.power.as_ref(), self.registry.outputs())
    }

    /// Output registry
    pub fn registry(&self) -> &OutputRegistry<N> {
        &self.registry
    }

    /// Telemetry history
    pub fn history(&self) -> &History<N> {
        &self.history
    }

    /// Tunables
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Change the history capacity. During an export the eviction is
    /// deferred until the session releases the history.
    pub fn set_history_size(&mut self, max_size: usize) {
        self.config.history_max_size = max_size;
        self.history.set_max_size(max_size);
    }

    /// PWM driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Last ambient reading
    pub fn ambient(&self) -> Option<&AmbientReading> {
        self.ambient.as_ref()
    }

    /// Last power reading
    pub fn power(&self) -> Option<&PowerStatus> {
        self.power.as_ref()
    }

    fn sample_environment(&mut self) {
        self.ambient = self.sensors.read_ambient();
        self.power = self.sensors.read_power();
    }

    fn read_probes(&mut self) -> [Option<f32>; N] {
        core::array::from_fn(|i| self.sensors.read_temperature(i))
    }

    fn ambient_dewpoint(&self) -> Option<f32> {
        self.ambient.as_ref().map(AmbientReading::dewpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Mode;
    use crate::sensors::sim::{FixedPower, FixedTemperature, RecordingDriver, SimulatedAmbient};

    fn device() -> Device<RecordingDriver, 2> {
        let sensors = SensorBank::new()
            .with_temperature(0, FixedTemperature::new(2.0))
            .with_ambient(SimulatedAmbient::new(10.0, 60.0))
            .with_power(FixedPower::new(12.0, 2.0));
        Device::new(
            DeviceConfig::default(),
            [OutputKind::Heater, OutputKind::PlainOutput],
            sensors,
            RecordingDriver::new(),
        )
    }

    fn payload(json: &str) -> OutputCommandPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn startup_zeroes_outputs() {
        let device = device();
        assert_eq!(device.driver().writes, [(0, 0.0), (1, 0.0)]);
        assert_eq!(device.power().map(|p| p.power), Some(24.0));
    }

    #[test]
    fn command_response_shape() {
        let mut device = device();
        let outcome = device
            .apply_command(&payload(r#"{"index":1,"mode":"fixed","max_duty":0.5,"apply_at_startup":true}"#))
            .unwrap();
        assert!(outcome.persist);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["pwmOutputs"][1]["mode"], "fixed");
        assert_eq!(json["pwmOutputs"][1]["type"], "output");
        assert_eq!(json["pwmOutputs"][0]["has_temperature"], true);
    }

    #[test]
    fn dewpoint_command_without_ambient_fails() {
        let mut device = Device::new(
            DeviceConfig::default(),
            [OutputKind::Heater],
            SensorBank::new().with_temperature(0, FixedTemperature::new(2.0)),
            RecordingDriver::new(),
        );
        let err = device
            .apply_command(&payload(r#"{"index":0,"mode":"dewpoint","max_duty":1,"dewpoint_offset":2}"#))
            .unwrap_err();
        assert!(matches!(err, Error::Control(crate::errors::ControlError::SensorUnavailable { .. })));
        assert_eq!(device.registry().get(0).map(|o| o.mode()), Some(Mode::Off));
    }

    #[test]
    fn restore_applies_flagged_outputs_only() {
        let mut device = device();
        let restored = device
            .restore(
                r#"[{"mode":"target_temperature","max_duty":1,"target_temperature":10,"apply_at_startup":true},
                    {"mode":"fixed","max_duty":0.3,"apply_at_startup":false}]"#,
            )
            .unwrap();
        assert_eq!(restored, 1);
        assert_eq!(device.registry().get(0).map(|o| o.mode()), Some(Mode::TargetTemperature));
        assert_eq!(device.registry().get(1).map(|o| o.mode()), Some(Mode::Off));
    }

    #[test]
    fn save_then_restore() {
        let mut device = device();
        device
            .apply_command(&payload(r#"{"index":1,"mode":"fixed","max_duty":0.7,"apply_at_startup":true}"#))
            .unwrap();
        let saved = device.save_config().unwrap();

        let mut rebooted = self::device();
        assert_eq!(rebooted.restore(&saved), Ok(1));
        assert_eq!(rebooted.registry().get(1).map(|o| o.duty()), Some(0.7));
    }

    #[test]
    fn history_tick_records_ambient() {
        let mut device = device();
        device.control_tick();
        assert!(device.history_tick(30));

        let entry = device.history().get(0).unwrap();
        assert_eq!(entry.seconds_from_boot, 30);
        assert_eq!(entry.ambient.map(|a| a.humidity.raw()), Some(6000));
        assert_eq!(entry.outputs[0].temperature.raw(), 200);
    }

    #[test]
    fn export_locks_history_until_done() {
        let mut device = device();
        device.history_tick(1);
        device.begin_export(100);

        let mut buffer = [0u8; 4];
        assert_eq!(device.pull_export(&mut buffer, 0), 4);
        assert!(!device.history_tick(2));

        device.abort_export();
        assert!(!device.is_exporting());
        assert!(device.history_tick(3));
        assert_eq!(device.history().len(), 2);
    }
}
