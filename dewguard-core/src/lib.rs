//! Control and telemetry core for DewGuard
//!
//! Regulates the PWM outputs of a dew heater controller against temperature
//! targets and keeps a bounded history of ambient, power and output readings
//! that can be streamed out in chunks of any size.
//!
//! Key constraints:
//! - Runs on an ESP32-S2/C3 with a few tens of KB of free heap
//! - No hardware access: sensors and the PWM peripheral are injected
//! - History export never materialises the full document
//!
//! ```no_run
//! use dewguard_core::sensors::sim::{FixedTemperature, RecordingDriver, SimulatedAmbient};
//! use dewguard_core::{Device, DeviceConfig, OutputCommandPayload, OutputKind, SensorBank};
//!
//! let sensors = SensorBank::new()
//!     .with_temperature(0, FixedTemperature::new(4.0))
//!     .with_ambient(SimulatedAmbient::new(8.0, 85.0));
//! let mut device = Device::new(DeviceConfig::default(), [OutputKind::Heater], sensors, RecordingDriver::new());
//!
//! let command: OutputCommandPayload =
//!     serde_json::from_str(r#"{"index":0,"mode":"dewpoint","max_duty":1,"dewpoint_offset":3}"#).unwrap();
//! device.apply_command(&command).unwrap();
//!
//! // From the scheduler
//! device.control_tick();
//! device.history_tick(60);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod command;
pub mod config;
pub mod constants;
pub mod device;
pub mod errors;
pub mod history;
pub mod metrics;
pub mod output;
pub mod overflow;
pub mod quantized;
pub mod registry;
pub mod sensors;
pub mod serializer;

// Public API
pub use command::{ModeRequest, OutputCommand, OutputCommandPayload};
pub use config::{DeviceConfig, OutputConfig};
pub use device::{CommandOutcome, Device, SensorBank};
pub use errors::{ConfigError, ControlError, ControlResult, Error, ValidationError, ValidationResult};
pub use history::{History, HistoryEntry};
pub use output::{Mode, Output, OutputKind, OutputSnapshot};
pub use overflow::OverflowPrint;
pub use quantized::Hundredths;
pub use registry::OutputRegistry;
pub use serializer::HistoryStream;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
