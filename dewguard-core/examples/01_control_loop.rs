//! Control Loop Simulation
//!
//! Runs a two-channel device against a crude thermal model: a dew heater
//! warms its probe in proportion to its duty and loses heat to the ambient
//! air. The heater is held 3°C above the dewpoint with a 2°C ramp.
//!
//! ## What You'll Learn
//!
//! - Injecting sensors and a PWM driver into a `Device`
//! - Applying output commands decoded from JSON
//! - Driving the control and history ticks from a scheduler
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_control_loop
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use dewguard_core::sensors::sim::{FixedPower, SimulatedAmbient};
use dewguard_core::sensors::{PwmDriver, TemperatureSource};
use dewguard_core::{Device, DeviceConfig, OutputCommandPayload, OutputKind, SensorBank};

const AMBIENT_TEMPERATURE: f32 = 6.0;
const AMBIENT_HUMIDITY: f32 = 88.0;

/// Heater strip temperature, shared by the probe and the PWM driver
#[derive(Clone)]
struct ThermalModel(Rc<RefCell<(f32, f32)>>);

impl ThermalModel {
    fn new(temperature: f32) -> Self {
        Self(Rc::new(RefCell::new((temperature, 0.0))))
    }

    /// Advance one control interval
    fn step(&self) {
        let mut state = self.0.borrow_mut();
        let (temperature, duty) = *state;
        let heating = duty * 1.5;
        let cooling = (temperature - AMBIENT_TEMPERATURE) * 0.2;
        state.0 = temperature + heating - cooling;
    }
}

impl TemperatureSource for ThermalModel {
    fn read(&mut self) -> Option<f32> {
        Some(self.0.borrow().0)
    }
}

impl PwmDriver for ThermalModel {
    fn write_duty(&mut self, channel: u8, duty: f32) {
        if channel == 0 {
            self.0.borrow_mut().1 = duty;
        }
    }
}

fn main() {
    println!("DewGuard Control Loop Example");
    println!("=============================\n");

    let heater = ThermalModel::new(AMBIENT_TEMPERATURE);
    let ambient = SimulatedAmbient::new(AMBIENT_TEMPERATURE, AMBIENT_HUMIDITY);
    let dewpoint = dewguard_core::sensors::dewpoint(AMBIENT_TEMPERATURE, AMBIENT_HUMIDITY);
    println!("Ambient: {:.1}°C at {:.0}% RH, dewpoint {:.2}°C\n", AMBIENT_TEMPERATURE, AMBIENT_HUMIDITY, dewpoint);

    let sensors = SensorBank::new()
        .with_temperature(0, heater.clone())
        .with_ambient(ambient)
        .with_power(FixedPower::new(12.1, 0.8));
    let mut device = Device::new(
        DeviceConfig::default(),
        [OutputKind::Heater, OutputKind::PlainOutput],
        sensors,
        heater.clone(),
    );

    let commands = [
        r#"{"index":0,"mode":"dewpoint","max_duty":1,"min_duty":0.1,"dewpoint_offset":3,"ramp_offset":2}"#,
        r#"{"index":1,"mode":"fixed","max_duty":0.25}"#,
    ];
    for json in commands {
        let command: OutputCommandPayload = serde_json::from_str(json).expect("valid command");
        match device.apply_command(&command) {
            Ok(outcome) => println!("Applied: {}", serde_json::to_string(&outcome).expect("serializable")),
            Err(e) => println!("Rejected: {}", e),
        }
    }
    println!();

    let config = device.config().clone();
    println!("{:>6}  {:>8}  {:>6}", "uptime", "heater", "duty");
    for tick in 1..=24u32 {
        heater.step();
        let duties = device.control_tick();
        let uptime = tick * config.control_interval_secs;
        if uptime % config.history_interval_secs == 0 {
            device.history_tick(uptime);
        }

        let temperature = device.registry().get(0).and_then(|o| o.temperature()).unwrap_or(f32::NAN);
        println!("{:>5}s  {:>7.2}°  {:>5.0}%", uptime, temperature, duties[0] * 100.0);
    }

    println!("\nHistory holds {} entries", device.history().len());
}
