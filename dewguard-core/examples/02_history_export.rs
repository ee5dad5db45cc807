//! Chunked History Export
//!
//! Fills the history ring with an hour of samples, then streams it out the
//! way an HTTP chunked response would: the transport hands over a buffer of
//! whatever size it has free, and the exporter fills as much as fits.
//!
//! ## What You'll Learn
//!
//! - Starting and draining an export session
//! - How the history lock holds samples back while a session runs
//! - Reassembling the document from uneven chunks
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_history_export
//! ```

use dewguard_core::sensors::sim::{FixedPower, FixedTemperature, RecordingDriver, SimulatedAmbient};
use dewguard_core::{Device, DeviceConfig, OutputKind, SensorBank};

fn main() {
    println!("DewGuard History Export Example");
    println!("===============================\n");

    let config = DeviceConfig { history_max_size: 60, ..DeviceConfig::default() };
    let sensors = SensorBank::new()
        .with_temperature(0, FixedTemperature::new(4.5))
        .with_temperature(1, FixedTemperature::disconnected())
        .with_ambient(SimulatedAmbient::new(7.0, 91.0))
        .with_power(FixedPower::new(12.4, 2.1));
    let mut device = Device::new(config, [OutputKind::Heater, OutputKind::Heater], sensors, RecordingDriver::new());

    let restored = device.restore(
        r#"[{"mode":"dewpoint","max_duty":1,"min_duty":0.2,"dewpoint_offset":2,"ramp_offset":3,"apply_at_startup":true}]"#,
    );
    println!("Restored outputs: {:?}", restored);

    // The ring only keeps the newest 60 entries
    for minute in 1..=90u32 {
        device.control_tick();
        device.history_tick(minute * 60);
    }
    println!(
        "History: {} entries, ~{} bytes of JSON\n",
        device.history().len(),
        device.history().json_size_hint()
    );

    // Section 1: uneven chunks
    println!("1. Streaming with uneven buffers");
    println!("--------------------------------");
    device.begin_export(1_718_000_000);
    let sizes = [512usize, 17, 1024, 3, 256];
    let mut document = Vec::new();
    let mut chunks = 0;
    for size in sizes.iter().cycle() {
        let mut buffer = vec![0u8; *size];
        let n = device.pull_export(&mut buffer, document.len());
        if n == 0 {
            break;
        }
        if chunks < 5 {
            println!("  chunk {:>2}: {:>4}/{:<4} bytes  locked={}", chunks, n, size, device.history().is_locked());
        }
        document.extend_from_slice(&buffer[..n]);
        chunks += 1;
    }
    println!("  ... {} chunks, {} bytes total\n", chunks, document.len());

    match serde_json::from_slice::<serde_json::Value>(&document) {
        Ok(doc) => {
            let entries = doc["entries"].as_array().map(Vec::len).unwrap_or(0);
            println!("  Parsed document: now={} with {} entries", doc["now"], entries);
            if let Some(last) = doc["entries"].as_array().and_then(|e| e.last()) {
                println!("  Last entry: {}", last);
            }
        }
        Err(e) => println!("  Document did not parse: {}", e),
    }

    // Section 2: an abandoned session
    println!("\n2. Abandoning a session");
    println!("-----------------------");
    device.begin_export(1_718_000_060);
    let mut buffer = [0u8; 64];
    let n = device.pull_export(&mut buffer, 0);
    println!("  First chunk: {}", String::from_utf8_lossy(&buffer[..n]));
    println!("  Sample accepted while locked: {}", device.history_tick(91 * 60));

    device.abort_export();
    println!("  Sample accepted after abort:  {}", device.history_tick(92 * 60));
}
