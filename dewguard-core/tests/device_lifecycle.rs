//! Integration tests for startup, persistence and reporting
//!
//! A device is configured, its state saved, and a freshly booted device
//! restores it from the saved document.

#![cfg(test)]

mod common;

use std::io::Write;

use common::{payload, Rig};
use dewguard_core::metrics::Labels;
use dewguard_core::{ConfigError, Mode, OutputConfig};
use serde_json::Value;

fn configured_rig() -> Rig {
    let mut rig = Rig::new([2.0, 2.0, 2.0]);
    let commands = [
        r#"{"index":0,"mode":"dewpoint","max_duty":0.9,"min_duty":0.2,"ramp_offset":4,"dewpoint_offset":5,"apply_at_startup":true}"#,
        r#"{"index":1,"mode":"target_temperature","max_duty":1,"target_temperature":12,"apply_at_startup":true}"#,
        r#"{"index":2,"mode":"fixed","max_duty":0.3}"#,
        r#"{"index":3,"mode":"fixed","max_duty":1,"apply_at_startup":true}"#,
    ];
    for command in commands {
        rig.device.apply_command(&payload(command)).unwrap();
    }
    rig
}

#[test]
fn test_save_and_restore() {
    let rig = configured_rig();
    let saved = rig.device.save_config().unwrap();

    let mut rebooted = Rig::new([2.0, 2.0, 2.0]);
    assert_eq!(rebooted.device.restore(&saved), Ok(3));

    let modes: Vec<Mode> = rebooted.device.registry().iter().map(|o| o.mode()).collect();
    assert_eq!(modes, [Mode::Dewpoint, Mode::TargetTemperature, Mode::Off, Mode::Fixed]);

    let restored = rebooted.device.registry().get(0).unwrap();
    assert_eq!(restored.dewpoint_offset(), Some(5.0));
    assert_eq!(restored.ramp_offset(), Some(4.0));
    assert!(restored.apply_at_startup());
}

#[test]
fn test_restore_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"mode":"fixed","max_duty":0.4,"apply_at_startup":true}},{{"mode":"fixed","max_duty":2,"apply_at_startup":true}}]"#
    )
    .unwrap();

    let mut rig = Rig::new([0.0, 0.0, 0.0]);
    // Second element is out of range, later channels have no element
    assert_eq!(rig.device.restore_file(file.path()), Ok(1));
    assert_eq!(rig.device.registry().get(0).unwrap().duty(), 0.4);
    assert_eq!(rig.device.registry().get(1).unwrap().mode(), Mode::Off);
}

#[test]
fn test_restore_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = Rig::new([0.0, 0.0, 0.0]);
    assert_eq!(rig.device.restore_file(dir.path().join("pwmOutputs.json")), Ok(0));
}

#[test]
fn test_restore_rejects_malformed_documents() {
    let mut rig = Rig::new([0.0, 0.0, 0.0]);
    assert_eq!(rig.device.restore(r#"{"mode":"fixed"}"#), Err(ConfigError::NotAnArray));
    assert!(matches!(rig.device.restore("[{]"), Err(ConfigError::Parse { .. })));
    assert!(rig.device.registry().iter().all(|o| o.mode() == Mode::Off));
}

#[test]
fn test_restore_without_probe_stays_off() {
    let saved = configured_rig().device.save_config().unwrap();

    let mut rebooted = Rig::new([2.0, 2.0, 2.0]);
    rebooted.probes[1].set(None);
    assert_eq!(rebooted.device.restore(&saved), Ok(2));
    assert_eq!(rebooted.device.registry().get(1).unwrap().mode(), Mode::Off);
}

#[test]
fn test_saved_document_is_the_snapshot() {
    let rig = configured_rig();
    let saved: Value = serde_json::from_str(&rig.device.save_config().unwrap()).unwrap();
    let snapshot = serde_json::to_value(rig.device.snapshot()).unwrap();
    assert_eq!(saved, snapshot);

    let config = OutputConfig::parse(&rig.device.save_config().unwrap()).unwrap();
    assert_eq!(config.len(), 4);
    assert_eq!(config.element(2).unwrap().mode.as_deref(), Some("fixed"));
}

#[test]
fn test_command_outcome_flags_persistence() {
    let mut rig = Rig::new([0.0, 0.0, 0.0]);
    let outcome = rig.device.apply_command(&payload(r#"{"index":0,"mode":"fixed","max_duty":0.5}"#)).unwrap();
    assert!(!outcome.persist);

    let outcome = rig
        .device
        .apply_command(&payload(r#"{"index":0,"mode":"fixed","max_duty":0.5,"apply_at_startup":true}"#))
        .unwrap();
    assert!(outcome.persist);

    let body = serde_json::to_value(&outcome).unwrap();
    assert_eq!(body["pwmOutputs"].as_array().map(Vec::len), Some(4));
    assert!(body.get("persist").is_none());
}

#[test]
fn test_prometheus_metrics() {
    let mut rig = configured_rig();
    rig.device.control_tick();
    let text = rig.device.metrics(Labels::new().with("device", "dewguard"));

    assert!(text.contains("# TYPE dewguard_ambient_dewpoint gauge\n"));
    assert!(text.contains("dewguard_ambient_humidity {device=\"dewguard\"} 80.000000\n"));
    assert!(text.contains("dewguard_power_bus_voltage {device=\"dewguard\"} 12.200000\n"));
    assert!(text.contains("dewguard_output_duty {device=\"dewguard\",index=\"3\"} 1.000000\n"));
    assert!(text.contains("dewguard_output_target_temperature {device=\"dewguard\",index=\"1\"} 12.000000\n"));
    assert!(!text.contains("dewguard_output_target_temperature {device=\"dewguard\",index=\"0\"}"));
    assert!(!text.contains("dewguard_output_temperature {device=\"dewguard\",index=\"3\"}"));
}
