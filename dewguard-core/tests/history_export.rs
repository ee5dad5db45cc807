//! Integration tests for the chunked history export
//!
//! Exercises the serializer against real transport patterns: tiny buffers,
//! buffers that change size every callback, and sessions abandoned half-way.

#![cfg(test)]

mod common;

use common::{drain, history, reference_document, Rig};
use dewguard_core::{DeviceConfig, HistoryStream};
use serde_json::Value;

#[test]
fn test_document_shape() {
    let mut history = history(3, true);
    let document = reference_document(&mut history, 1_718_000_000);
    let doc: Value = serde_json::from_slice(&document).unwrap();

    assert_eq!(doc["now"], 1_718_000_000u64);
    let entries = doc["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);

    let last = &entries[2];
    assert_eq!(last["uptime"], 2);
    assert_eq!(last["ambientTemperature"], 5.2);
    assert_eq!(last["ambientHumidity"], 70.0);
    assert!(last["ambientDewpoint"].is_number());
    assert_eq!(last["outputs"][0]["duty"], 2);
    assert_eq!(last["outputs"][0]["temperature"], 2.0);
    assert_eq!(last["outputs"][1]["temperature"], Value::Null);
    assert_eq!(last["busVoltage"], 12.0);
    assert_eq!(last["current"], 0.02);
}

#[test]
fn test_ambient_fields_omitted_without_sensor() {
    let mut history = history(1, false);
    let document = String::from_utf8(reference_document(&mut history, 0)).unwrap();
    assert!(!document.contains("ambient"));
    assert!(document.starts_with(r#"{"now":0,"entries":[{"uptime":0,"outputs":"#));
    assert!(document.ends_with("}]}"));
}

#[test]
fn test_one_byte_buffers() {
    let mut reference = history(5, true);
    let expected = reference_document(&mut reference, 77);

    let mut history = history(5, true);
    let mut stream = HistoryStream::new(77);
    let chunked = drain(&mut stream, &mut history, &[1]);
    assert_eq!(chunked, expected);
    assert!(stream.is_complete());
}

#[test]
fn test_changing_buffer_sizes() {
    let mut reference = history(5, true);
    let expected = reference_document(&mut reference, 77);

    for sizes in [&[64usize, 1, 3][..], &[2, 500], &[150, 149, 0, 7], &[1024]] {
        let mut history = history(5, true);
        let chunked = drain(&mut HistoryStream::new(77), &mut history, sizes);
        assert_eq!(chunked, expected, "sizes {:?}", sizes);
        assert!(!history.is_locked());
    }
}

#[test]
fn test_empty_history() {
    let mut history = history(0, true);
    let mut stream = HistoryStream::new(12);
    let mut buffer = [0u8; 128];

    let n = stream.pull(&mut history, &mut buffer, 0);
    assert_eq!(&buffer[..n], br#"{"now":12,"entries":[]}"#);
    assert_eq!(stream.pull(&mut history, &mut buffer, n), 0);
    assert_eq!(stream.pull(&mut history, &mut buffer, n), 0);
}

#[test]
fn test_device_export_session() {
    let mut rig = Rig::new([3.0, 4.0, 5.0]);
    for minute in 1..=4 {
        rig.device.control_tick();
        rig.device.history_tick(minute * 60);
    }

    rig.device.begin_export(1_000);
    let mut out = Vec::new();
    let mut buffer = [0u8; 37];
    loop {
        let n = rig.device.pull_export(&mut buffer, out.len());
        if n == 0 {
            break;
        }
        // Pushes are dropped while the export runs
        if rig.device.history().is_locked() {
            assert!(!rig.device.history_tick(9_999));
        }
        out.extend_from_slice(&buffer[..n]);
    }

    assert!(!rig.device.is_exporting());
    assert!(!rig.device.history().is_locked());

    let doc: Value = serde_json::from_slice(&out).unwrap();
    let entries = doc["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3]["uptime"], 240);
    assert_eq!(entries[0]["outputs"].as_array().map(Vec::len), Some(4));
    assert_eq!(entries[0]["outputs"][2]["temperature"], 5.0);
    assert_eq!(entries[0]["outputs"][3]["temperature"], Value::Null);
}

#[test]
fn test_abandoned_export_unlocks() {
    let mut rig = Rig::new([3.0, 4.0, 5.0]);
    rig.device.history_tick(60);
    rig.device.history_tick(120);

    rig.device.begin_export(1);
    let mut buffer = [0u8; 16];
    assert!(rig.device.pull_export(&mut buffer, 0) > 0);
    assert!(rig.device.history().is_locked());

    // A new request replaces the stale session
    rig.device.begin_export(2);
    assert!(!rig.device.history().is_locked());

    rig.device.abort_export();
    assert!(rig.device.history_tick(180));
    assert_eq!(rig.device.pull_export(&mut buffer, 0), 0);
}

#[test]
fn test_history_bounded_by_config() {
    let config = DeviceConfig { history_max_size: 3, ..DeviceConfig::default() };
    let mut rig = Rig::with_config(config, [0.0, 0.0, 0.0]);
    for t in 0..10 {
        rig.device.history_tick(t);
    }
    let uptimes: Vec<u32> = rig.device.history().iter().map(|e| e.seconds_from_boot).collect();
    assert_eq!(uptimes, [7, 8, 9]);

    rig.device.set_history_size(1);
    assert_eq!(rig.device.history().len(), 1);
    assert!(rig.device.history().json_size_hint() > 0);
}

#[test]
fn test_resize_during_export() {
    let mut rig = Rig::new([3.0, 4.0, 5.0]);
    for minute in 1..=5 {
        rig.device.history_tick(minute * 60);
    }

    rig.device.begin_export(1);
    let mut out = Vec::new();
    let mut buffer = [0u8; 300];
    loop {
        let n = rig.device.pull_export(&mut buffer, out.len());
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buffer[..n]);
        if rig.device.history().is_locked() {
            rig.device.set_history_size(1);
            assert_eq!(rig.device.history().len(), 5);
        }
    }

    let doc: Value = serde_json::from_slice(&out).unwrap();
    let uptimes: Vec<u64> = doc["entries"].as_array().unwrap().iter().map(|e| e["uptime"].as_u64().unwrap()).collect();
    assert_eq!(uptimes, [60, 120, 180, 240, 300]);

    assert!(!rig.device.history().is_locked());
    assert_eq!(rig.device.history().len(), 1);
    assert_eq!(rig.device.history().get(0).map(|e| e.seconds_from_boot), Some(300));
}
