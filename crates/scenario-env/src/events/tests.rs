// crates/scenario-env/src/events/tests.rs
// ============================================================================
// Module: Lifecycle Event Tests
// Description: Unit tests for lifecycle event payloads and sinks.
// Purpose: Pin the JSON-line shape and sink selection.
// Dependencies: scenario-env, serde_json, tempfile
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::fs;

use serde_json::Value;

use super::FileSink;
use super::LifecycleEvent;
use super::LifecycleEventKind;
use super::LifecycleSink;
use super::MemorySink;
use super::sink_from_config;
use crate::config::ScenarioEnvConfig;

#[test]
fn event_serializes_with_snake_case_kind() {
    let event = LifecycleEvent::new(LifecycleEventKind::ModulePathOverridden)
        .scenario(Some("generate config"))
        .field("var", "RUBYLIB");

    let value: Value = serde_json::to_value(&event).expect("serialize");

    assert_eq!(value["event"], "module_path_overridden");
    assert_eq!(value["scenario"], "generate config");
    assert_eq!(value["fields"]["var"], "RUBYLIB");
    assert!(value["timestamp_ms"].is_u64());
}

#[test]
fn file_sink_appends_json_lines() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = root.path().join("events.jsonl");
    let sink = FileSink::new(&path).expect("open sink");

    sink.record(&LifecycleEvent::new(LifecycleEventKind::ScratchReset));
    sink.record(&LifecycleEvent::new(LifecycleEventKind::ModulePathRestored));

    let content = fs::read_to_string(&path).expect("read log");
    let kinds: Vec<String> = content
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("json line");
            value["event"].as_str().expect("event").to_string()
        })
        .collect();
    assert_eq!(kinds, vec!["scratch_reset", "module_path_restored"]);
}

#[test]
fn memory_sink_keeps_order() {
    let sink = MemorySink::new();
    sink.record(&LifecycleEvent::new(LifecycleEventKind::ScenarioStarted));
    sink.record(&LifecycleEvent::new(LifecycleEventKind::ScenarioFinished));

    assert_eq!(
        sink.kinds(),
        vec![LifecycleEventKind::ScenarioStarted, LifecycleEventKind::ScenarioFinished]
    );
}

#[test]
fn configured_event_log_selects_file_sink() {
    let root = tempfile::tempdir().expect("tempdir");
    let path = root.path().join("events.jsonl");
    let mut config = ScenarioEnvConfig::for_project(root.path());
    config.event_log = Some(path.clone());

    let sink = sink_from_config(&config, false).expect("sink");
    sink.record(&LifecycleEvent::new(LifecycleEventKind::SetupFailed));

    let content = fs::read_to_string(&path).expect("read log");
    assert!(content.contains("\"setup_failed\""));
}
