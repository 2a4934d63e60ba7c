//! End-to-end flow: persist collected batches as raw JSONL files, then run
//! the preprocessing pass and check the combined output.

use gleaner::events::{DockerLogRecord, GpuSampleRecord, Source};
use gleaner::store::save_records;
use gleaner::Preprocessor;
use serde_json::{json, Value};
use std::fs;

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn raw_batches_flow_into_one_combined_file() {
    let tmp = tempfile::tempdir().unwrap();
    let ingested = tmp.path().join("ingested");
    let processed = tmp.path().join("processed");

    let journal = vec![
        json!({
            "__REALTIME_TIMESTAMP": "1700000000000000",
            "MESSAGE": "boot",
            "_HOSTNAME": "h1",
            "PRIORITY": "6",
            "unit": "docker.service",
            "source": "systemd"
        }),
        // No timestamp: survives ingestion, dropped at normalization
        json!({"MESSAGE": "orphan", "source": "systemd"}),
    ];
    save_records(&journal, &ingested.join("systemd"), "systemd_logs").unwrap();

    let docker = vec![
        DockerLogRecord {
            source: Source::Docker,
            host: "h1".to_string(),
            container_id: "abc123".to_string(),
            container_name: "web".to_string(),
            timestamp: Some("2025-12-06T17:08:56.400673015Z".to_string()),
            message: "listening on :8080".to_string(),
        },
        DockerLogRecord {
            source: Source::Docker,
            host: "h1".to_string(),
            container_id: "abc123".to_string(),
            container_name: "web".to_string(),
            timestamp: None,
            message: "no-space-line".to_string(),
        },
    ];
    save_records(&docker, &ingested.join("docker"), "docker_logs").unwrap();

    let gpu = vec![GpuSampleRecord {
        source: Source::Gpu,
        host: "h1".to_string(),
        collected_at: "2025-12-06T17:09:00+00:00".to_string(),
        gpu_index: 0,
        gpu_name: "NVIDIA GeForce RTX 4090".to_string(),
        temperature_gpu_c: 45.0,
        utilization_gpu_pct: 87.0,
        memory_used_mb: 10240.0,
        memory_total_mb: 24564.0,
    }];
    save_records(&gpu, &ingested.join("gpu"), "gpu_metrics").unwrap();

    let summary = Preprocessor::new(&ingested, &processed).run().unwrap();

    // Two raw records carried no parseable timestamp
    assert_eq!(summary.events_written, 3);
    assert_eq!(summary.records_skipped, 2);
    assert!(summary.output_path.ends_with("combined_events.jsonl"));

    let events = read_lines(&summary.output_path);
    assert_eq!(events.len(), 3);

    // systemd group first, then docker, then gpu
    assert_eq!(events[0]["source"], "systemd");
    assert_eq!(events[0]["timestamp"], "2023-11-14T22:13:20+00:00");
    assert_eq!(events[0]["category"], "log");
    assert_eq!(events[0]["subtype"], "systemd");
    assert_eq!(events[0]["host"], "h1");
    assert_eq!(events[0]["message"], "boot");
    assert_eq!(events[0]["severity"], "6");
    assert_eq!(events[0]["unit"], "docker.service");

    assert_eq!(events[1]["source"], "docker");
    assert_eq!(events[1]["timestamp"], "2025-12-06T17:08:56.400673015+00:00");
    assert_eq!(events[1]["container_id"], "abc123");
    assert_eq!(events[1]["container_name"], "web");
    assert_eq!(events[1]["message"], "listening on :8080");

    assert_eq!(events[2]["source"], "gpu");
    assert_eq!(events[2]["category"], "metric");
    assert_eq!(events[2]["gpu_index"], 0);
    assert_eq!(events[2]["memory_total_mb"], 24564.0);

    // Every surviving event carries a parsed UTC timestamp
    for event in &events {
        let ts = event["timestamp"].as_str().unwrap();
        assert!(ts.ends_with("+00:00"), "not UTC: {ts}");
    }
}

#[test]
fn rerunning_preprocessing_overwrites_the_combined_file() {
    let tmp = tempfile::tempdir().unwrap();
    let ingested = tmp.path().join("ingested");
    let processed = tmp.path().join("processed");

    let journal = vec![json!({"__REALTIME_TIMESTAMP": "1700000000000000"})];
    save_records(&journal, &ingested.join("systemd"), "systemd_logs").unwrap();

    let preprocessor = Preprocessor::new(&ingested, &processed);
    let first = preprocessor.run().unwrap();
    let second = preprocessor.run().unwrap();

    assert_eq!(first.events_written, 1);
    assert_eq!(second.events_written, 1);
    assert_eq!(read_lines(&second.output_path).len(), 1);
}
