use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "cwnd-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_cwnd_study(out_dir: &Path, extra: &[&str]) -> Output {
    let mut args = vec!["--label", "t"];
    args.extend_from_slice(extra);
    run_unlabelled(out_dir, &args)
}

fn run_unlabelled(out_dir: &Path, extra: &[&str]) -> Output {
    let mut args = vec!["--out-dir", out_dir.to_str().unwrap()];
    args.extend_from_slice(extra);
    Command::new(env!("CARGO_BIN_EXE_cwnd_study"))
        .args(&args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run cwnd_study")
}

#[test]
fn cwnd_study_writes_all_trace_files() {
    let dir = unique_temp_dir("cwnd-study");
    let output = run_cwnd_study(&dir, &["--until-ms", "100"]);
    assert!(
        output.status.success(),
        "cwnd_study failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Flow monitor output:"), "stdout={stdout}");
    assert!(stdout.contains("Tx Packets:"));
    assert!(stdout.contains("Mean jitter:"));

    // 采样从 10 ms 开始，每 10 ms 一次，直到 100 ms（含）
    let drop = fs::read_to_string(dir.join("t.drop")).expect("read t.drop");
    let lines: Vec<&str> = drop.lines().collect();
    assert_eq!(lines.len(), 10);
    assert!(lines[0].starts_with("0.010000000\t"), "first line: {}", lines[0]);
    assert!(lines[9].starts_with("0.100000000\t"), "last line: {}", lines[9]);

    let cwnd = fs::read_to_string(dir.join("t.cwnd")).expect("read t.cwnd");
    for line in cwnd.lines() {
        assert_eq!(line.split('\t').count(), 3, "cwnd line: {line}");
    }
    assert!(dir.join("t.pktdrop").exists());

    let bytes = fs::read_to_string(dir.join("t.pktbytes")).expect("read t.pktbytes");
    let first = bytes.lines().next().expect("at least one transmitted packet");
    let cols: Vec<&str> = first.split('\t').collect();
    assert_eq!(cols.len(), 2, "pktbytes line: {first}");
    assert_eq!(cols[0], "0.000000000");
    assert!(cols[1].parse::<u64>().expect("byte count") > 0);

    let raw = fs::read_to_string(dir.join("t.flowmon.json")).expect("read flowmon json");
    let v: Value = serde_json::from_str(&raw).expect("parse flowmon json");
    let flows = v.as_array().expect("flowmon json must be an array");
    assert!(!flows.is_empty());
    assert_eq!(flows[0].get("flow_id").and_then(Value::as_u64), Some(1));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cwnd_study_reads_scenario_file() {
    let dir = unique_temp_dir("cwnd-study-config");
    let config = dir.join("scenario.json");
    fs::write(
        &config,
        r#"{ "stop_ms": 50, "sampler": { "interval_ms": 5 }, "cbr": { "windows": [] } }"#,
    )
    .expect("write scenario");

    let output = run_cwnd_study(&dir, &["--config", config.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "cwnd_study failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let drop = fs::read_to_string(dir.join("t.drop")).expect("read t.drop");
    assert_eq!(drop.lines().count(), 10);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cwnd_study_rejects_malformed_scenario() {
    let dir = unique_temp_dir("cwnd-study-bad");
    let config = dir.join("scenario.json");
    fs::write(&config, "{ not json").expect("write scenario");

    let output = run_cwnd_study(&dir, &["--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid scenario json"), "stderr={stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cwnd_study_labels_outputs_after_the_congestion_control() {
    let dir = unique_temp_dir("cwnd-study-cc");
    let output = run_unlabelled(&dir, &["--congestion-control", "new-reno", "--until-ms", "20"]);
    assert!(
        output.status.success(),
        "cwnd_study failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    for ext in ["cwnd", "drop", "pktdrop", "pktbytes", "flowmon.json"] {
        assert!(dir.join(format!("TcpNewReno.{ext}")).exists(), "missing TcpNewReno.{ext}");
    }

    let output = run_unlabelled(&dir, &["--congestion-control", "vegas"]);
    assert!(!output.status.success());

    let _ = fs::remove_dir_all(&dir);
}
