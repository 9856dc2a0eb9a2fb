use anyhow::{Context, Result};
use serde_json::Value;
use std::process::{Command, Output};
use tempfile::tempdir;

fn gatectl(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_gatectl"))
        .args(args)
        .output()
        .context("spawn gatectl")
}

fn json_summary(args: &[&str]) -> Result<Value> {
    let out = gatectl(args)?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[test]
fn only_first_lookup_per_key_is_fetched() -> Result<()> {
    let summary = json_summary(&[
        "--calls", "1", "--period", "0.05", "--total", "20", "--keys", "4", "--latency-ms", "0",
        "--json",
    ])?;
    assert_eq!(summary["mode"], "blocking");
    assert_eq!(summary["fresh_fetches"], 4);
    assert_eq!(summary["cache_hits"], 16);
    assert_eq!(summary["throttled"], 0);
    let waits = summary["waits"].as_u64().unwrap();
    assert!((1..=4).contains(&waits));
    // Every retry replays a key its refused attempt already cached.
    assert_eq!(summary["cache_lookups"].as_u64().unwrap(), 16 + waits);
    Ok(())
}

#[test]
fn async_mode_matches_blocking_counts() -> Result<()> {
    let summary = json_summary(&[
        "--async", "--calls", "2", "--period", "0.05", "--total", "30", "--keys", "6",
        "--latency-ms", "0", "--json",
    ])?;
    assert_eq!(summary["mode"], "async");
    assert_eq!(summary["fresh_fetches"], 6);
    assert_eq!(summary["cache_hits"], 24);
    let waits = summary["waits"].as_u64().unwrap();
    assert_eq!(summary["cache_lookups"].as_u64().unwrap(), 24 + waits);
    assert_eq!(summary["window"]["max_calls"], 2);
    Ok(())
}

#[test]
fn no_raise_reports_throttled_calls() -> Result<()> {
    let summary = json_summary(&[
        "--no-raise", "--calls", "1", "--period", "60", "--total", "3", "--keys", "3",
        "--latency-ms", "0", "--json",
    ])?;
    assert_eq!(summary["fresh_fetches"], 3);
    assert_eq!(summary["throttled"], 2);
    assert_eq!(summary["waits"], 0);
    assert_eq!(summary["window"]["call_count"], 3);
    Ok(())
}

#[test]
fn config_file_drives_the_gate() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("gate.toml");
    let path_str = path.to_str().context("utf-8 path")?;

    let init = gatectl(&["config", "init", path_str])?;
    assert!(init.status.success());
    let again = gatectl(&["config", "init", path_str])?;
    assert!(!again.status.success());

    let show = gatectl(&["config", "show", path_str])?;
    let text = String::from_utf8_lossy(&show.stdout);
    assert!(text.contains("httpbin: 1 fresh calls per 1.000s"));

    std::fs::write(&path, "name = \"api\"\ncalls = 5\nperiod_secs = 60.0\n")?;
    let summary = json_summary(&[
        "--config", path_str, "--total", "5", "--keys", "5", "--latency-ms", "0", "--json",
    ])?;
    assert_eq!(summary["window"]["name"], "api");
    assert_eq!(summary["window"]["call_count"], 5);
    assert_eq!(summary["waits"], 0);
    Ok(())
}

#[test]
fn invalid_settings_fail_fast() -> Result<()> {
    let zero_calls = gatectl(&["--calls", "0", "--total", "1", "--json"])?;
    assert!(!zero_calls.status.success());
    let negative_period = gatectl(&["--period=-1", "--total", "1", "--json"])?;
    assert!(!negative_period.status.success());
    Ok(())
}
