// Configuration loading and normalization tests

use std::fs;
use std::time::Duration;

use anyhow::Result;
use media_uplink::{Config, MediaKind};
use tempfile::TempDir;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.upload.base_url, "/api/interviews");
    assert_eq!(config.recorder.timeslice_ms, 45_000);
    assert_eq!(config.recorder.max_chunks, 80);
    assert_eq!(config.retry.max_retries, 4);
    assert_eq!(config.retry.initial_delay_ms, 500);
    assert_eq!(config.retry.backoff_factor, 2.0);
    assert_eq!(config.retry.max_delay_ms, 5_000);
}

#[test]
fn loads_overrides_from_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("uplink.toml");
    fs::write(
        &path,
        r#"
[upload]
base_url = "https://example.com/api/interviews"

[recorder]
timeslice_ms = 10000
max_chunks = 12

[retry]
max_retries = 2
initial_delay_ms = 100
"#,
    )?;

    let config = Config::load(path.with_extension("").to_str().unwrap())?;
    assert_eq!(config.upload.base_url, "https://example.com/api/interviews");
    assert_eq!(config.recorder.max_chunks, 12);

    let recorder = config.recorder_config("session-1", MediaKind::Audio);
    assert_eq!(recorder.timeslice, Duration::from_millis(10_000));
    assert_eq!(recorder.max_chunks, 12);
    assert_eq!(recorder.retry.max_retries, 2);
    assert_eq!(recorder.retry.initial_delay, Duration::from_millis(100));
    // Unset retry fields keep their defaults
    assert_eq!(recorder.retry.backoff_factor, 2.0);
    assert_eq!(recorder.retry.max_delay, Duration::from_millis(5_000));

    Ok(())
}

#[test]
fn invalid_numeric_values_fall_back_to_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("uplink.toml");
    fs::write(
        &path,
        r#"
[recorder]
timeslice_ms = 0
max_chunks = 0

[retry]
initial_delay_ms = 0
backoff_factor = -1.0
"#,
    )?;

    let config = Config::load(path.with_extension("").to_str().unwrap())?;
    let recorder = config.recorder_config("session-1", MediaKind::Video);

    assert_eq!(recorder.timeslice, Duration::from_millis(45_000));
    assert_eq!(recorder.max_chunks, 80);
    assert_eq!(recorder.retry.initial_delay, Duration::from_millis(500));
    assert_eq!(recorder.retry.backoff_factor, 2.0);

    Ok(())
}
