use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::recorder::{MediaKind, RecorderConfig};
use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload: UploadConfig,
    pub recorder: RecorderDefaults,
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Base path of the upload service; `/upload/chunk` and
    /// `/upload/finalize` are appended
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderDefaults {
    pub timeslice_ms: u64,
    pub max_chunks: usize,
    pub drain_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload: UploadConfig::default(),
            recorder: RecorderDefaults::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "/api/interviews".to_string(),
        }
    }
}

impl Default for RecorderDefaults {
    fn default() -> Self {
        Self {
            timeslice_ms: 45_000,
            max_chunks: 80,
            drain_timeout_ms: 30_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_factor: self.retry.backoff_factor,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
        .normalized()
    }

    /// Build a per-session recorder config from the file-level defaults.
    /// Invalid numeric values fall back to the documented defaults.
    pub fn recorder_config(&self, session_id: impl Into<String>, kind: MediaKind) -> RecorderConfig {
        let mut config = RecorderConfig::new(session_id, kind);
        config.timeslice = Duration::from_millis(self.recorder.timeslice_ms);
        config.max_chunks = self.recorder.max_chunks;
        config.drain_timeout = Duration::from_millis(self.recorder.drain_timeout_ms);
        config.retry = self.retry_policy();
        config.normalized()
    }
}
