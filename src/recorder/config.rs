use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::CaptureConstraints;
use crate::retry::RetryPolicy;

/// Which media track a recorder captures and uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Configuration for one recording session
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Opaque session identifier supplied by the caller. Required.
    pub session_id: String,

    /// Media kind reported to the upload endpoint
    pub kind: MediaKind,

    /// Duration of each captured chunk (default: 45 seconds)
    pub timeslice: Duration,

    /// Ceiling on dispatched chunks per session (default: 80)
    pub max_chunks: usize,

    /// Encoder mime type passed through to the capture source
    pub mime_type: Option<String>,

    /// Capability request for the capture device
    pub constraints: CaptureConstraints,

    /// Backoff policy for chunk uploads and the finalize call
    pub retry: RetryPolicy,

    /// Upper bound on waiting for capture stop and upload settlement during
    /// the stop barrier; stuck uploads are aborted once it elapses.
    pub drain_timeout: Duration,
}

pub const DEFAULT_TIMESLICE: Duration = Duration::from_millis(45_000);
pub const DEFAULT_MAX_CHUNKS: usize = 80;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

impl RecorderConfig {
    pub fn new(session_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
            timeslice: DEFAULT_TIMESLICE,
            max_chunks: DEFAULT_MAX_CHUNKS,
            mime_type: None,
            constraints: CaptureConstraints::default(),
            retry: RetryPolicy::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Replace invalid numeric fields with their defaults.
    ///
    /// Zero durations and a zero chunk ceiling silently fall back rather
    /// than erroring; only a missing session id fails construction.
    pub fn normalized(mut self) -> Self {
        if self.timeslice.is_zero() {
            self.timeslice = DEFAULT_TIMESLICE;
        }
        if self.max_chunks == 0 {
            self.max_chunks = DEFAULT_MAX_CHUNKS;
        }
        if self.drain_timeout.is_zero() {
            self.drain_timeout = DEFAULT_DRAIN_TIMEOUT;
        }
        self.retry = self.retry.normalized();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RecorderConfig::new("session-1", MediaKind::Audio);
        assert_eq!(config.timeslice, Duration::from_millis(45_000));
        assert_eq!(config.max_chunks, 80);
        assert!(config.mime_type.is_none());
        assert!(config.constraints.audio);
        assert!(!config.constraints.video);
    }

    #[test]
    fn normalized_restores_defaults_for_invalid_fields() {
        let mut config = RecorderConfig::new("session-1", MediaKind::Video);
        config.timeslice = Duration::ZERO;
        config.max_chunks = 0;
        config.drain_timeout = Duration::ZERO;

        let config = config.normalized();
        assert_eq!(config.timeslice, DEFAULT_TIMESLICE);
        assert_eq!(config.max_chunks, DEFAULT_MAX_CHUNKS);
        assert_eq!(config.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
    }

    #[test]
    fn media_kind_display() {
        assert_eq!(MediaKind::Audio.to_string(), "audio");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
