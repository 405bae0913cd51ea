//! Upload and finalize transports
//!
//! The coordinator talks to the remote service through two narrow traits so
//! the HTTP layer can be swapped out for in-memory implementations in tests.

mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpTransport;

use crate::recorder::MediaKind;

/// Transport-level failure with an explicit retryability classification.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint answered with a non-2xx status
    #[error("{endpoint} failed with status {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
        retryable: bool,
    },

    /// Connection-level failure (DNS, refused, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint answered 2xx but the body was not valid JSON
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Build a status error using the shared retryability rule:
    /// server errors and rate limiting are transient, everything else is not.
    pub fn from_status(endpoint: &'static str, status: u16) -> Self {
        Self::Status {
            endpoint,
            status,
            retryable: status >= 500 || status == 429,
        }
    }

    /// Whether the retry policy may re-attempt the operation.
    ///
    /// Errors that carry no explicit classification are treated as
    /// retryable, matching the transport contract for transient conditions.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Status { retryable, .. } => *retryable,
            Self::Network(_) | Self::Decode(_) => true,
        }
    }
}

/// Accepts one chunk per call; returns the server acknowledgement verbatim.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload_chunk(
        &self,
        session_id: &str,
        kind: MediaKind,
        index: usize,
        data: Vec<u8>,
    ) -> Result<serde_json::Value, TransportError>;
}

/// Informs the server no further chunks will arrive for a session.
#[async_trait]
pub trait FinalizeTransport: Send + Sync {
    async fn finalize(&self, session_id: &str) -> Result<serde_json::Value, TransportError>;
}

/// Deterministic filename carried in the multipart chunk field.
pub fn chunk_file_name(kind: MediaKind, index: usize) -> String {
    format!("{}_{:06}.webm", kind, index)
}
