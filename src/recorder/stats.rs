use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::recorder::RecorderState;

/// Snapshot of a recorder's upload progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStats {
    /// Coordinator lifecycle state at snapshot time
    pub state: RecorderState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Chunks assigned an index and handed to the upload transport
    pub chunks_dispatched: usize,

    /// Chunks acknowledged by the server
    pub chunks_uploaded: usize,

    /// Chunks permanently lost after retry exhaustion or a non-retryable
    /// failure
    pub chunks_failed: usize,

    /// Total payload bytes acknowledged
    pub bytes_uploaded: u64,
}
