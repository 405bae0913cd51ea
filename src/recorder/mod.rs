//! Chunked recording coordination
//!
//! This module provides the `ChunkedRecorder` abstraction that manages:
//! - Acquiring a capture stream and subscribing to its event feed
//! - Indexing timeslice chunks and dispatching concurrent uploads
//! - Enforcing the per-session chunk ceiling
//! - The stop barrier (capture halt + upload drain) and the one-shot
//!   finalize handshake

mod config;
mod hooks;
mod recorder;
mod stats;

pub use config::{MediaKind, RecorderConfig};
pub use hooks::{ChunkUploaded, LimitReached, RecorderHooks};
pub use recorder::{ChunkedRecorder, RecorderState};
pub use stats::UploadStats;
