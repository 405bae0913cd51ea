use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

/// Capability request handed to the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

/// Opaque handle for a live capture stream.
///
/// Returned by [`CaptureSource::request_stream`] and handed back for track
/// release; the coordinator never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: u64,
}

/// Typed events emitted by a capture source during recording.
#[derive(Debug)]
pub enum CaptureEvent {
    /// One timeslice worth of encoded media. May be empty; empty chunks are
    /// discarded downstream without consuming an index.
    Chunk(Vec<u8>),
    /// Device or encoder failure. Recording continues unless the caller
    /// reacts.
    Error(anyhow::Error),
    /// Confirmation that emission has halted; always the last event.
    Stopped,
}

/// Media capture device abstraction
///
/// Implementations own the device/encoder specifics; the coordinator only
/// configures constraints, mime type, and timeslice, then consumes the
/// event stream.
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Whether the capture capability exists in this environment.
    /// Checked once at coordinator construction.
    fn is_available(&self) -> bool;

    /// Acquire a live stream matching the constraints.
    ///
    /// Failure here is not retryable; the coordinator propagates it to the
    /// caller.
    async fn request_stream(&mut self, constraints: &CaptureConstraints) -> Result<StreamHandle>;

    /// Begin periodic chunk emission on the given stream.
    ///
    /// Returns a channel receiver yielding [`CaptureEvent`]s. The source must
    /// deliver a final `Stopped` event after [`halt`](Self::halt) takes
    /// effect.
    async fn start_emission(
        &mut self,
        stream: &StreamHandle,
        mime_type: Option<&str>,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<CaptureEvent>>;

    /// Request emission to stop. Confirmation arrives as a `Stopped` event.
    async fn halt(&mut self) -> Result<()>;

    /// Release all device resources held by the stream.
    async fn release_tracks(&mut self, stream: &StreamHandle) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}
