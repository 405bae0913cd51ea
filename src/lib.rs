pub mod capture;
pub mod config;
pub mod recorder;
pub mod retry;
pub mod transport;

pub use capture::{
    CaptureConstraints, CaptureEvent, CaptureSource, StreamHandle, SyntheticCapture,
};
pub use config::Config;
pub use recorder::{
    ChunkedRecorder, MediaKind, RecorderConfig, RecorderHooks, RecorderState, UploadStats,
};
pub use retry::{with_retry, RetryPolicy};
pub use transport::{FinalizeTransport, HttpTransport, TransportError, UploadTransport};
