pub mod source;
pub mod synthetic;

pub use source::{CaptureConstraints, CaptureEvent, CaptureSource, StreamHandle};
pub use synthetic::SyntheticCapture;
