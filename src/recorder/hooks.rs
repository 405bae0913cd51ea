use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{error, warn};

use super::config::MediaKind;

/// Payload for the chunk-uploaded callback.
#[derive(Debug, Clone)]
pub struct ChunkUploaded {
    pub index: usize,
    /// Server acknowledgement, passed through verbatim
    pub result: Value,
}

/// Payload for the limit-reached callback.
#[derive(Debug, Clone, Copy)]
pub struct LimitReached {
    pub kind: MediaKind,
    pub max_chunks: usize,
}

/// Caller-supplied observers for recorder events.
///
/// All hooks run on the recorder's tasks and must not block. The limit
/// handler may fail; its error is logged and never reaches the recording
/// pipeline.
#[derive(Clone)]
pub struct RecorderHooks {
    pub on_chunk_uploaded: Option<Arc<dyn Fn(ChunkUploaded) + Send + Sync>>,
    pub on_error: Arc<dyn Fn(&anyhow::Error) + Send + Sync>,
    pub on_limit_reached: Arc<dyn Fn(LimitReached) -> Result<()> + Send + Sync>,
}

impl Default for RecorderHooks {
    fn default() -> Self {
        Self {
            on_chunk_uploaded: None,
            on_error: Arc::new(|err| {
                error!("Recorder error: {:#}", err);
            }),
            on_limit_reached: Arc::new(|info| {
                warn!(
                    "Chunk limit reached for {} recording ({} chunks), stopping",
                    info.kind, info.max_chunks
                );
                Ok(())
            }),
        }
    }
}

impl RecorderHooks {
    pub fn on_chunk_uploaded(
        mut self,
        hook: impl Fn(ChunkUploaded) + Send + Sync + 'static,
    ) -> Self {
        self.on_chunk_uploaded = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&anyhow::Error) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(hook);
        self
    }

    pub fn on_limit_reached(
        mut self,
        hook: impl Fn(LimitReached) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_limit_reached = Arc::new(hook);
        self
    }
}

impl std::fmt::Debug for RecorderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderHooks")
            .field("on_chunk_uploaded", &self.on_chunk_uploaded.is_some())
            .finish_non_exhaustive()
    }
}
