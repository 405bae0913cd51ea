use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::RecorderConfig;
use super::hooks::{ChunkUploaded, LimitReached, RecorderHooks};
use super::stats::UploadStats;
use crate::capture::{CaptureEvent, CaptureSource, StreamHandle};
use crate::retry::with_retry;
use crate::transport::{FinalizeTransport, UploadTransport};

/// Coordinator lifecycle state. Transitions are one-way:
/// Idle -> Recording -> Stopping -> Finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopping,
    Finalized,
}

/// Upload coordinator for chunked media recording
///
/// Consumes the capture source's event stream, assigns a strictly increasing
/// index to every non-empty chunk, and dispatches each one to the upload
/// transport under the retry policy without blocking further emission.
/// `stop` is a barrier: it halts capture, waits for the stop confirmation and
/// for every outstanding upload to settle, then runs the one-shot finalize
/// handshake.
pub struct ChunkedRecorder {
    inner: Arc<Inner>,
}

struct Inner {
    config: RecorderConfig,
    upload: Arc<dyn UploadTransport>,
    finalizer: Arc<dyn FinalizeTransport>,
    hooks: RecorderHooks,

    capture: Mutex<Box<dyn CaptureSource>>,
    stream: std::sync::Mutex<Option<StreamHandle>>,
    state: std::sync::Mutex<RecorderState>,

    /// Next index to assign; written only by the capture event loop
    chunk_index: AtomicUsize,

    /// Outstanding upload tasks, drained atomically at the stop barrier
    uploads: Mutex<Vec<JoinHandle<()>>>,

    /// Serializes the drain so every stop caller resolves only after all
    /// outstanding uploads have settled
    drain_lock: Mutex<()>,

    started: AtomicBool,
    limit_notified: AtomicBool,

    /// Set true by the event loop once the capture source confirms stopped
    stopped_tx: watch::Sender<bool>,

    /// Cached finalize acknowledgement; the lock also serializes the single
    /// network call
    finalized: Mutex<Option<Value>>,

    started_at: DateTime<Utc>,
    chunks_uploaded: AtomicUsize,
    chunks_failed: AtomicUsize,
    bytes_uploaded: AtomicU64,
}

impl ChunkedRecorder {
    /// Create a new recorder for one session.
    ///
    /// Fails fast when the capture capability is missing or the session id
    /// is empty. Invalid numeric configuration falls back to defaults
    /// instead of failing.
    pub fn new(
        config: RecorderConfig,
        capture: Box<dyn CaptureSource>,
        upload: Arc<dyn UploadTransport>,
        finalizer: Arc<dyn FinalizeTransport>,
        hooks: RecorderHooks,
    ) -> Result<Self> {
        if !capture.is_available() {
            bail!("Capture source '{}' is not available", capture.name());
        }
        if config.session_id.trim().is_empty() {
            bail!("session_id is required");
        }

        let config = config.normalized();
        let (stopped_tx, _) = watch::channel(false);

        info!(
            "Recorder created: session={} kind={} timeslice={:?} max_chunks={}",
            config.session_id, config.kind, config.timeslice, config.max_chunks
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                upload,
                finalizer,
                hooks,
                capture: Mutex::new(capture),
                stream: std::sync::Mutex::new(None),
                state: std::sync::Mutex::new(RecorderState::Idle),
                chunk_index: AtomicUsize::new(0),
                uploads: Mutex::new(Vec::new()),
                drain_lock: Mutex::new(()),
                started: AtomicBool::new(false),
                limit_notified: AtomicBool::new(false),
                stopped_tx,
                finalized: Mutex::new(None),
                started_at: Utc::now(),
                chunks_uploaded: AtomicUsize::new(0),
                chunks_failed: AtomicUsize::new(0),
                bytes_uploaded: AtomicU64::new(0),
            }),
        })
    }

    /// Acquire the capture stream and begin recording.
    ///
    /// Fails when called on anything but an idle recorder; a stopped
    /// session cannot restart on the same instance.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != RecorderState::Idle {
                bail!("Recorder already started (state: {:?})", *state);
            }
            *state = RecorderState::Recording;
        }

        let events = match self.acquire_and_subscribe().await {
            Ok(events) => events,
            Err(err) => {
                *self.inner.state.lock().unwrap() = RecorderState::Idle;
                (self.inner.hooks.on_error)(&err);
                return Err(err);
            }
        };

        self.inner.started.store(true, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_event_loop(events).await;
        });

        info!("Recording started: session={}", self.inner.config.session_id);
        Ok(())
    }

    async fn acquire_and_subscribe(&self) -> Result<mpsc::Receiver<CaptureEvent>> {
        let config = &self.inner.config;
        let mut capture = self.inner.capture.lock().await;

        let stream = capture
            .request_stream(&config.constraints)
            .await
            .context("Failed to acquire capture stream")?;

        let events = capture
            .start_emission(&stream, config.mime_type.as_deref(), config.timeslice)
            .await
            .context("Failed to start chunk emission")?;

        *self.inner.stream.lock().unwrap() = Some(stream);
        Ok(events)
    }

    /// Stop recording.
    ///
    /// Idempotent: concurrent callers all resolve after the capture source
    /// confirms halted and every outstanding upload has settled. With
    /// `finalize` set, returns the finalize acknowledgement; a recorder that
    /// never started skips straight to the finalize handshake.
    pub async fn stop(&self, finalize: bool) -> Result<Option<Value>> {
        self.inner.stop(finalize).await
    }

    /// Run the finalize handshake, at most once per instance.
    ///
    /// Later calls return the cached acknowledgement without touching the
    /// network. Outstanding uploads are settled first.
    pub async fn finalize(&self) -> Result<Value> {
        self.inner.finalize().await
    }

    pub fn state(&self) -> RecorderState {
        *self.inner.state.lock().unwrap()
    }

    pub fn session_id(&self) -> &str {
        &self.inner.config.session_id
    }

    /// Snapshot of upload progress
    pub fn stats(&self) -> UploadStats {
        let inner = &self.inner;
        UploadStats {
            state: *inner.state.lock().unwrap(),
            started_at: inner.started_at,
            chunks_dispatched: inner.chunk_index.load(Ordering::SeqCst),
            chunks_uploaded: inner.chunks_uploaded.load(Ordering::SeqCst),
            chunks_failed: inner.chunks_failed.load(Ordering::SeqCst),
            bytes_uploaded: inner.bytes_uploaded.load(Ordering::SeqCst),
        }
    }
}

impl Inner {
    async fn run_event_loop(self: Arc<Self>, mut events: mpsc::Receiver<CaptureEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Chunk(data) => self.handle_chunk(data).await,
                CaptureEvent::Error(err) => {
                    let err = err.context("Capture error");
                    (self.hooks.on_error)(&err);
                }
                CaptureEvent::Stopped => break,
            }
        }

        // A closed channel without a Stopped event still counts as stopped;
        // the source is gone either way. send_replace stores the value even
        // while nobody is subscribed yet, so a stop caller arriving later
        // still observes the confirmation.
        self.stopped_tx.send_replace(true);
        info!("Capture event loop exited: session={}", self.config.session_id);
    }

    async fn handle_chunk(self: &Arc<Self>, data: Vec<u8>) {
        // Empty chunks are discarded without consuming an index
        if data.is_empty() {
            return;
        }

        let index = self.chunk_index.load(Ordering::SeqCst);
        if index >= self.config.max_chunks {
            self.trigger_limit();
            return;
        }
        self.chunk_index.store(index + 1, Ordering::SeqCst);

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            inner.upload_chunk(index, data).await;
        });
        self.uploads.lock().await.push(handle);

        if index + 1 >= self.config.max_chunks {
            self.trigger_limit();
        }
    }

    async fn upload_chunk(&self, index: usize, data: Vec<u8>) {
        let size = data.len() as u64;
        let upload = Arc::clone(&self.upload);
        let session_id = self.config.session_id.clone();
        let kind = self.config.kind;

        let result = with_retry(&self.config.retry, || {
            let upload = Arc::clone(&upload);
            let session_id = session_id.clone();
            let data = data.clone();
            async move { upload.upload_chunk(&session_id, kind, index, data).await }
        })
        .await;

        match result {
            Ok(ack) => {
                self.chunks_uploaded.fetch_add(1, Ordering::SeqCst);
                self.bytes_uploaded.fetch_add(size, Ordering::SeqCst);
                if let Some(hook) = &self.hooks.on_chunk_uploaded {
                    hook(ChunkUploaded { index, result: ack });
                }
            }
            Err(err) => {
                // The chunk is permanently lost for this index; recording
                // itself continues.
                self.chunks_failed.fetch_add(1, Ordering::SeqCst);
                let err = anyhow::Error::new(err).context(format!("Chunk {} upload failed", index));
                (self.hooks.on_error)(&err);
            }
        }
    }

    /// Fire the limit condition once: notify the handler, then stop the
    /// session in the background, finalize included.
    fn trigger_limit(self: &Arc<Self>) {
        if self.limit_notified.swap(true, Ordering::SeqCst) {
            return;
        }

        let info = LimitReached {
            kind: self.config.kind,
            max_chunks: self.config.max_chunks,
        };
        if let Err(err) = (self.hooks.on_limit_reached)(info) {
            warn!("Limit handler failed: {:#}", err);
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = inner.stop(true).await {
                (inner.hooks.on_error)(&err);
            }
        });
    }

    async fn stop(&self, finalize: bool) -> Result<Option<Value>> {
        if !self.started.load(Ordering::SeqCst) {
            return if finalize {
                self.finalize().await.map(Some)
            } else {
                Ok(None)
            };
        }

        let initiator = {
            let mut state = self.state.lock().unwrap();
            if *state == RecorderState::Recording {
                *state = RecorderState::Stopping;
                true
            } else {
                false
            }
        };

        if initiator {
            info!("Stopping recording: session={}", self.config.session_id);

            let halt_result = { self.capture.lock().await.halt().await };
            if let Err(err) = halt_result {
                let err = err.context("Capture halt failed");
                (self.hooks.on_error)(&err);
            }

            // Device resources are released regardless of the halt outcome
            let stream = self.stream.lock().unwrap().take();
            if let Some(stream) = stream {
                let release = { self.capture.lock().await.release_tracks(&stream).await };
                if let Err(err) = release {
                    warn!("Failed to release capture tracks: {:#}", err);
                }
            }
        }

        self.await_capture_stopped().await;
        self.drain_uploads().await;

        if finalize {
            self.finalize().await.map(Some)
        } else {
            Ok(None)
        }
    }

    async fn finalize(&self) -> Result<Value> {
        let mut cache = self.finalized.lock().await;
        if let Some(value) = cache.as_ref() {
            return Ok(value.clone());
        }

        // Settle anything still in flight, in case finalize was called
        // without an explicit stop
        self.drain_uploads().await;

        let finalizer = Arc::clone(&self.finalizer);
        let session_id = self.config.session_id.clone();

        let result = with_retry(&self.config.retry, || {
            let finalizer = Arc::clone(&finalizer);
            let session_id = session_id.clone();
            async move { finalizer.finalize(&session_id).await }
        })
        .await;

        match result {
            Ok(value) => {
                *cache = Some(value.clone());
                *self.state.lock().unwrap() = RecorderState::Finalized;
                info!("Session finalized: {}", self.config.session_id);
                Ok(value)
            }
            Err(err) => {
                let err = anyhow::Error::new(err)
                    .context(format!("Finalize failed for session {}", session_id));
                (self.hooks.on_error)(&err);
                Err(err)
            }
        }
    }

    /// Wait (bounded) for the capture source's stop confirmation.
    async fn await_capture_stopped(&self) {
        let mut rx = self.stopped_tx.subscribe();
        if *rx.borrow() {
            return;
        }

        let confirmed = async {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    break;
                }
            }
        };

        if tokio::time::timeout(self.config.drain_timeout, confirmed)
            .await
            .is_err()
        {
            warn!(
                "No capture stop confirmation within {:?}, proceeding",
                self.config.drain_timeout
            );
        }
    }

    /// Settle every outstanding upload, ignoring individual failures (the
    /// upload tasks report those themselves). Bounded by `drain_timeout`;
    /// stuck tasks are aborted and reported.
    async fn drain_uploads(&self) {
        let _guard = self.drain_lock.lock().await;

        let mut handles: Vec<JoinHandle<()>> = {
            let mut uploads = self.uploads.lock().await;
            uploads.drain(..).collect()
        };
        if handles.is_empty() {
            return;
        }

        info!("Draining {} outstanding upload(s)", handles.len());

        let drain = join_all(handles.iter_mut());
        if tokio::time::timeout(self.config.drain_timeout, drain)
            .await
            .is_err()
        {
            let stuck = handles.iter().filter(|h| !h.is_finished()).count();
            for handle in &handles {
                handle.abort();
            }
            let err = anyhow!(
                "Upload drain timed out after {:?}; aborted {} stuck task(s)",
                self.config.drain_timeout,
                stuck
            );
            (self.hooks.on_error)(&err);
        }
    }
}
