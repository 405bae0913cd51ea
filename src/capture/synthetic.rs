use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use super::source::{CaptureConstraints, CaptureEvent, CaptureSource, StreamHandle};

/// Timer-driven capture source emitting fixed-size opaque chunks.
///
/// Stands in for a real device when exercising the upload pipeline from the
/// CLI or soak tests: one chunk per timeslice until halted, then a final
/// `Stopped` event.
pub struct SyntheticCapture {
    chunk_bytes: usize,
    next_stream_id: u64,
    active_stream: Option<StreamHandle>,
    halt_tx: Option<watch::Sender<bool>>,
    emitter: Option<JoinHandle<()>>,
}

impl SyntheticCapture {
    pub fn new(chunk_bytes: usize) -> Self {
        Self {
            chunk_bytes,
            next_stream_id: 0,
            active_stream: None,
            halt_tx: None,
            emitter: None,
        }
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        // Roughly one second of opus-encoded audio
        Self::new(16 * 1024)
    }
}

#[async_trait::async_trait]
impl CaptureSource for SyntheticCapture {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_stream(&mut self, constraints: &CaptureConstraints) -> Result<StreamHandle> {
        if !constraints.audio && !constraints.video {
            bail!("Constraints request neither audio nor video");
        }
        if self.active_stream.is_some() {
            bail!("Synthetic stream already active");
        }

        let handle = StreamHandle {
            id: self.next_stream_id,
        };
        self.next_stream_id += 1;
        self.active_stream = Some(handle);

        info!("Synthetic capture stream {} acquired", handle.id);
        Ok(handle)
    }

    async fn start_emission(
        &mut self,
        stream: &StreamHandle,
        _mime_type: Option<&str>,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<CaptureEvent>> {
        if self.active_stream != Some(*stream) {
            bail!("Unknown stream handle: {}", stream.id);
        }

        let (event_tx, event_rx) = mpsc::channel(16);
        let (halt_tx, mut halt_rx) = watch::channel(false);
        self.halt_tx = Some(halt_tx);

        let chunk_bytes = self.chunk_bytes;
        let stream_id = stream.id;

        self.emitter = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(timeslice);
            // First tick fires immediately; skip it so chunks align with
            // timeslice boundaries.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let payload = vec![0xA5u8; chunk_bytes];
                        if event_tx.send(CaptureEvent::Chunk(payload)).await.is_err() {
                            break;
                        }
                    }
                    changed = halt_rx.changed() => {
                        if changed.is_err() || *halt_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            let _ = event_tx.send(CaptureEvent::Stopped).await;
            info!("Synthetic capture stream {} stopped", stream_id);
        }));

        Ok(event_rx)
    }

    async fn halt(&mut self) -> Result<()> {
        if let Some(halt_tx) = &self.halt_tx {
            let _ = halt_tx.send(true);
        }
        Ok(())
    }

    async fn release_tracks(&mut self, stream: &StreamHandle) -> Result<()> {
        if self.active_stream == Some(*stream) {
            self.active_stream = None;
        }
        if let Some(emitter) = self.emitter.take() {
            // Emitter exits on its own after the halt signal; just detach if
            // it is already done.
            if emitter.is_finished() {
                let _ = emitter.await;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_chunks_until_halted() -> Result<()> {
        let mut capture = SyntheticCapture::new(64);
        let stream = capture
            .request_stream(&CaptureConstraints::default())
            .await?;
        let mut rx = capture
            .start_emission(&stream, None, Duration::from_millis(100))
            .await?;

        for _ in 0..3 {
            match rx.recv().await {
                Some(CaptureEvent::Chunk(data)) => assert_eq!(data.len(), 64),
                other => panic!("Expected chunk, got {:?}", other),
            }
        }

        capture.halt().await?;

        // Drain until the stop confirmation; a chunk may race the halt.
        loop {
            match rx.recv().await {
                Some(CaptureEvent::Stopped) => break,
                Some(CaptureEvent::Chunk(_)) => continue,
                other => panic!("Expected stop confirmation, got {:?}", other),
            }
        }

        capture.release_tracks(&stream).await?;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_empty_constraints() {
        let mut capture = SyntheticCapture::default();
        let constraints = CaptureConstraints {
            audio: false,
            video: false,
        };
        assert!(capture.request_stream(&constraints).await.is_err());
    }
}
