// CLI driver for the chunked upload pipeline
//
// Records from the synthetic capture source and uploads chunks to a real
// endpoint:
//
//   cargo run -- --base-url http://localhost:8080/api/interviews --duration 120

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use media_uplink::{
    ChunkedRecorder, Config, HttpTransport, MediaKind, RecorderHooks, SyntheticCapture,
};
use tokio::time::sleep;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "media-uplink")]
#[command(about = "Chunked media recording uploader")]
struct Args {
    /// Session identifier (defaults to a generated one)
    #[arg(short, long)]
    session: Option<String>,

    /// Media kind: audio or video
    #[arg(short, long, default_value = "audio")]
    kind: String,

    /// How long to record, in seconds
    #[arg(short, long, default_value = "60")]
    duration: u64,

    /// Base URL of the upload service
    #[arg(short, long, default_value = "http://localhost:8080/api/interviews")]
    base_url: String,

    /// Optional configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Chunk timeslice in milliseconds (overrides config)
    #[arg(short, long)]
    timeslice_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| format!("interview-{}", uuid::Uuid::new_v4()));

    let kind = match args.kind.as_str() {
        "video" => MediaKind::Video,
        _ => MediaKind::Audio,
    };

    let mut recorder_config = config.recorder_config(session_id.clone(), kind);
    if let Some(ms) = args.timeslice_ms {
        recorder_config.timeslice = Duration::from_millis(ms);
    }

    info!("Session: {}", session_id);
    info!("Uploading to {}", args.base_url);
    info!(
        "Timeslice: {:?}, max chunks: {}",
        recorder_config.timeslice, recorder_config.max_chunks
    );

    let transport = Arc::new(HttpTransport::new(&args.base_url)?);
    let hooks = RecorderHooks::default().on_chunk_uploaded(|event| {
        info!("Chunk {} acknowledged: {}", event.index, event.result);
    });

    let recorder = ChunkedRecorder::new(
        recorder_config,
        Box::new(SyntheticCapture::default()),
        transport.clone(),
        transport,
        hooks,
    )?;

    recorder.start().await?;
    info!("Recording for {} seconds...", args.duration);
    sleep(Duration::from_secs(args.duration)).await;

    let ack = recorder.stop(true).await?;

    let stats = recorder.stats();
    info!(
        "Done: {} dispatched, {} uploaded, {} failed, {} bytes",
        stats.chunks_dispatched, stats.chunks_uploaded, stats.chunks_failed, stats.bytes_uploaded
    );
    if let Some(ack) = ack {
        info!("Finalize acknowledgement: {}", ack);
    }

    Ok(())
}
