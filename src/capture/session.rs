use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::device::{MediaChunk, MediaStream, TrackKind};
use super::meter::VolumeMeter;
use crate::types::{CaptureMode, VIDEO_EXTENSION, VIDEO_MIME_TYPE};

/// How long `finish` waits for the recorder to flush after being stopped
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Chunks collected so far, in arrival order per track
#[derive(Debug, Default, Clone)]
pub struct ChunkSet {
    pub video: Vec<Bytes>,
    pub audio: Vec<Bytes>,
}

impl ChunkSet {
    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, chunk: MediaChunk) {
        match chunk.kind {
            TrackKind::Video => self.video.push(chunk.data),
            TrackKind::Audio => self.audio.push(chunk.data),
        }
    }
}

/// One live recording: device stream, collected chunks and level meter
pub struct RecordingSession {
    stream: Box<dyn MediaStream>,
    chunks: Arc<Mutex<ChunkSet>>,
    collector: Option<JoinHandle<()>>,
    meter: Option<VolumeMeter>,
    started_at: Instant,
}

impl RecordingSession {
    /// Begin collecting every non-empty slice from `slices`
    pub fn start(
        stream: Box<dyn MediaStream>,
        mut slices: mpsc::Receiver<MediaChunk>,
        meter: Option<VolumeMeter>,
    ) -> Self {
        let chunks = Arc::new(Mutex::new(ChunkSet::default()));
        let sink = Arc::clone(&chunks);

        let collector = tokio::spawn(async move {
            while let Some(chunk) = slices.recv().await {
                if chunk.data.is_empty() {
                    continue;
                }
                sink.lock().await.push(chunk);
            }
        });

        Self {
            stream,
            chunks,
            collector: Some(collector),
            meter,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub async fn chunk_count(&self) -> usize {
        self.chunks.lock().await.len()
    }

    pub fn has_pending_frames(&self) -> bool {
        self.meter.as_ref().is_some_and(|m| m.is_running())
    }

    pub fn meter(&self) -> Option<&VolumeMeter> {
        self.meter.as_ref()
    }

    pub fn live_tracks(&self) -> usize {
        self.stream.live_tracks()
    }

    /// Stop the recorder, wait for its last slice and hand over the chunks
    ///
    /// Device tracks stay live until [`RecordingSession::release`].
    pub async fn finish(&mut self) -> ChunkSet {
        self.stream.stop_recording();

        // the handle stays in place until drained so a dropped `finish` can be retried
        if let Some(collector) = self.collector.as_mut() {
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut *collector).await {
                Ok(Err(e)) => warn!("Chunk collector failed: {}", e),
                Err(_) => {
                    warn!("Recorder did not flush within {:?}", DRAIN_TIMEOUT);
                    collector.abort();
                }
                Ok(Ok(())) => {}
            }
            self.collector = None;
        }

        if let Some(mut meter) = self.meter.take() {
            meter.stop();
        }

        std::mem::take(&mut *self.chunks.lock().await)
    }

    /// Release the devices and drop everything collected
    pub fn release(&mut self) {
        if let Some(mut meter) = self.meter.take() {
            meter.stop();
        }
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        self.stream.stop_recording();
        self.stream.stop_tracks();
        if let Ok(mut chunks) = self.chunks.try_lock() {
            *chunks = ChunkSet::default();
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// A finished recording, ready for preview, upload or download
#[derive(Debug, Clone)]
pub struct Recording {
    pub mode: CaptureMode,
    /// All video (or muxed) chunks concatenated into one container
    pub video: Bytes,
    /// Separately recorded audio, dual-stream mode only
    pub audio: Option<Bytes>,
    pub duration: Duration,
}

impl Recording {
    pub fn from_chunks(mode: CaptureMode, chunks: ChunkSet, duration: Duration) -> Self {
        let audio = match mode {
            CaptureMode::Dual => Some(concat(&chunks.audio)),
            CaptureMode::Single => None,
        };
        Self {
            mode,
            video: concat(&chunks.video),
            audio,
            duration,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        VIDEO_MIME_TYPE
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty()
    }

    /// Save the video locally as `<display_name>.webm`
    pub async fn save(&self, dir: &Path, display_name: &str) -> Result<PathBuf> {
        let safe_name = display_name.replace(['/', '\\'], "_");
        let path = dir.join(format!("{}.{}", safe_name, VIDEO_EXTENSION));
        tokio::fs::write(&path, &self.video)
            .await
            .with_context(|| format!("Failed to save recording to {}", path.display()))?;
        info!("Recording saved to {}", path.display());
        Ok(path)
    }
}

fn concat(parts: &[Bytes]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
    for part in parts {
        buffer.extend_from_slice(part);
    }
    buffer.freeze()
}
