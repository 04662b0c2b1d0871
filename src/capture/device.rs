use bytes::Bytes;
use futures::channel::oneshot;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::{CaptureMode, VIDEO_MIME_TYPE};

/// Which devices to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Media recorder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub audio_bits_per_second: u32,
    pub video_bits_per_second: u32,
    /// Length of each collected data slice
    pub timeslice: std::time::Duration,
    /// Single: one muxed stream. Dual: video and audio recorded separately.
    pub mode: CaptureMode,
}

impl RecorderOptions {
    pub fn new(timeslice: std::time::Duration, mode: CaptureMode) -> Self {
        Self {
            mime_type: VIDEO_MIME_TYPE.to_string(),
            audio_bits_per_second: 128_000,
            video_bits_per_second: 1_024_000,
            timeslice,
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One data slice emitted by a recorder
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// `Video` for muxed single-stream data
    pub kind: TrackKind,
    pub data: Bytes,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceAccessError {
    #[error("media capture is not supported on this device")]
    Unsupported,

    #[error("access to camera or microphone was denied: {0}")]
    PermissionDenied(String),

    #[error("unable to create the media recorder: {0}")]
    Recorder(String),
}

/// A live camera+microphone stream
pub trait MediaStream: Send {
    /// Start recording; slices arrive on the returned channel, which closes
    /// once the recorder has stopped and flushed
    fn record(
        &mut self,
        options: &RecorderOptions,
    ) -> Result<mpsc::Receiver<MediaChunk>, DeviceAccessError>;

    /// Stop the recorder (tracks stay live)
    fn stop_recording(&mut self);

    /// Raw microphone buffers for level metering, if the stream has audio
    fn audio_samples(&mut self) -> Option<mpsc::Receiver<Vec<f32>>>;

    /// Stop every audio and video track
    fn stop_tracks(&mut self);

    /// Number of tracks still live
    fn live_tracks(&self) -> usize;
}

/// Promise-style device access
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceAccessError>;
}

pub type StreamCallback = Box<dyn FnOnce(Box<dyn MediaStream>) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(DeviceAccessError) + Send>;

/// Callback-style device access of older platforms
pub trait LegacyUserMedia: Send + Sync {
    fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
        on_success: StreamCallback,
        on_error: ErrorCallback,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCapability {
    MediaDevices,
    Legacy,
    Unsupported,
}

#[derive(Clone)]
enum Backend {
    Modern(Arc<dyn MediaDevices>),
    Legacy(Arc<dyn LegacyUserMedia>),
    Unsupported,
}

/// Uniform device access, selected once from what the platform offers
#[derive(Clone)]
pub struct DeviceAccess {
    backend: Backend,
}

impl DeviceAccess {
    /// Prefer the promise-style API, fall back to the legacy one
    pub fn select(
        modern: Option<Arc<dyn MediaDevices>>,
        legacy: Option<Arc<dyn LegacyUserMedia>>,
    ) -> Self {
        let backend = match (modern, legacy) {
            (Some(devices), _) => Backend::Modern(devices),
            (None, Some(legacy)) => Backend::Legacy(legacy),
            (None, None) => Backend::Unsupported,
        };
        let access = Self { backend };
        info!("Device access selected: {:?}", access.capability());
        access
    }

    pub fn capability(&self) -> DeviceCapability {
        match self.backend {
            Backend::Modern(_) => DeviceCapability::MediaDevices,
            Backend::Legacy(_) => DeviceCapability::Legacy,
            Backend::Unsupported => DeviceCapability::Unsupported,
        }
    }

    /// Platforms with the modern API record one muxed stream
    pub fn capture_mode(&self) -> CaptureMode {
        match self.backend {
            Backend::Legacy(_) => CaptureMode::Dual,
            Backend::Modern(_) | Backend::Unsupported => CaptureMode::Single,
        }
    }

    pub async fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceAccessError> {
        match &self.backend {
            Backend::Modern(devices) => devices.get_user_media(constraints).await,
            Backend::Legacy(legacy) => legacy_user_media(legacy.as_ref(), constraints).await,
            Backend::Unsupported => Err(DeviceAccessError::Unsupported),
        }
    }
}

/// Wrap the callback API into a future
async fn legacy_user_media(
    legacy: &dyn LegacyUserMedia,
    constraints: &CaptureConstraints,
) -> Result<Box<dyn MediaStream>, DeviceAccessError> {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let on_error_tx = Arc::clone(&tx);

    legacy.get_user_media(
        constraints,
        Box::new(move |stream| {
            if let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(Ok(stream));
            }
        }),
        Box::new(move |error| {
            if let Some(tx) = on_error_tx.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(Err(error));
            }
        }),
    );

    match rx.await {
        Ok(result) => result,
        Err(_) => {
            warn!("Legacy device request dropped both callbacks");
            Err(DeviceAccessError::PermissionDenied(
                "the device request was abandoned".to_string(),
            ))
        }
    }
}
