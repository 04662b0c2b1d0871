use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::device::{CaptureConstraints, DeviceAccess, DeviceAccessError, RecorderOptions};
use super::meter::{VolumeMeter, FRAME_INTERVAL};
use super::session::{Recording, RecordingSession};
use super::view::{Controls, Preview, RecorderView};
use crate::config::CaptureSettings;
use crate::messages::{self, Messages};
use crate::types::CaptureMode;

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Requesting,
    Recording,
    Stopping,
    Ready,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a recording is already in progress ({0:?})")]
    Busy(CaptureState),

    #[error("no recording to stop ({0:?})")]
    NotRecording(CaptureState),

    #[error("no finished recording")]
    NoRecording,

    #[error(transparent)]
    Device(#[from] DeviceAccessError),
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Wait between pausing the preview and stopping the recorder, so the
    /// last slice is not truncated
    pub settle_delay: Duration,
    pub timeslice: Duration,
    pub frame_interval: Duration,
    /// `None` for unlimited
    pub max_recording: Option<Duration>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1000),
            timeslice: Duration::from_millis(10),
            frame_interval: FRAME_INTERVAL,
            max_recording: None,
        }
    }
}

impl From<&CaptureSettings> for CaptureConfig {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            timeslice: Duration::from_millis(settings.timeslice_ms),
            frame_interval: FRAME_INTERVAL,
            max_recording: (settings.max_recording_secs > 0)
                .then(|| Duration::from_secs(settings.max_recording_secs)),
        }
    }
}

/// Drives device access, recording and preview for one recorder form
///
/// At most one recording session exists per controller.
pub struct CaptureController {
    devices: DeviceAccess,
    view: Arc<dyn RecorderView>,
    messages: Arc<Messages>,
    config: CaptureConfig,
    mode: CaptureMode,
    state: CaptureState,
    session: Option<RecordingSession>,
    recording: Option<Recording>,
}

impl CaptureController {
    pub fn new(
        devices: DeviceAccess,
        view: Arc<dyn RecorderView>,
        messages: Arc<Messages>,
        config: CaptureConfig,
    ) -> Self {
        let mode = devices.capture_mode();
        info!("Capture controller ready ({:?} stream)", mode);
        view.set_controls(Controls::IDLE);
        Self {
            devices,
            view,
            messages,
            config,
            mode,
            state: CaptureState::Idle,
            session: None,
            recording: None,
        }
    }

    /// Override the capture mode derived from the device capability
    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Whether a meter frame is still scheduled
    pub fn has_pending_frames(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(RecordingSession::has_pending_frames)
    }

    /// Device tracks still held by this controller
    pub fn live_tracks(&self) -> usize {
        self.session.as_ref().map_or(0, RecordingSession::live_tracks)
    }

    /// Request devices and start recording
    ///
    /// Only allowed from `Idle`, or from `Ready` which discards the previous
    /// recording first. `Requesting` at entry means an earlier `start` was
    /// dropped mid-request; it is treated like `Idle`.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        match self.state {
            CaptureState::Idle => {}
            CaptureState::Requesting => {
                warn!("Previous device request was abandoned");
                self.discard();
            }
            CaptureState::Ready => self.discard(),
            state => {
                warn!("Ignoring start while {:?}", state);
                return Err(CaptureError::Busy(state));
            }
        }

        self.state = CaptureState::Requesting;
        self.view.set_controls(Controls::RECORDING);

        let mut stream = match self
            .devices
            .get_user_media(&CaptureConstraints::default())
            .await
        {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        let options = RecorderOptions::new(self.config.timeslice, self.mode);
        let slices = match stream.record(&options) {
            Ok(slices) => slices,
            Err(e) => {
                stream.stop_tracks();
                return Err(self.fail(e));
            }
        };

        self.view.show_preview(Preview::Live);

        let meter = stream.audio_samples().map(|samples| {
            VolumeMeter::start(samples, Arc::clone(&self.view), self.config.frame_interval)
        });

        self.session = Some(RecordingSession::start(stream, slices, meter));
        self.state = CaptureState::Recording;
        info!("Recording started ({:?}, {:?} slices)", self.mode, options.timeslice);

        Ok(())
    }

    /// Stop recording and assemble the finished recording for preview
    ///
    /// Calling again while `Stopping` resumes a stop whose future was dropped.
    pub async fn stop(&mut self) -> Result<&Recording, CaptureError> {
        match self.state {
            CaptureState::Recording => {}
            CaptureState::Stopping => info!("Resuming an interrupted stop"),
            state => return Err(CaptureError::NotRecording(state)),
        }
        let Some(session) = self.session.as_mut() else {
            return Err(CaptureError::NotRecording(self.state));
        };

        self.state = CaptureState::Stopping;
        self.view.show_preview(Preview::Paused);

        tokio::time::sleep(self.config.settle_delay).await;

        let duration = session.elapsed();
        let chunks = session.finish().await;
        info!(
            "Recording stopped after {:.1}s ({} chunks)",
            duration.as_secs_f64(),
            chunks.len()
        );

        let recording = Recording::from_chunks(self.mode, chunks, duration);
        self.view.show_preview(Preview::Playback(recording.video.clone()));
        self.view.set_controls(Controls::READY);
        self.state = CaptureState::Ready;

        Ok(self.recording.insert(recording))
    }

    /// Time left before the maximum recording length is reached
    pub fn time_remaining(&self) -> Option<Duration> {
        let limit = self.config.max_recording?;
        let elapsed = match (&self.state, &self.session) {
            (CaptureState::Recording, Some(session)) => session.elapsed(),
            _ => Duration::ZERO,
        };
        Some(limit.saturating_sub(elapsed))
    }

    /// Stop the recording if the maximum length has been reached
    pub async fn enforce_limit(&mut self) -> Result<bool, CaptureError> {
        if self.state != CaptureState::Recording {
            return Ok(false);
        }
        match self.time_remaining() {
            Some(remaining) if remaining.is_zero() => {
                info!("Maximum recording time reached");
                self.stop().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Save the finished recording as `<display_name>.webm` in `dir`
    pub async fn download(&self, dir: &Path, display_name: &str) -> anyhow::Result<PathBuf> {
        let recording = self.recording.as_ref().ok_or(CaptureError::NoRecording)?;
        recording.save(dir, display_name).await
    }

    /// Release devices, cancel the meter and drop all recorded data
    pub fn reset(&mut self) {
        self.discard();
        self.state = CaptureState::Idle;
        self.view.clear_level();
        self.view.show_preview(Preview::Cleared);
        self.view.set_controls(Controls::IDLE);
    }

    fn discard(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            info!("Recording session released");
        }
        self.recording = None;
    }

    fn fail(&mut self, e: DeviceAccessError) -> CaptureError {
        error!("Capture failed: {}", e);
        let key = match e {
            DeviceAccessError::Unsupported => messages::DEVICE_UNSUPPORTED,
            DeviceAccessError::PermissionDenied(_) => messages::DEVICE_ACCESS_ERROR,
            DeviceAccessError::Recorder(_) => messages::RECORDER_ERROR,
        };
        self.state = CaptureState::Idle;
        self.view.set_controls(Controls::IDLE);
        self.view.show_error(self.messages.trans(key), false);
        CaptureError::Device(e)
    }
}
