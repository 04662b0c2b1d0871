// Shared fakes for integration tests: devices, streams, view and encoders.

#![allow(dead_code)]

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use webcam_recorder::capture::{
    CaptureConfig, CaptureConstraints, CaptureController, Controls, DeviceAccess,
    DeviceAccessError, ErrorCallback, LegacyUserMedia, MediaChunk, MediaDevices, MediaStream,
    Preview, RecorderOptions, RecorderView, StreamCallback, TrackKind,
};
use webcam_recorder::ingest::{CommandEncoder, EncodeError, EncodeJob, Encoder, EncoderProfile};
use webcam_recorder::Messages;

// ============================================================================
// Devices
// ============================================================================

#[derive(Default)]
struct StreamInner {
    slices: Option<mpsc::Sender<MediaChunk>>,
    samples: Option<mpsc::Sender<Vec<f32>>>,
    final_slice: Option<MediaChunk>,
    live_tracks: usize,
    recorder_fails: bool,
    options: Option<RecorderOptions>,
}

/// Test-side handle on the fake stream handed out by the fake devices
#[derive(Clone, Default)]
pub struct StreamControl {
    inner: Arc<Mutex<StreamInner>>,
}

impl StreamControl {
    /// Emit one recorder slice; false if the recorder is not running
    pub fn push(&self, kind: TrackKind, data: &[u8]) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.slices {
            Some(tx) => tx
                .try_send(MediaChunk {
                    kind,
                    data: Bytes::copy_from_slice(data),
                })
                .is_ok(),
            None => false,
        }
    }

    pub fn push_samples(&self, samples: Vec<f32>) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.samples {
            Some(tx) => tx.try_send(samples).is_ok(),
            None => false,
        }
    }

    /// Slice the recorder flushes when it is stopped
    pub fn flush_on_stop(&self, kind: TrackKind, data: &[u8]) {
        self.inner.lock().unwrap().final_slice = Some(MediaChunk {
            kind,
            data: Bytes::copy_from_slice(data),
        });
    }

    pub fn fail_recorder(&self) {
        self.inner.lock().unwrap().recorder_fails = true;
    }

    pub fn live_tracks(&self) -> usize {
        self.inner.lock().unwrap().live_tracks
    }

    pub fn is_recording(&self) -> bool {
        self.inner.lock().unwrap().slices.is_some()
    }

    pub fn options(&self) -> Option<RecorderOptions> {
        self.inner.lock().unwrap().options.clone()
    }

    fn grant(&self) -> Box<dyn MediaStream> {
        self.inner.lock().unwrap().live_tracks = 2;
        Box::new(FakeStream {
            inner: Arc::clone(&self.inner),
        })
    }
}

struct FakeStream {
    inner: Arc<Mutex<StreamInner>>,
}

impl MediaStream for FakeStream {
    fn record(
        &mut self,
        options: &RecorderOptions,
    ) -> Result<mpsc::Receiver<MediaChunk>, DeviceAccessError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.recorder_fails {
            return Err(DeviceAccessError::Recorder("unsupported mime type".to_string()));
        }
        let (tx, rx) = mpsc::channel(256);
        inner.slices = Some(tx);
        inner.options = Some(options.clone());
        Ok(rx)
    }

    fn stop_recording(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(tx) = inner.slices.take() {
            if let Some(last) = inner.final_slice.take() {
                let _ = tx.try_send(last);
            }
        }
    }

    fn audio_samples(&mut self) -> Option<mpsc::Receiver<Vec<f32>>> {
        let (tx, rx) = mpsc::channel(64);
        self.inner.lock().unwrap().samples = Some(tx);
        Some(rx)
    }

    fn stop_tracks(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.live_tracks = 0;
        inner.samples = None;
    }

    fn live_tracks(&self) -> usize {
        self.inner.lock().unwrap().live_tracks
    }
}

pub enum Grant {
    Allow(StreamControl),
    Deny,
}

/// Promise-style devices
pub struct FakeDevices {
    grant: Grant,
}

#[async_trait::async_trait]
impl MediaDevices for FakeDevices {
    async fn get_user_media(
        &self,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceAccessError> {
        match &self.grant {
            Grant::Allow(control) => Ok(control.grant()),
            Grant::Deny => Err(DeviceAccessError::PermissionDenied(
                "NotAllowedError".to_string(),
            )),
        }
    }
}

/// Callback-style devices
pub struct FakeLegacy {
    grant: Grant,
}

impl LegacyUserMedia for FakeLegacy {
    fn get_user_media(
        &self,
        _constraints: &CaptureConstraints,
        on_success: StreamCallback,
        on_error: ErrorCallback,
    ) {
        match &self.grant {
            Grant::Allow(control) => on_success(control.grant()),
            Grant::Deny => on_error(DeviceAccessError::PermissionDenied(
                "PermissionDeniedError".to_string(),
            )),
        }
    }
}

pub fn modern_devices() -> (DeviceAccess, StreamControl) {
    let control = StreamControl::default();
    let devices = FakeDevices {
        grant: Grant::Allow(control.clone()),
    };
    (DeviceAccess::select(Some(Arc::new(devices)), None), control)
}

pub fn legacy_devices() -> (DeviceAccess, StreamControl) {
    let control = StreamControl::default();
    let legacy = FakeLegacy {
        grant: Grant::Allow(control.clone()),
    };
    (DeviceAccess::select(None, Some(Arc::new(legacy))), control)
}

pub fn denying_devices() -> DeviceAccess {
    DeviceAccess::select(Some(Arc::new(FakeDevices { grant: Grant::Deny })), None)
}

pub fn denying_legacy_devices() -> DeviceAccess {
    DeviceAccess::select(None, Some(Arc::new(FakeLegacy { grant: Grant::Deny })))
}

// ============================================================================
// View
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Controls(Controls),
    Preview(&'static str),
    LevelCleared,
    Progress(String),
    ProgressHidden,
    Error { message: String, can_download: bool },
    Reload,
}

/// Records everything the recorder asks the UI to do
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    frames: AtomicUsize,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn last_controls(&self) -> Option<Controls> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Controls(c) => Some(c),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Error {
                    message,
                    can_download,
                } => Some((message, can_download)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecorderView for RecordingView {
    fn set_controls(&self, controls: Controls) {
        self.push(ViewEvent::Controls(controls));
    }

    fn show_preview(&self, preview: Preview) {
        let kind = match preview {
            Preview::Live => "live",
            Preview::Paused => "paused",
            Preview::Playback(_) => "playback",
            Preview::Cleared => "cleared",
        };
        self.push(ViewEvent::Preview(kind));
    }

    fn render_level(&self, _level: f32) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_level(&self) {
        self.push(ViewEvent::LevelCleared);
    }

    fn show_progress(&self, message: &str) {
        self.push(ViewEvent::Progress(message.to_string()));
    }

    fn hide_progress(&self) {
        self.push(ViewEvent::ProgressHidden);
    }

    fn show_error(&self, message: &str, can_download: bool) {
        self.push(ViewEvent::Error {
            message: message.to_string(),
            can_download,
        });
    }

    fn reload(&self) {
        self.push(ViewEvent::Reload);
    }
}

pub fn controller(
    devices: DeviceAccess,
    config: CaptureConfig,
) -> (CaptureController, Arc<RecordingView>) {
    let view = Arc::new(RecordingView::default());
    let controller = CaptureController::new(
        devices,
        view.clone(),
        Arc::new(Messages::default()),
        config,
    );
    (controller, view)
}

// ============================================================================
// Encoders
// ============================================================================

/// Stands in for avconv: re-encode copies, mux concatenates video then audio
#[derive(Default)]
pub struct CopyEncoder {
    jobs: Mutex<Vec<EncodeJob>>,
}

impl CopyEncoder {
    pub fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Encoder for CopyEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<(), EncodeError> {
        self.jobs.lock().unwrap().push(job.clone());
        let data = match job {
            EncodeJob::Reencode { input, .. } => tokio::fs::read(input).await,
            EncodeJob::Mux { audio, video, .. } => {
                let mut data = tokio::fs::read(video).await.unwrap_or_default();
                data.extend(tokio::fs::read(audio).await.unwrap_or_default());
                Ok(data)
            }
        }
        .map_err(|source| EncodeError::Spawn {
            command: "copy".to_string(),
            source,
        })?;
        tokio::fs::write(job.output(), data)
            .await
            .map_err(|source| EncodeError::Spawn {
                command: "copy".to_string(),
                source,
            })
    }

    fn name(&self) -> &str {
        "copy"
    }
}

/// Fails the first `failures` jobs with exit code 1, then behaves like [`CopyEncoder`]
///
/// Failed jobs leave a partial output file behind, like a crashed encoder.
pub struct FlakyEncoder {
    failures: AtomicUsize,
    commands: Mutex<Vec<String>>,
    reporter: CommandEncoder,
    copy: CopyEncoder,
}

impl FlakyEncoder {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            commands: Mutex::new(Vec::new()),
            reporter: CommandEncoder::new("avconv", EncoderProfile::default()),
            copy: CopyEncoder::default(),
        }
    }

    /// Command lines of the failed invocations
    pub fn failed_commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Encoder for FlakyEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<(), EncodeError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining == 0 {
            return self.copy.encode(job).await;
        }
        self.failures.store(remaining - 1, Ordering::SeqCst);

        let _ = tokio::fs::write(job.output(), b"partial").await;
        let command = self.reporter.command_line(job);
        self.commands.lock().unwrap().push(command.clone());
        Err(EncodeError::Failed { command, code: 1 })
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Regular files below `dir` (recursively); empty if `dir` does not exist
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_in(&path));
        } else {
            files.push(path);
        }
    }
    files
}
