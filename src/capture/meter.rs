use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::view::RecorderView;

/// Display refresh period of the level bar
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// The rendered bar overshoots the raw level so normal speech fills most of it
const BAR_GAIN: f32 = 1.4;

/// Smoothed RMS level of a live audio input, with clip detection
#[derive(Debug, Clone)]
pub struct LevelMeter {
    volume: f32,
    clip_level: f32,
    averaging: f32,
    clip_lag: Duration,
    clipping: bool,
    last_clip: Option<Instant>,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(0.98, 0.95, Duration::from_millis(750))
    }
}

impl LevelMeter {
    pub fn new(clip_level: f32, averaging: f32, clip_lag: Duration) -> Self {
        Self {
            volume: 0.0,
            clip_level,
            averaging,
            clip_lag,
            clipping: false,
            last_clip: None,
        }
    }

    /// Fold one buffer of samples (-1.0..=1.0) into the level
    pub fn process(&mut self, samples: &[f32], now: Instant) {
        if samples.is_empty() {
            return;
        }

        let mut sum = 0.0f32;
        for &sample in samples {
            if sample.abs() >= self.clip_level {
                self.clipping = true;
                self.last_clip = Some(now);
            }
            sum += sample * sample;
        }

        let rms = (sum / samples.len() as f32).sqrt();
        // fast attack, slow decay
        self.volume = rms.max(self.volume * self.averaging);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Whether the input clipped within the last `clip_lag`
    pub fn is_clipping(&mut self, now: Instant) -> bool {
        if !self.clipping {
            return false;
        }
        match self.last_clip {
            Some(at) if at + self.clip_lag < now => {
                self.clipping = false;
                false
            }
            _ => true,
        }
    }

    /// Width of the level bar on a canvas of `canvas_width`
    pub fn bar_width(&self, canvas_width: f32) -> f32 {
        (self.volume * canvas_width * BAR_GAIN).min(canvas_width)
    }
}

/// Feeds a [`LevelMeter`] from live audio and renders it once per frame
///
/// Both tasks are aborted by [`VolumeMeter::stop`] or on drop.
pub struct VolumeMeter {
    level: Arc<Mutex<LevelMeter>>,
    frames: Arc<AtomicU64>,
    analyser: Option<JoinHandle<()>>,
    render: Option<JoinHandle<()>>,
    view: Arc<dyn RecorderView>,
}

impl VolumeMeter {
    pub fn start(
        mut samples: mpsc::Receiver<Vec<f32>>,
        view: Arc<dyn RecorderView>,
        frame_interval: Duration,
    ) -> Self {
        let level = Arc::new(Mutex::new(LevelMeter::default()));
        let frames = Arc::new(AtomicU64::new(0));

        let analyser_level = Arc::clone(&level);
        let analyser = tokio::spawn(async move {
            while let Some(buffer) = samples.recv().await {
                if let Ok(mut meter) = analyser_level.lock() {
                    meter.process(&buffer, Instant::now());
                }
            }
            debug!("Audio level input closed");
        });

        let render_level = Arc::clone(&level);
        let render_frames = Arc::clone(&frames);
        let render_view = Arc::clone(&view);
        let render = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let volume = match render_level.lock() {
                    Ok(meter) => meter.volume(),
                    Err(_) => break,
                };
                render_view.render_level(volume);
                render_frames.fetch_add(1, Ordering::SeqCst);
            }
        });

        Self {
            level,
            frames,
            analyser: Some(analyser),
            render: Some(render),
            view,
        }
    }

    pub fn volume(&self) -> f32 {
        self.level.lock().map(|m| m.volume()).unwrap_or(0.0)
    }

    /// Frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Whether a frame callback is still scheduled
    pub fn is_running(&self) -> bool {
        self.render.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel pending frames and clear the bar
    pub fn stop(&mut self) {
        let was_running = self.render.is_some();
        if let Some(handle) = self.render.take() {
            handle.abort();
        }
        if let Some(handle) = self.analyser.take() {
            handle.abort();
        }
        if was_running {
            self.view.clear_level();
        }
    }
}

impl Drop for VolumeMeter {
    fn drop(&mut self) {
        self.stop();
    }
}
