use bytes::Bytes;

/// Enabled state of the recorder form controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub submit: bool,
}

impl Controls {
    pub const IDLE: Controls = Controls {
        start: true,
        stop: false,
        submit: false,
    };
    pub const RECORDING: Controls = Controls {
        start: false,
        stop: true,
        submit: false,
    };
    pub const READY: Controls = Controls {
        start: true,
        stop: false,
        submit: true,
    };
    pub const LOCKED: Controls = Controls {
        start: false,
        stop: false,
        submit: false,
    };
}

/// What the preview player shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Muted live camera feed
    Live,
    Paused,
    /// Playback of the finished recording, unmuted, with controls
    Playback(Bytes),
    Cleared,
}

/// The UI surface the recorder drives
///
/// Calls come from the controller's task and from the meter's frame task.
pub trait RecorderView: Send + Sync {
    fn set_controls(&self, controls: Controls);

    fn show_preview(&self, preview: Preview);

    /// Draw the input level bar (0.0..=1.0 before gain)
    fn render_level(&self, level: f32);

    fn clear_level(&self);

    fn show_progress(&self, message: &str);

    fn hide_progress(&self);

    /// Show an error; `can_download` also offers saving the recording locally
    fn show_error(&self, message: &str, can_download: bool);

    /// Full view refresh after a resource was created
    fn reload(&self);
}
