//! Camera/microphone capture
//!
//! The recorder form's logic, independent of the platform that hosts it:
//! - `device`: capability-selected device access and the stream/recorder seam
//! - `controller`: the Idle → Requesting → Recording → Stopping → Ready lifecycle
//! - `session`: chunk collection for one recording and the finished `Recording`
//! - `meter`: input level metering rendered once per frame
//! - `view`: the UI surface the controller drives

mod controller;
mod device;
mod meter;
mod session;
mod view;

pub use controller::{CaptureConfig, CaptureController, CaptureError, CaptureState};
pub use device::{
    CaptureConstraints, DeviceAccess, DeviceAccessError, DeviceCapability, ErrorCallback,
    LegacyUserMedia, MediaChunk, MediaDevices, MediaStream, RecorderOptions, StreamCallback,
    TrackKind,
};
pub use meter::{LevelMeter, VolumeMeter, FRAME_INTERVAL};
pub use session::{ChunkSet, Recording, RecordingSession};
pub use view::{Controls, Preview, RecorderView};
