pub mod capture;
pub mod config;
pub mod http;
pub mod ingest;
pub mod messages;
pub mod types;
pub mod upload;

pub use capture::{
    CaptureConfig, CaptureController, CaptureError, CaptureState, DeviceAccess, DeviceAccessError,
    MediaStream, Recording, RecorderView,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use ingest::{CommandEncoder, Encoder, IngestError, IngestionHandler, Owner, StorageLayout};
pub use messages::Messages;
pub use types::{CaptureMode, ClientPlatform, FileDescriptor, IngestResponse};
pub use upload::{UploadClient, UploadOutcome};
