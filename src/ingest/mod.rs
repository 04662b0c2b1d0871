//! Server-side ingestion of recorded uploads
//!
//! - `request`: raw upload fields and their validation
//! - `storage`: workspace/user storage targets and hashed paths
//! - `encoder`: the external `avconv`/`ffmpeg` invocation
//! - `handler`: validate → stage → encode → persist → descriptor

mod encoder;
mod error;
mod handler;
mod request;
mod storage;

pub use encoder::{CommandEncoder, EncodeError, EncodeJob, Encoder, EncoderProfile};
pub use error::IngestError;
pub use handler::IngestionHandler;
pub use request::{UploadParts, UploadRequest, UploadedPart, ValidatedUpload};
pub use storage::{Owner, StorageLayout, StorageTarget};
