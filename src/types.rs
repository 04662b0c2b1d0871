//! Types shared by the capture client and the ingestion server

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container MIME type of every recording and stored file
pub const VIDEO_MIME_TYPE: &str = "video/webm";

/// File extension matching [`VIDEO_MIME_TYPE`]
pub const VIDEO_EXTENSION: &str = "webm";

/// MIME type of the separate audio part sent in dual-stream mode
pub const AUDIO_MIME_TYPE: &str = "audio/wav";

pub const AUDIO_EXTENSION: &str = "wav";

/// Client platform tag sent in the `nav` form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientPlatform {
    Firefox,
    Chrome,
}

impl ClientPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientPlatform::Firefox => "firefox",
            ClientPlatform::Chrome => "chrome",
        }
    }

    pub fn capture_mode(&self) -> CaptureMode {
        match self {
            ClientPlatform::Firefox => CaptureMode::Single,
            ClientPlatform::Chrome => CaptureMode::Dual,
        }
    }
}

impl fmt::Display for ClientPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firefox" => Ok(ClientPlatform::Firefox),
            "chrome" => Ok(ClientPlatform::Chrome),
            other => Err(format!("unknown client platform '{}'", other)),
        }
    }
}

/// How audio and video reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// One already-muxed container
    Single,
    /// Separate video and audio blobs, muxed server-side
    Dual,
}

impl CaptureMode {
    pub fn platform(&self) -> ClientPlatform {
        match self {
            CaptureMode::Single => ClientPlatform::Firefox,
            CaptureMode::Dual => ClientPlatform::Chrome,
        }
    }
}

/// Metadata of a stored recording, handed to the platform after ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Size of the encoded file in bytes
    pub size: u64,
    /// Human readable name, kept exactly as submitted
    pub name: String,
    /// Storage-relative path, e.g. `WORKSPACE_42/<uuid>.webm`
    pub hash_name: String,
    pub mime_type: String,
}

/// Body of every upload response
///
/// Either a descriptor and no errors, or no descriptor and at least one error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub descriptor: Option<FileDescriptor>,
    pub errors: Vec<String>,
}

impl IngestResponse {
    pub fn success(descriptor: FileDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            descriptor: None,
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.descriptor.is_some() && self.errors.is_empty()
    }
}
