use bytes::Bytes;

use crate::types::{CaptureMode, ClientPlatform};

/// One binary part of an upload
#[derive(Debug, Clone)]
pub struct UploadedPart {
    /// File name announced by the client, if any
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedPart {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Name, announced MIME type and size, for logs
    pub fn describe(&self) -> String {
        format!(
            "{} ({}, {} bytes)",
            self.file_name.as_deref().unwrap_or("unnamed part"),
            self.content_type.as_deref().unwrap_or("no content type"),
            self.len()
        )
    }
}

/// Raw upload fields as received, before validation
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// `nav` form field
    pub platform: Option<String>,
    /// `fileName` form field
    pub display_name: Option<String>,
    pub video: Option<UploadedPart>,
    pub audio: Option<UploadedPart>,
}

/// Uploaded parts, shaped by capture mode
#[derive(Debug, Clone)]
pub enum UploadParts {
    Single {
        video: UploadedPart,
    },
    Dual {
        video: UploadedPart,
        audio: UploadedPart,
    },
}

impl UploadParts {
    pub fn mode(&self) -> CaptureMode {
        match self {
            UploadParts::Single { .. } => CaptureMode::Single,
            UploadParts::Dual { .. } => CaptureMode::Dual,
        }
    }
}

/// An upload that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub display_name: String,
    pub parts: UploadParts,
}

impl UploadRequest {
    /// Check mandatory fields; every problem found is reported
    pub fn validate(self) -> Result<ValidatedUpload, Vec<String>> {
        let mut errors = Vec::new();

        let platform = match self.platform.as_deref() {
            None | Some("") => {
                errors.push("the client platform (nav) is missing.".to_string());
                None
            }
            Some(tag) => match tag.parse::<ClientPlatform>() {
                Ok(platform) => Some(platform),
                Err(e) => {
                    errors.push(format!("{}.", e));
                    None
                }
            },
        };

        let display_name = match self.display_name {
            Some(name) if !name.is_empty() => Some(name),
            _ => {
                errors.push("the file name (fileName) is missing.".to_string());
                None
            }
        };

        let video = match self.video {
            Some(part) if !part.is_empty() => Some(part),
            Some(_) => {
                errors.push("the video part is empty.".to_string());
                None
            }
            None => {
                errors.push("the video part is missing.".to_string());
                None
            }
        };

        let needs_audio = platform.map(|p| p.capture_mode() == CaptureMode::Dual);
        let audio = match (needs_audio, self.audio) {
            (Some(true), Some(part)) if !part.is_empty() => Some(part),
            (Some(true), Some(_)) => {
                errors.push("the audio part is empty.".to_string());
                None
            }
            (Some(true), None) => {
                errors.push("the audio part is missing.".to_string());
                None
            }
            // single-stream uploads carry audio inside the video container
            (_, _) => None,
        };

        match (platform, display_name, video) {
            (Some(platform), Some(display_name), Some(video)) if errors.is_empty() => {
                let parts = match (platform.capture_mode(), audio) {
                    (CaptureMode::Dual, Some(audio)) => UploadParts::Dual { video, audio },
                    _ => UploadParts::Single { video },
                };
                Ok(ValidatedUpload {
                    display_name,
                    parts,
                })
            }
            _ => Err(errors),
        }
    }
}
