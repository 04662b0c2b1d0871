//! Client side of the upload: packages a finished recording into one
//! multipart request and reflects the outcome in the recorder view

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::capture::{CaptureController, Controls, RecorderView, Recording};
use crate::messages::{self, Messages};
use crate::types::{
    FileDescriptor, IngestResponse, AUDIO_EXTENSION, AUDIO_MIME_TYPE, VIDEO_EXTENSION,
    VIDEO_MIME_TYPE,
};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("there is no finished recording to upload")]
    NoRecording,

    #[error("the resource name is blank")]
    BlankName,
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The resource was created; the server may answer with an empty body
    Created(Option<FileDescriptor>),
    /// The server refused the request fields; the recording is kept
    Rejected(Vec<String>),
    /// The server failed while processing; the recording can be saved locally
    ServerError,
    /// Any other status or a network failure
    TransportError(String),
}

/// Spaces are not allowed in resource names; they become underscores
pub fn normalize_display_name(raw: &str) -> String {
    raw.replace(' ', "_")
}

pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
    view: Arc<dyn RecorderView>,
    messages: Arc<Messages>,
}

impl UploadClient {
    pub fn new(
        endpoint: impl Into<String>,
        view: Arc<dyn RecorderView>,
        messages: Arc<Messages>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            view,
            messages,
        }
    }

    /// Send the controller's finished recording under `display_name`
    ///
    /// Errors only when there is nothing valid to send; every server or
    /// network result is reported through [`UploadOutcome`].
    pub async fn submit(
        &self,
        controller: &mut CaptureController,
        display_name: &str,
    ) -> Result<UploadOutcome, UploadError> {
        let display_name = normalize_display_name(display_name);
        if display_name.trim_matches('_').is_empty() {
            self.view.show_error(self.messages.trans(messages::NAME_PLACEHOLDER), false);
            return Err(UploadError::BlankName);
        }
        let recording = controller.recording().ok_or(UploadError::NoRecording)?;

        self.view.set_controls(Controls::LOCKED);
        self.view.show_progress(self.messages.trans(messages::CREATING_RESOURCE));

        let form = match build_form(recording, &display_name) {
            Ok(form) => form,
            Err(e) => return Ok(self.transport_failure(e.to_string())),
        };

        info!(
            "Uploading '{}' ({:?}, {} bytes) to {}",
            display_name,
            recording.mode,
            recording.video.len(),
            self.endpoint
        );

        let response = match self.http.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => return Ok(self.transport_failure(e.to_string())),
        };

        match response.status() {
            StatusCode::OK => {
                // a 200 means the resource exists even if its body is unreadable
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Failed to read upload response body: {}", e);
                        Default::default()
                    }
                };
                let parsed = serde_json::from_slice::<IngestResponse>(&body).ok();
                match parsed {
                    Some(reply) if !reply.errors.is_empty() => {
                        warn!("Upload rejected: {:?}", reply.errors);
                        self.view.hide_progress();
                        self.view.set_controls(Controls::READY);
                        self.view.show_error(&reply.errors[0], false);
                        Ok(UploadOutcome::Rejected(reply.errors))
                    }
                    reply => {
                        info!("Upload complete");
                        controller.reset();
                        self.view.reload();
                        Ok(UploadOutcome::Created(reply.and_then(|r| r.descriptor)))
                    }
                }
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Upload failed on the server");
                self.view.hide_progress();
                self.view
                    .show_error(self.messages.trans(messages::RESOURCE_CREATION_ERROR), true);
                Ok(UploadOutcome::ServerError)
            }
            status => Ok(self.transport_failure(format!("unexpected status {}", status))),
        }
    }

    /// Local save offered after a server failure
    pub async fn download(
        &self,
        controller: &CaptureController,
        dir: &Path,
        display_name: &str,
    ) -> Result<PathBuf> {
        controller
            .download(dir, &normalize_display_name(display_name))
            .await
    }

    fn transport_failure(&self, reason: String) -> UploadOutcome {
        error!("Upload transport failure: {}", reason);
        self.view.hide_progress();
        self.view
            .show_error(self.messages.trans(messages::RESOURCE_TRANSPORT_ERROR), false);
        UploadOutcome::TransportError(reason)
    }
}

fn build_form(recording: &Recording, display_name: &str) -> reqwest::Result<Form> {
    let mut form = Form::new()
        .text("nav", recording.mode.platform().as_str())
        .text("fileName", display_name.to_string())
        .part(
            "video",
            Part::bytes(recording.video.to_vec())
                .file_name(format!("blob.{}", VIDEO_EXTENSION))
                .mime_str(VIDEO_MIME_TYPE)?,
        );
    if let Some(audio) = &recording.audio {
        form = form.part(
            "audio",
            Part::bytes(audio.to_vec())
                .file_name(format!("blob.{}", AUDIO_EXTENSION))
                .mime_str(AUDIO_MIME_TYPE)?,
        );
    }
    Ok(form)
}
