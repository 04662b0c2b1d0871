use super::state::{AppState, StoredResource};
use crate::ingest::{IngestError, Owner, UploadRequest, UploadedPart};
use crate::types::IngestResponse;
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{error, info, warn};

/// Header carrying the authenticated username, set by the platform front
pub const USERNAME_HEADER: &str = "x-username";

// ============================================================================
// Handlers
// ============================================================================

/// POST /video-recorder/upload
/// Store a recording in the uploading user's directory
pub async fn upload_user_recording(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    let username = headers
        .get(USERNAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match username {
        Some(name) => ingest(state, Owner::User(name.to_string()), multipart).await,
        None => {
            warn!("Upload rejected: no authenticated user");
            respond(Err(IngestError::Validation(vec![
                "no authenticated user.".to_string()
            ])))
        }
    }
}

/// POST /video-recorder/workspaces/:workspace_id/upload
/// Store a recording in a workspace directory
pub async fn upload_workspace_recording(
    State(state): State<AppState>,
    Path(workspace_id): Path<u64>,
    multipart: Multipart,
) -> impl IntoResponse {
    ingest(state, Owner::Workspace(workspace_id), multipart).await
}

/// GET /video-recorder/resources
/// List resources created so far
pub async fn list_resources(State(state): State<AppState>) -> impl IntoResponse {
    let resources: Vec<StoredResource> = state.resources.read().await.clone();
    (StatusCode::OK, Json(resources))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Helpers
// ============================================================================

async fn ingest(
    state: AppState,
    owner: Owner,
    multipart: Multipart,
) -> axum::response::Response {
    let request = match read_upload(multipart).await {
        Ok(request) => request,
        Err(message) => {
            error!("Failed to read upload: {}", message);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestResponse::failure(vec![message])),
            )
                .into_response();
        }
    };

    let result = state.ingestion.ingest(request, &owner).await;
    if let Ok(descriptor) = &result {
        info!("Registering resource {}", descriptor.hash_name);
        state.register(descriptor.clone(), &owner).await;
    }

    respond(result)
}

/// Validation problems are answered with 200 and the error list; encoder and
/// storage faults with 500.
fn respond(
    result: Result<crate::types::FileDescriptor, IngestError>,
) -> axum::response::Response {
    match result {
        Ok(descriptor) => (StatusCode::OK, Json(IngestResponse::success(descriptor))).into_response(),
        Err(e) => {
            let status = if e.is_client_recoverable() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(IngestResponse::from(&e))).into_response()
        }
    }
}

/// Collect the `nav`, `fileName`, `video` and `audio` fields; others are ignored
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, String> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read multipart: {}", e))?
    {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match name.as_str() {
            "nav" | "fileName" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read field {}: {}", name, e))?;
                if name == "nav" {
                    request.platform = Some(value);
                } else {
                    request.display_name = Some(value);
                }
            }
            "video" | "audio" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read {} data: {}", name, e))?;
                let part = UploadedPart {
                    file_name,
                    content_type,
                    data,
                };
                if name == "video" {
                    request.video = Some(part);
                } else {
                    request.audio = Some(part);
                }
            }
            _ => {}
        }
    }

    Ok(request)
}
