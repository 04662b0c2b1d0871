use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::encoder::{EncodeJob, Encoder};
use super::error::IngestError;
use super::request::{UploadParts, UploadRequest, UploadedPart};
use super::storage::{Owner, StorageLayout};
use crate::types::{FileDescriptor, AUDIO_EXTENSION, VIDEO_EXTENSION, VIDEO_MIME_TYPE};

/// Validates uploads, normalizes them through the encoder and stores the result
pub struct IngestionHandler {
    layout: StorageLayout,
    encoder: Arc<dyn Encoder>,
}

impl IngestionHandler {
    pub fn new(layout: StorageLayout, encoder: Arc<dyn Encoder>) -> Self {
        Self { layout, encoder }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Run one upload to completion
    ///
    /// Returns a complete descriptor or an error; on error no final file is
    /// left in storage and staged temp files are removed best-effort.
    ///
    /// The work runs on its own task: once started it completes and cleans
    /// up even if the caller stops waiting.
    pub async fn ingest(
        &self,
        request: UploadRequest,
        owner: &Owner,
    ) -> Result<FileDescriptor, IngestError> {
        let task = tokio::spawn(run(
            self.layout.clone(),
            Arc::clone(&self.encoder),
            request,
            owner.clone(),
        ));

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Ingestion task failed: {}", e);
                Err(IngestError::Interrupted(e.to_string()))
            }
        }
    }
}

async fn run(
    layout: StorageLayout,
    encoder: Arc<dyn Encoder>,
    request: UploadRequest,
    owner: Owner,
) -> Result<FileDescriptor, IngestError> {
    let upload = request.validate().map_err(IngestError::Validation)?;

    let target = layout
        .resolve(&owner)
        .map_err(|e| IngestError::Validation(vec![e]))?;
    target
        .ensure()
        .await
        .map_err(|e| IngestError::storage(format!("cannot create {}", target.dir.display()), e))?;

    let unique_base_name = uuid::Uuid::new_v4().to_string();
    let final_file_name = format!("{}.{}", unique_base_name, VIDEO_EXTENSION);

    info!(
        "Ingesting '{}' ({:?}) as {}",
        upload.display_name,
        upload.parts.mode(),
        target.hash_name(&final_file_name)
    );

    let uploads_dir = layout.uploads_dir();
    let mut temp = TempArtifacts::default();

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| IngestError::storage("cannot create the upload directory", e))?;

    let encoded = uploads_dir.join(&final_file_name);
    let job = match &upload.parts {
        UploadParts::Single { video } => {
            let input = stage(
                &mut temp,
                uploads_dir,
                &format!("{}-video.{}", unique_base_name, VIDEO_EXTENSION),
                video,
            )
            .await?;
            EncodeJob::Reencode {
                input,
                output: encoded.clone(),
            }
        }
        UploadParts::Dual { video, audio } => {
            let video = stage(
                &mut temp,
                uploads_dir,
                &format!("{}-video.{}", unique_base_name, VIDEO_EXTENSION),
                video,
            )
            .await?;
            let audio = stage(
                &mut temp,
                uploads_dir,
                &format!("{}-audio.{}", unique_base_name, AUDIO_EXTENSION),
                audio,
            )
            .await?;
            EncodeJob::Mux {
                audio,
                video,
                output: encoded.clone(),
            }
        }
    };

    // the encoder may leave a partial output behind on failure
    temp.track(encoded.clone());

    debug!("Encoding with {}", encoder.name());
    if let Err(e) = encoder.encode(&job).await {
        error!("{}", e);
        return Err(e.into());
    }

    let final_path = target.file_path(&final_file_name);
    let size = match persist(&encoded, &final_path).await {
        Ok(size) => size,
        Err(e) => {
            remove_best_effort(&final_path).await;
            return Err(IngestError::storage(
                format!("cannot store {}", final_path.display()),
                e,
            ));
        }
    };

    temp.cleanup().await;

    let descriptor = FileDescriptor {
        size,
        name: upload.display_name,
        hash_name: target.hash_name(&final_file_name),
        mime_type: VIDEO_MIME_TYPE.to_string(),
    };

    info!(
        "Stored {} ({} bytes) for '{}'",
        descriptor.hash_name, descriptor.size, descriptor.name
    );

    Ok(descriptor)
}

/// Write an uploaded part into the holding area and remember it for cleanup
async fn stage(
    temp: &mut TempArtifacts,
    dir: &Path,
    file_name: &str,
    part: &UploadedPart,
) -> Result<PathBuf, IngestError> {
    let path = dir.join(file_name);
    temp.track(path.clone());
    tokio::fs::write(&path, &part.data)
        .await
        .map_err(|e| IngestError::storage(format!("cannot stage {}", file_name), e))?;
    debug!("Staged {} from {}", path.display(), part.describe());
    Ok(path)
}

/// Copy the encoded output to its final place and return the stored size
async fn persist(encoded: &Path, final_path: &Path) -> std::io::Result<u64> {
    tokio::fs::copy(encoded, final_path).await?;
    let metadata = tokio::fs::metadata(final_path).await?;
    Ok(metadata.len())
}

async fn remove_best_effort(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Temporary files of one ingestion
///
/// Removed by [`TempArtifacts::cleanup`] on success, or on drop when the
/// ingestion bails out early. Removal failures are swallowed.
#[derive(Default)]
struct TempArtifacts {
    paths: Vec<PathBuf>,
}

impl TempArtifacts {
    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    async fn cleanup(mut self) {
        for path in self.paths.drain(..) {
            remove_best_effort(&path).await;
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}
