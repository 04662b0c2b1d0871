use crate::ingest::{IngestionHandler, Owner};
use crate::types::FileDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A descriptor registered as a platform resource
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    #[serde(flatten)]
    pub descriptor: FileDescriptor,
    /// `WORKSPACE_<id>` or the uploading username
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionHandler>,
    /// Resources created through uploads, oldest first
    pub resources: Arc<RwLock<Vec<StoredResource>>>,
}

impl AppState {
    pub fn new(ingestion: IngestionHandler) -> Self {
        Self {
            ingestion: Arc::new(ingestion),
            resources: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, descriptor: FileDescriptor, owner: &Owner) {
        let owner = match owner {
            Owner::Workspace(id) => format!("WORKSPACE_{}", id),
            Owner::User(name) => name.clone(),
        };
        let mut resources = self.resources.write().await;
        resources.push(StoredResource {
            descriptor,
            owner,
            created_at: Utc::now(),
        });
    }
}
