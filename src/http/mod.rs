//! HTTP API of the recording ingestion service
//!
//! - POST /video-recorder/upload - Upload into the caller's user directory
//! - POST /video-recorder/workspaces/:id/upload - Upload into a workspace
//! - GET /video-recorder/resources - Resources created so far
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::USERNAME_HEADER;
pub use routes::create_router;
pub use state::{AppState, StoredResource};
