use thiserror::Error;

use super::encoder::EncodeError;
use crate::types::IngestResponse;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or invalid request fields; the client can fix and resubmit
    #[error("invalid upload: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Encoding(#[from] EncodeError),

    #[error("storage error: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The ingestion task panicked or was cancelled by runtime shutdown
    #[error("ingestion was interrupted: {0}")]
    Interrupted(String),
}

impl IngestError {
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        IngestError::Storage {
            context: context.into(),
            source,
        }
    }

    /// Human-readable messages for the response's error list (never empty)
    pub fn messages(&self) -> Vec<String> {
        match self {
            IngestError::Validation(errors) if !errors.is_empty() => errors.clone(),
            IngestError::Validation(_) => {
                vec!["one or more request parameters are missing.".to_string()]
            }
            other => vec![other.to_string()],
        }
    }

    /// Problems the client can fix itself, as opposed to process/infra faults
    pub fn is_client_recoverable(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}

impl From<&IngestError> for IngestResponse {
    fn from(error: &IngestError) -> Self {
        IngestResponse::failure(error.messages())
    }
}
