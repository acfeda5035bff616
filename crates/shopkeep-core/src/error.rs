use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors a retrieval backend can report.
///
/// "No matching records" is never an error: backends return an empty list
/// for that case. Every variant here means the backend itself could not
/// answer.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the allotted time.
    #[error("backend timed out after {0}ms")]
    Timeout(u64),

    /// An HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// The backend answered with something that is not a valid record set.
    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    /// Backend configuration is invalid or missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Informational only: stage failures are surfaced as partial results and
    /// never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Timeout(_) | Self::Request(_)
        )
    }
}
