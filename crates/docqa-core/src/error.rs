//! Typed failures shared by every pipeline operation.

use thiserror::Error;

/// Failure kinds surfaced to callers of the core operations.
///
/// Every variant carries a human-readable message. The HTTP layer maps
/// [`Error::kind`] onto status codes.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input shape or range (top_k out of bounds, empty text, bad id).
    #[error("{0}")]
    Validation(String),

    /// A prerequisite artifact (raw file, extracted text, index) is missing.
    #[error("{0}")]
    NotFound(String),

    /// Missing or rejected credentials for the embedding or LLM service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other embedding/LLM call failure (transport, quota, bad payload).
    #[error("remote call failed: {0}")]
    Remote(String),

    /// Artifact store I/O failure or a corrupt persisted artifact.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "bad_request",
            Error::NotFound(_) => "not_found",
            Error::Auth(_) => "auth",
            Error::Remote(_) => "remote",
            Error::Storage(_) => "storage",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("malformed artifact: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
