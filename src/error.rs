//! Error types for talking to the chat backend.

use thiserror::Error;

/// Anything that can go wrong during a request to the backend.
///
/// The UI treats every variant the same way; the split only exists so logs
/// say what actually happened.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection, TLS or transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
