//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! The request-to-recipe failure taxonomy lives here; classification into
//! user-facing reports happens in [`crate::classify`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No generation credential configured")]
    MissingCredential,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Generation quota exceeded, retry in {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    #[error("Generation credential rejected by provider")]
    InvalidCredential,

    #[error("Generation request timed out")]
    RequestTimeout,

    // Display deliberately omits the raw text; it is diagnostics-only.
    #[error("Generation output could not be parsed")]
    ResponseUnparseable { raw: String },

    #[error("Generation provider error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(reqwest::Error),

    #[error("Blob storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::RequestTimeout
        } else {
            Error::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
