//! Error handling for the Cinetheque client

use std::fmt;
use thiserror::Error;

/// Unified error type for the Cinetheque client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Token renewal errors, surfaced to requests queued behind a failed refresh
    #[error("Token renewal failed: {0}")]
    Renewal(String),

    /// Non-success responses from the API
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status returned by the server
        status: reqwest::StatusCode,
        /// Message extracted from the response body, or the raw body
        message: String,
    },
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new token renewal error
    pub fn renewal<T: fmt::Display>(msg: T) -> Self {
        Error::Renewal(msg.to_string())
    }

    /// Whether this error is an API response with status 401
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status == reqwest::StatusCode::UNAUTHORIZED)
    }
}
