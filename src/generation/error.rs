//! Error types for the image-generation client.

use thiserror::Error;

/// Errors that can occur while requesting an image from the backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No endpoint configured; checked before any network call.
    #[error("no API endpoint configured")]
    MissingEndpoint,

    /// Configured endpoint is not a valid URL.
    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Transport-level failure (connection, TLS, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {0}")]
    BadStatus(reqwest::StatusCode),

    /// Backend answered 2xx but the body did not contain a usable image.
    #[error("unexpected response: {0}")]
    ResponseFormat(String),
}

impl GenerationError {
    /// Whether this failure is a configuration problem the user must fix in
    /// settings, as opposed to a transient backend/network one.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingEndpoint | Self::InvalidEndpoint(_))
    }
}
