//! Error types for the XenForo API client.
//!
//! # Design
//! Callers see a single error type, `ApiError`, whatever went wrong: a
//! non-200 status, a network fault inside the transport, or an unknown
//! container name. The HTTP variant keeps the raw status and body so callers
//! can tell 4xx from 5xx without the client interpreting error payloads.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by [`Client`](crate::Client) and its containers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with any status other than 200.
    #[error("HTTP Error code: {status}")]
    Http { status: u16, body: String },

    /// The transport could not complete the round-trip.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No container is registered under the requested name.
    #[error("Unable to find container {0}")]
    UnknownContainer(String),

    /// A 200 response whose body is not valid JSON.
    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Construction-time invariant violated (empty base URL or API key).
    #[error("invalid client configuration: {0}")]
    Config(&'static str),

    /// A container handle was used after its client was dropped.
    #[error("client was dropped before the container call")]
    ClientDropped,
}

impl ApiError {
    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }
}

/// A fault raised by a [`Transport`](crate::transport::Transport) before a
/// response was obtained: DNS failure, refused connection, timeout, or an
/// unreadable body.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, reusing its message.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
