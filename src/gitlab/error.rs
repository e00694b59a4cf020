//! Error types for the GitLab GraphQL client.

use thiserror::Error;

/// Errors from executing a GraphQL request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The service rejected the credential (HTTP 401).
    #[error("token is invalid or expired")]
    Unauthorized,

    /// Non-success response status other than 401.
    #[error("service responded with status {status}")]
    Status { status: u16 },

    /// The service reported errors in the response envelope.
    #[error("graphql error: {message}")]
    Graphql { message: String },

    /// The response carried neither data nor errors.
    #[error("response contained no data")]
    MissingData,

    /// Transport-level failure (connection, timeout, body decoding).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Create a status error.
    pub fn status(status: u16) -> Self {
        Self::Status { status }
    }

    /// Create a graphql error carrying the surfaced message.
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::Graphql {
            message: message.into(),
        }
    }
}
