use std::fmt;

use thiserror::Error;

/// Outcome classification of a failed ACME operation.
///
/// Each variant carries a human readable context message. Messages never
/// contain key material; storage failures are summarized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcmeError {
    /// Client supplied data is structurally or semantically invalid.
    #[error("{0}")]
    Malformed(String),
    /// A revocation reason other than `unspecified` was requested.
    #[error("{0}")]
    BadRevocationReason(String),
    #[error("{0}")]
    AlreadyRevoked(String),
    /// The account exists but may not act.
    #[error("{0}")]
    Unauthorized(String),
    /// Storage inconsistency or backend failure.
    #[error("{0}")]
    ServerInternal(String),
}

impl AcmeError {
    pub fn malformed(message: impl Into<String>) -> Self {
        AcmeError::Malformed(message.into())
    }

    /// Convenience function to create a server internal error, logging the cause.
    pub fn internal<E: fmt::Display>(context: &str, cause: E) -> Self {
        tracing::error!("{context}: {cause}");
        AcmeError::ServerInternal(format!("{context}: {cause}"))
    }

    /// Server internal error without an underlying cause.
    pub fn internal_msg(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("{message}");
        AcmeError::ServerInternal(message)
    }

    /// Whether the failure was caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AcmeError::ServerInternal(_))
    }
}
