//! Error types for steward operations

use thiserror::Error;

/// Main error type for steward operations
///
/// Every public operation surfaces failures as this single type, wrapping
/// the underlying `kube` client failure where one exists.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error for resource payloads
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether this failure means "the targeted resource does not exist".
    ///
    /// True only for a Kubernetes API status response with code 404. Every
    /// other failure (permission denied, conflict, transport error, server
    /// error) is treated uniformly as an operation failure; the reconciler
    /// does not distinguish retryable from non-retryable causes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(ae)) if ae.code == 404)
    }
}
