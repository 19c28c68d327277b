//! Error types for proxy trust verification and connection negotiation.
//!
//! All errors are strongly typed and propagated without panicking.
//! `Security` failures are never downgraded to "not trusted" by this crate.

/// Error types covering trust verification, proxy composition, and
/// constraint handling.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Security violation: {0}")]
    Security(String),

    #[error("Object is not trusted: {0}")]
    Untrusted(String),

    #[error("No more elements")]
    NoSuchElement,

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrustError {
    /// Access-control failures that must reach the caller unchanged.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Failures of a remote call that a verifier may record and move past.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for TrustError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TrustError>;
