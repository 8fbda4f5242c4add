use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A path segment was empty or contained a reserved character.
    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    /// The configured database URL could not be used.
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// The remote store rejected the caller's credentials or rules.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The remote store answered with an unexpected HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, TLS or timeout failure talking to the remote store.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A value could not be encoded or decoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
