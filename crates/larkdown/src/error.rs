//! Top-level error type.

use thiserror::Error;

/// Errors surfaced by the facade.
#[derive(Debug, Error)]
pub enum Error {
    /// Login or token handling failed.
    #[error(transparent)]
    Auth(#[from] larkdown_auth::AuthError),

    /// An API call failed.
    #[error(transparent)]
    Api(#[from] larkdown_api::ApiError),

    /// Document conversion or node operation failed.
    #[error(transparent)]
    Doc(#[from] larkdown_doc::DocError),

    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
