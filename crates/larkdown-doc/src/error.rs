//! Error types for document operations.

use thiserror::Error;

/// Errors that can occur during document conversion and node operations.
#[derive(Debug, Error)]
pub enum DocError {
    /// Underlying API call failed.
    #[error(transparent)]
    Api(#[from] larkdown_api::ApiError),

    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image download requested without a target directory.
    #[error("Downloading images requires an images directory")]
    MissingImagesDir,

    /// The Markdown conversion endpoint produced nothing usable.
    #[error("Markdown conversion failed: {0}")]
    ConversionFailed(String),

    /// The URL is not a recognized platform resource.
    #[error("Not a recognized resource URL: {0}")]
    InvalidUrl(String),

    /// A node is missing a field the operation needs.
    #[error("Node is missing {0}")]
    IncompleteNode(&'static str),

    /// The node points at an object type the operation does not support.
    #[error("Unsupported object type: {0}")]
    UnsupportedObjType(String),
}

impl DocError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl(url.into())
    }

    /// Create a conversion failure.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::ConversionFailed(message.into())
    }
}

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;
