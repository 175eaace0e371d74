//! Error types for authentication operations.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Failed to read or write the token file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize token data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request to the accounts endpoints failed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform rejected the request with an error envelope.
    #[error("Platform error {code}: {message}")]
    Api { code: i64, message: String },

    /// No user token stored, or the stored token can no longer be used.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The browser redirect reported an error or was malformed.
    #[error("Authorization callback failed: {0}")]
    CallbackFailed(String),

    /// No callback arrived within the configured login timeout.
    #[error("Login timed out waiting for the authorization callback")]
    Timeout,

    /// Could not determine the configuration directory.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Failed to set file permissions on the token file.
    #[error("Failed to set file permissions: {0}")]
    Permissions(String),
}

impl AuthError {
    /// Create an API envelope error.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Create a callback failure.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::CallbackFailed(message.into())
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
