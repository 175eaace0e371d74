//! Token persistence.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Clock skew applied when judging expiry. A token within this many seconds
/// of its deadline is treated as already expired so in-flight requests don't
/// race the cutoff.
const EXPIRY_SKEW_SECS: u64 = 60;

/// A persisted user access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserToken {
    /// The user access token.
    pub access_token: String,
    /// Refresh token, present when `offline_access` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Granted scope string, as reported by the token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// App the token was issued for.
    pub app_id: String,
}

impl UserToken {
    /// Check whether the token is expired (with skew).
    ///
    /// Tokens without an `expires_at` never expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => larkdown_util::current_time_secs() + EXPIRY_SKEW_SECS >= expires_at,
            None => false,
        }
    }

    /// A short prefix of the access token, safe for logs.
    pub fn fingerprint(&self) -> &str {
        let end = self.access_token.len().min(8);
        &self.access_token[..end]
    }
}

/// File-backed storage for the user token.
///
/// Reads go through an in-memory cache behind a `RwLock`; writes go to a
/// temp file first and are renamed into place. On Unix the file is written
/// with 0600 permissions.
pub struct TokenStore {
    path: PathBuf,
    cache: RwLock<Option<UserToken>>,
    loaded: RwLock<bool>,
}

impl TokenStore {
    /// Create a token store at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn new() -> AuthResult<Self> {
        let path = larkdown_util::path::default_auth_path().ok_or(AuthError::NoConfigDir)?;
        Ok(Self::with_path(path))
    }

    /// Create a token store with a custom path. Useful for tests.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
            loaded: RwLock::new(false),
        }
    }

    /// Path to the token file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the stored token, if any.
    ///
    /// A file that fails to parse is treated as absent (with a warning)
    /// rather than an error; a stale or corrupt auth file should never
    /// brick the client.
    pub async fn load(&self) -> AuthResult<Option<UserToken>> {
        {
            let loaded = self.loaded.read().await;
            if *loaded {
                return Ok(self.cache.read().await.clone());
            }
        }

        let token = self.read_file().await?;

        *self.cache.write().await = token.clone();
        *self.loaded.write().await = true;

        Ok(token)
    }

    /// Persist a token, replacing any existing one.
    pub async fn set(&self, token: UserToken) -> AuthResult<()> {
        debug!(app_id = %token.app_id, token = %token.fingerprint(), "Storing user token");

        self.write_file(&token).await?;
        *self.cache.write().await = Some(token);
        *self.loaded.write().await = true;

        Ok(())
    }

    /// Remove the stored token.
    ///
    /// Returns `true` if a token file was deleted.
    pub async fn clear(&self) -> AuthResult<bool> {
        debug!(path = ?self.path, "Clearing stored token");

        *self.cache.write().await = None;
        *self.loaded.write().await = true;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AuthError::Io(e)),
        }
    }

    async fn read_file(&self) -> AuthResult<Option<UserToken>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<UserToken>(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    async fn write_file(&self, token: &UserToken) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(token)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&temp_path, perms)
                .await
                .map_err(|e| {
                    AuthError::Permissions(format!(
                        "Failed to set permissions on {:?}: {}",
                        temp_path, e
                    ))
                })?;
        }

        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = ?self.path, "Wrote token file");
        Ok(())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("path", &self.path).finish()
    }
}
