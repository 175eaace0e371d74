//! Login orchestration.

use crate::callback::CallbackServer;
use crate::error::{AuthError, AuthResult};
use crate::oauth::{generate_state, AppCredentials, OAuthClient};
use crate::store::{TokenStore, UserToken};
use chrono::{Local, TimeZone};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives the login sequence: stored token, then refresh, then the
/// interactive browser flow.
pub struct LoginFlow {
    store: Arc<TokenStore>,
    oauth: OAuthClient,
}

impl LoginFlow {
    /// Create a flow using the default token store location.
    pub fn new(credentials: AppCredentials) -> AuthResult<Self> {
        Ok(Self {
            store: Arc::new(TokenStore::new()?),
            oauth: OAuthClient::new(credentials),
        })
    }

    /// Create a flow with explicit store and OAuth client. Useful for tests
    /// and custom storage locations.
    pub fn with_parts(store: Arc<TokenStore>, oauth: OAuthClient) -> Self {
        Self { store, oauth }
    }

    /// The token store backing this flow.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Get a usable token without user interaction.
    ///
    /// Reuses the stored token while valid, refreshes it when expired and a
    /// refresh token is available. Returns [`AuthError::NotLoggedIn`] when
    /// neither works; callers wanting the browser flow use [`login`](Self::login).
    pub async fn ensure_token(&self) -> AuthResult<UserToken> {
        let Some(stored) = self.store.load().await? else {
            return Err(AuthError::NotLoggedIn);
        };

        if !stored.is_expired() {
            debug!(token = %stored.fingerprint(), "Reusing stored token");
            return Ok(stored);
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            return Err(AuthError::NotLoggedIn);
        };

        info!("Stored token expired, refreshing");
        let response = self.oauth.refresh(&refresh_token).await?;
        let token = response.into_user_token(
            &self.oauth.credentials().app_id,
            Some(refresh_token),
        );
        log_expiry(&token);
        self.store.set(token.clone()).await?;
        Ok(token)
    }

    /// Log in, interactively if needed.
    ///
    /// Tries [`ensure_token`](Self::ensure_token) first; when that fails the
    /// browser flow runs: a callback server is started on the configured
    /// port, the authorization URL is opened, and the redirect's code is
    /// exchanged and persisted.
    pub async fn login(&self) -> AuthResult<UserToken> {
        match self.ensure_token().await {
            Ok(token) => return Ok(token),
            Err(AuthError::NotLoggedIn) => {}
            Err(e) => {
                warn!(error = %e, "Token refresh failed, falling back to interactive login");
                self.store.clear().await?;
            }
        }

        self.interactive_login().await
    }

    /// Remove the stored token.
    pub async fn logout(&self) -> AuthResult<bool> {
        self.store.clear().await
    }

    async fn interactive_login(&self) -> AuthResult<UserToken> {
        let credentials = self.oauth.credentials().clone();

        let server = CallbackServer::bind(credentials.port).await?;
        let state = generate_state();
        let auth_url = self.oauth.authorize_url(&state, true);

        info!(url = %auth_url, "Opening browser for authorization");
        if let Err(e) = open::that(&auth_url) {
            // The URL is logged above; the user can still open it by hand.
            warn!(error = %e, "Failed to open browser");
        }

        let result = server
            .wait_for_code(&state, credentials.login_timeout())
            .await;
        server.stop().await;
        let code = result?;

        debug!("Authorization code received, exchanging for token");
        let response = self.oauth.exchange_code(&code).await?;
        let token = response.into_user_token(&credentials.app_id, None);
        log_expiry(&token);
        self.store.set(token.clone()).await?;

        info!(token = %token.fingerprint(), "Login complete");
        Ok(token)
    }
}

fn log_expiry(token: &UserToken) {
    if let Some(expires_at) = token.expires_at {
        if let Some(when) = Local.timestamp_opt(expires_at as i64, 0).single() {
            debug!(expires_at = %when.format("%Y-%m-%d %H:%M:%S"), "Token expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> AppCredentials {
        AppCredentials::new("cli_test", "secret", "http://localhost:3000/callback")
    }

    fn flow_against(server_uri: &str) -> (LoginFlow, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(TokenStore::with_path(dir.path().join("auth.json")));
        let oauth = OAuthClient::with_base_urls(creds(), server_uri, server_uri);
        (LoginFlow::with_parts(store, oauth), dir)
    }

    fn token(expires_at: Option<u64>, refresh: Option<&str>) -> UserToken {
        UserToken {
            access_token: "u-stored".to_string(),
            refresh_token: refresh.map(|s| s.to_string()),
            expires_at,
            scope: None,
            app_id: "cli_test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_token_not_logged_in() {
        let (flow, _dir) = flow_against("http://127.0.0.1:1");
        let err = flow.ensure_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_ensure_token_reuses_valid_token() {
        let (flow, _dir) = flow_against("http://127.0.0.1:1");

        let now = larkdown_util::current_time_secs();
        flow.store().set(token(Some(now + 3600), None)).await.unwrap();

        let result = flow.ensure_token().await.unwrap();
        assert_eq!(result.access_token, "u-stored");
    }

    #[tokio::test]
    async fn test_ensure_token_refreshes_expired() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/authen/v1/refresh_access_token"))
            .and(body_partial_json(serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": "ur-live",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "access_token": "u-fresh",
                    "expires_in": 7200
                }
            })))
            .mount(&server)
            .await;

        let (flow, _dir) = flow_against(&server.uri());

        let now = larkdown_util::current_time_secs();
        flow.store()
            .set(token(Some(now.saturating_sub(10)), Some("ur-live")))
            .await
            .unwrap();

        let result = flow.ensure_token().await.unwrap();
        assert_eq!(result.access_token, "u-fresh");
        // Refresh token kept when the endpoint doesn't rotate it
        assert_eq!(result.refresh_token, Some("ur-live".to_string()));

        // Refreshed token was persisted
        let stored = flow.store().load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "u-fresh");
    }

    #[tokio::test]
    async fn test_ensure_token_expired_without_refresh() {
        let (flow, _dir) = flow_against("http://127.0.0.1:1");

        let now = larkdown_util::current_time_secs();
        flow.store()
            .set(token(Some(now.saturating_sub(10)), None))
            .await
            .unwrap();

        let err = flow.ensure_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_logout() {
        let (flow, _dir) = flow_against("http://127.0.0.1:1");
        flow.store().set(token(None, None)).await.unwrap();

        assert!(flow.logout().await.unwrap());
        assert!(flow.store().load().await.unwrap().is_none());
    }
}
