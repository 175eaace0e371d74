//! OAuth client for the platform accounts endpoints.
//!
//! Implements the authorization-code grant without PKCE: the platform
//! authenticates the app through `app_id`/`app_secret` in the token request
//! body rather than a code challenge.

use crate::error::{AuthError, AuthResult};
use crate::store::UserToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Base URL of the accounts host serving the authorization page.
const DEFAULT_AUTHORIZE_BASE: &str = "https://accounts.feishu.cn/open-apis";

/// Base URL of the open API host serving the token endpoints.
const DEFAULT_API_BASE: &str = "https://open.larksuite.com/open-apis";

/// User agent attached to accounts requests.
const USER_AGENT: &str = concat!("larkdown/", env!("CARGO_PKG_VERSION"));

fn default_port() -> u16 {
    3000
}

fn default_login_timeout_secs() -> u64 {
    300
}

/// Application credentials and login settings.
///
/// Constructed programmatically; serde-derived so callers can persist or
/// load it however they configure the rest of their application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCredentials {
    /// App ID issued by the platform.
    pub app_id: String,
    /// App secret issued by the platform.
    pub app_secret: String,
    /// Redirect URI registered for the app, e.g. `http://localhost:3000/callback`.
    pub redirect_uri: String,
    /// Local port the callback server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Requested scope. `offline_access` is appended automatically when a
    /// refresh token is wanted.
    #[serde(default)]
    pub scope: Option<String>,
    /// How long an interactive login waits for the browser callback.
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
}

impl AppCredentials {
    /// Create credentials with default port and timeout.
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            redirect_uri: redirect_uri.into(),
            port: default_port(),
            scope: None,
            login_timeout_secs: default_login_timeout_secs(),
        }
    }

    /// The interactive login timeout as a [`Duration`].
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

/// Wire shape of the token endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a persistable [`UserToken`].
    ///
    /// `fallback_refresh` keeps the previous refresh token alive when the
    /// endpoint does not rotate it.
    pub fn into_user_token(self, app_id: &str, fallback_refresh: Option<String>) -> UserToken {
        UserToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            expires_at: Some(larkdown_util::current_time_secs() + self.expires_in),
            scope: self.scope,
            app_id: app_id.to_string(),
        }
    }
}

/// User profile returned by the user-info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub open_id: Option<String>,
    #[serde(default)]
    pub union_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Client for the authorize/token/user-info endpoints.
pub struct OAuthClient {
    http: reqwest::Client,
    credentials: AppCredentials,
    authorize_base: String,
    api_base: String,
}

impl OAuthClient {
    /// Create a client against the production hosts.
    pub fn new(credentials: AppCredentials) -> Self {
        Self::with_base_urls(credentials, DEFAULT_AUTHORIZE_BASE, DEFAULT_API_BASE)
    }

    /// Create a client with custom base URLs. Useful for tests.
    pub fn with_base_urls(
        credentials: AppCredentials,
        authorize_base: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            authorize_base: authorize_base.into(),
            api_base: api_base.into(),
        }
    }

    /// The credentials this client was built with.
    pub fn credentials(&self) -> &AppCredentials {
        &self.credentials
    }

    /// Build the authorization URL the browser is sent to.
    ///
    /// When `want_refresh` is set, ` offline_access` is appended to the
    /// scope so the token endpoint issues a refresh token.
    pub fn authorize_url(&self, state: &str, want_refresh: bool) -> String {
        let mut scope = self.credentials.scope.clone().unwrap_or_default();
        if want_refresh {
            scope.push_str(" offline_access");
        }

        format!(
            "{}/authen/v1/authorize?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.authorize_base,
            urlencoding::encode(&self.credentials.app_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode(scope.trim()),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a user access token.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<TokenResponse> {
        debug!("Exchanging authorization code");

        let body = json!({
            "grant_type": "authorization_code",
            "app_id": self.credentials.app_id,
            "app_secret": self.credentials.app_secret,
            "code": code,
        });

        self.post_token("/authen/v1/access_token", &body).await
    }

    /// Refresh a user access token.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        debug!("Refreshing user access token");

        let body = json!({
            "grant_type": "refresh_token",
            "client_id": self.credentials.app_id,
            "client_secret": self.credentials.app_secret,
            "refresh_token": refresh_token,
        });

        self.post_token("/authen/v1/refresh_access_token", &body).await
    }

    /// Fetch the profile of the token's user.
    pub async fn user_info(&self, access_token: &str) -> AuthResult<UserInfo> {
        let url = format!("{}/authen/v1/user_info", self.api_base);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        decode_envelope(response).await
    }

    /// Check whether an access token is still accepted by the platform.
    pub async fn validate_token(&self, access_token: &str) -> bool {
        self.user_info(access_token).await.is_ok()
    }

    async fn post_token(&self, endpoint: &str, body: &serde_json::Value) -> AuthResult<TokenResponse> {
        let url = format!("{}{}", self.api_base, endpoint);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(body)
            .send()
            .await?;

        decode_envelope(response).await
    }
}

/// Decode a response that may or may not wrap its payload in the platform's
/// `{code, msg, data}` envelope.
async fn decode_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> AuthResult<T> {
    let status = response.status();
    let value: serde_json::Value = response.json().await?;

    if let Some(code) = value.get("code").and_then(|c| c.as_i64()) {
        if code != 0 {
            let message = value
                .get("msg")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(AuthError::api(code, message));
        }
    }

    if !status.is_success() {
        return Err(AuthError::api(
            status.as_u16() as i64,
            format!("HTTP {status}"),
        ));
    }

    let payload = match value.get("data") {
        Some(data) if !data.is_null() => data.clone(),
        _ => value,
    };

    Ok(serde_json::from_value(payload)?)
}

/// Generate a random `state` parameter for CSRF protection.
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> AppCredentials {
        AppCredentials::new("cli_test", "secret", "http://localhost:3000/callback")
    }

    #[test]
    fn test_authorize_url() {
        let mut credentials = creds();
        credentials.scope = Some("docx:document".to_string());
        let client = OAuthClient::new(credentials);

        let url = client.authorize_url("state123", true);
        assert!(url.starts_with("https://accounts.feishu.cn/open-apis/authen/v1/authorize?"));
        assert!(url.contains("client_id=cli_test"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=docx%3Adocument%20offline_access"));
        assert!(url.contains("state=state123"));
    }

    #[test]
    fn test_authorize_url_without_refresh() {
        let client = OAuthClient::new(creds());
        let url = client.authorize_url("s", false);
        assert!(!url.contains("offline_access"));
    }

    #[test]
    fn test_generate_state_uniqueness() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn test_token_response_into_user_token() {
        let response = TokenResponse {
            access_token: "u-access".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: 7200,
            refresh_token: None,
            scope: None,
        };

        let token = response.into_user_token("cli_test", Some("ur-old".to_string()));
        assert_eq!(token.access_token, "u-access");
        // Previous refresh token survives when the endpoint omits one
        assert_eq!(token.refresh_token, Some("ur-old".to_string()));
        assert!(token.expires_at.unwrap() > larkdown_util::current_time_secs());
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/authen/v1/access_token"))
            .and(body_partial_json(serde_json::json!({
                "grant_type": "authorization_code",
                "app_id": "cli_test",
                "code": "authcode",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "access_token": "u-access",
                    "token_type": "Bearer",
                    "expires_in": 7200,
                    "refresh_token": "ur-refresh"
                }
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::with_base_urls(creds(), server.uri(), server.uri());
        let response = client.exchange_code("authcode").await.unwrap();
        assert_eq!(response.access_token, "u-access");
        assert_eq!(response.refresh_token, Some("ur-refresh".to_string()));
    }

    #[tokio::test]
    async fn test_exchange_code_unwrapped_body() {
        // Some deployments return the token payload without the envelope
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/authen/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "u-direct",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::with_base_urls(creds(), server.uri(), server.uri());
        let response = client.exchange_code("authcode").await.unwrap();
        assert_eq!(response.access_token, "u-direct");
    }

    #[tokio::test]
    async fn test_envelope_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/authen/v1/refresh_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 20026,
                "msg": "refresh token expired"
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::with_base_urls(creds(), server.uri(), server.uri());
        let err = client.refresh("ur-stale").await.unwrap_err();
        match err {
            AuthError::Api { code, message } => {
                assert_eq!(code, 20026);
                assert_eq!(message, "refresh token expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_user_info() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/authen/v1/user_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": { "name": "Tester", "open_id": "ou_123" }
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::with_base_urls(creds(), server.uri(), server.uri());
        let info = client.user_info("u-access").await.unwrap();
        assert_eq!(info.name, Some("Tester".to_string()));
        assert_eq!(info.open_id, Some("ou_123".to_string()));

        assert!(client.validate_token("u-access").await);
    }
}
