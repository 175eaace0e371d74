//! Envelope-aware HTTP client shared by the typed APIs.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default base URL of the open API host.
const DEFAULT_BASE_URL: &str = "https://open.larksuite.com/open-apis";

/// User agent attached to API requests.
const USER_AGENT: &str = concat!("larkdown/", env!("CARGO_PKG_VERSION"));

/// Source of the user access token attached to every request.
///
/// The auth crate's login flow provides the real implementation; tests and
/// embedders with their own token handling use [`StaticTokenProvider`].
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid user access token.
    ///
    /// Implementations should refresh expired tokens where possible and
    /// return [`ApiError::MissingToken`] when no token can be produced.
    async fn user_token(&self) -> ApiResult<String>;
}

/// A fixed token, useful for tests and short-lived scripts.
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn user_token(&self) -> ApiResult<String> {
        Ok(self.0.clone())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Whether another page should be fetched.
    ///
    /// An empty `page_token` ends pagination even when `has_more` is set;
    /// the platform occasionally reports `has_more` without a cursor.
    pub fn next_token(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// HTTP client with bearer auth and envelope decoding.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Create a client against the production host.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_base_url(tokens, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL. Useful for tests.
    pub fn with_base_url(tokens: Arc<dyn TokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON endpoint and decode its envelope.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let token = self.tokens.user_token().await?;
        let url = format!("{}{}", self.base_url, path);

        debug!(path = %path, "API GET");

        let mut request = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if !query.is_empty() {
            request = request.query(query);
        }

        decode_envelope(request.send().await?).await
    }

    /// POST a JSON body and decode the envelope.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let token = self.tokens.user_token().await?;
        let url = format!("{}{}", self.base_url, path);

        debug!(path = %path, "API POST");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(body)
            .send()
            .await?;

        decode_envelope(response).await
    }

    /// GET raw bytes, e.g. for media downloads. The caller handles the body.
    pub async fn get_raw(&self, path: &str) -> ApiResult<reqwest::Response> {
        let token = self.tokens.user_token().await?;
        let url = format!("{}{}", self.base_url, path);

        debug!(path = %path, "API GET (raw)");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::http(status.as_u16(), message));
        }

        Ok(response)
    }
}

async fn decode_envelope<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let value: serde_json::Value = match response.json().await {
        Ok(value) => value,
        Err(e) if status.is_success() => return Err(ApiError::RequestFailed(e)),
        Err(_) => return Err(ApiError::http(status.as_u16(), format!("HTTP {status}"))),
    };

    trace!(status = %status, "API response");

    if let Some(code) = value.get("code").and_then(|c| c.as_i64()) {
        if code != 0 {
            let message = value
                .get("msg")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(ApiError::api(code, message));
        }
    }

    if !status.is_success() {
        return Err(ApiError::http(status.as_u16(), format!("HTTP {status}")));
    }

    let payload = match value.get("data") {
        Some(data) if !data.is_null() => data.clone(),
        Some(_) => {
            return Err(ApiError::invalid_response(
                "success envelope without data payload",
            ))
        }
        None => value,
    };

    Ok(serde_json::from_value(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_base_url(
            Arc::new(StaticTokenProvider("u-test-token".to_string())),
            server.uri(),
        )
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: String,
    }

    #[tokio::test]
    async fn test_get_decodes_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(header("authorization", "Bearer u-test-token"))
            .and(query_param("q", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": { "value": "ok" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let payload: Payload = client.get("/thing", &[("q", "1".to_string())]).await.unwrap();
        assert_eq!(payload.value, "ok");
    }

    #[tokio::test]
    async fn test_envelope_error_code() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 99991663,
                "msg": "token invalid"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Payload>("/thing", &[]).await.unwrap_err();
        match err {
            ApiError::Api { code, message } => {
                assert_eq!(code, 99991663);
                assert_eq!(message, "token invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Payload>("/thing", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_success_without_data_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Payload>("/thing", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_token_propagates() {
        struct NoToken;

        #[async_trait]
        impl TokenProvider for NoToken {
            async fn user_token(&self) -> ApiResult<String> {
                Err(ApiError::MissingToken)
            }
        }

        let client = ApiClient::with_base_url(Arc::new(NoToken), "http://127.0.0.1:1");
        let err = client.get::<Payload>("/thing", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[test]
    fn test_page_next_token() {
        let page: Page<String> = Page {
            items: vec![],
            page_token: Some("cursor".to_string()),
            has_more: true,
        };
        assert_eq!(page.next_token(), Some("cursor"));

        let done: Page<String> = Page {
            items: vec![],
            page_token: Some("cursor".to_string()),
            has_more: false,
        };
        assert_eq!(done.next_token(), None);

        let empty_cursor: Page<String> = Page {
            items: vec![],
            page_token: Some(String::new()),
            has_more: true,
        };
        assert_eq!(empty_cursor.next_token(), None);
    }
}
