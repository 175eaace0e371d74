//! Client wiring.

use crate::error::Result;
use async_trait::async_trait;
use larkdown_api::{ApiClient, ApiError, ApiResult, DocxApi, DriveApi, TokenProvider, WikiApi};
use larkdown_auth::{AppCredentials, AuthError, LoginFlow, UserToken};
use larkdown_doc::{DocExporter, MarkdownComposer, NodeExplorer};
use std::sync::Arc;

/// [`TokenProvider`] backed by the login flow.
///
/// Every API call goes through the flow's non-interactive path, so an
/// expired access token is refreshed transparently as long as a refresh
/// token is stored.
pub struct FlowTokenProvider(pub Arc<LoginFlow>);

#[async_trait]
impl TokenProvider for FlowTokenProvider {
    async fn user_token(&self) -> ApiResult<String> {
        match self.0.ensure_token().await {
            Ok(token) => Ok(token.access_token),
            Err(AuthError::NotLoggedIn) => Err(ApiError::MissingToken),
            Err(e) => Err(ApiError::invalid_response(format!(
                "token refresh failed: {e}"
            ))),
        }
    }
}

/// The assembled client.
pub struct Larkdown {
    flow: Arc<LoginFlow>,
    docx: DocxApi,
    wiki: WikiApi,
    drive: DriveApi,
    exporter: DocExporter,
    composer: MarkdownComposer,
    nodes: NodeExplorer,
}

impl Larkdown {
    /// Create a client with the default token store and production hosts.
    pub fn new(credentials: AppCredentials) -> Result<Self> {
        let flow = Arc::new(LoginFlow::new(credentials)?);
        let api = ApiClient::new(Arc::new(FlowTokenProvider(flow.clone())));
        Ok(Self::with_parts(flow, api))
    }

    /// Assemble a client from an existing flow and API client. Useful for
    /// tests and custom hosts.
    pub fn with_parts(flow: Arc<LoginFlow>, api: ApiClient) -> Self {
        let docx = DocxApi::new(api.clone());
        let wiki = WikiApi::new(api.clone());
        let drive = DriveApi::new(api);

        let exporter = DocExporter::new(docx.clone(), drive.clone());
        let composer = MarkdownComposer::new(docx.clone());
        let nodes = NodeExplorer::new(wiki.clone(), MarkdownComposer::new(docx.clone()));

        Self {
            flow,
            docx,
            wiki,
            drive,
            exporter,
            composer,
            nodes,
        }
    }

    /// Log in, interactively if needed, and return the token.
    pub async fn login(&self) -> Result<UserToken> {
        Ok(self.flow.login().await?)
    }

    /// Remove the stored token.
    pub async fn logout(&self) -> Result<bool> {
        Ok(self.flow.logout().await?)
    }

    /// The login flow.
    pub fn flow(&self) -> &Arc<LoginFlow> {
        &self.flow
    }

    /// Document export operations.
    pub fn exporter(&self) -> &DocExporter {
        &self.exporter
    }

    /// Markdown composition into documents.
    pub fn composer(&self) -> &MarkdownComposer {
        &self.composer
    }

    /// Wiki node operations.
    pub fn nodes(&self) -> &NodeExplorer {
        &self.nodes
    }

    /// Raw docx API.
    pub fn docx(&self) -> &DocxApi {
        &self.docx
    }

    /// Raw wiki API.
    pub fn wiki(&self) -> &WikiApi {
        &self.wiki
    }

    /// Raw drive API.
    pub fn drive(&self) -> &DriveApi {
        &self.drive
    }
}
