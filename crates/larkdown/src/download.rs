//! End-to-end document download.

use crate::client::Larkdown;
use crate::error::Result;
use larkdown_api::ObjType;
use larkdown_doc::{DocError, ExportOptions};
use larkdown_util::urls::{extract_token, ResourceKind};
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for [`Larkdown::download_document`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Where the Markdown file is written.
    pub output_path: PathBuf,
    /// Where image files go. Defaults to `images/` next to the output file.
    pub images_dir: Option<PathBuf>,
    /// Whether to download images (placeholder links otherwise).
    pub download_images: bool,
}

impl DownloadOptions {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            images_dir: None,
            download_images: true,
        }
    }
}

/// What a download produced.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// Path of the written Markdown file.
    pub output_path: PathBuf,
    /// Lines of Markdown written.
    pub lines: usize,
    /// Image files downloaded.
    pub images: usize,
}

impl Larkdown {
    /// Download the document behind a URL as a Markdown file.
    ///
    /// Accepts direct document URLs and wiki node URLs; wiki nodes must
    /// point at a docx document. Images are downloaded next to the output
    /// file and referenced by relative path.
    pub async fn download_document(
        &self,
        url: &str,
        options: DownloadOptions,
    ) -> Result<DownloadReport> {
        let document_id = self.resolve_document_id(url).await?;

        let markdown_dir = options
            .output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let images_dir = options
            .images_dir
            .clone()
            .unwrap_or_else(|| markdown_dir.join("images"));

        let export_options = ExportOptions {
            download_images: options.download_images,
            images_dir: Some(images_dir.clone()),
            markdown_dir: Some(markdown_dir.clone()),
        };

        let markdown = self
            .exporter()
            .export_markdown(&document_id, &export_options)
            .await?;

        tokio::fs::create_dir_all(&markdown_dir).await?;
        tokio::fs::write(&options.output_path, &markdown).await?;

        let images = if options.download_images {
            count_images(&images_dir).await
        } else {
            0
        };

        let report = DownloadReport {
            lines: markdown.lines().count(),
            images,
            output_path: options.output_path,
        };

        info!(
            document_id = %document_id,
            path = %report.output_path.display(),
            lines = report.lines,
            images = report.images,
            "Document downloaded"
        );

        Ok(report)
    }

    /// Resolve a resource URL to the underlying docx document id.
    async fn resolve_document_id(&self, url: &str) -> Result<String> {
        let token = extract_token(url);

        match token.kind {
            ResourceKind::Document => Ok(token.token),
            ResourceKind::WikiNode => {
                let node = self.nodes().node_by_url(url).await?;

                if node.obj_type != Some(ObjType::Docx) {
                    let got = node
                        .obj_type
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(DocError::UnsupportedObjType(got).into());
                }
                if node.obj_token.is_empty() {
                    return Err(DocError::IncompleteNode("obj_token").into());
                }

                Ok(node.obj_token)
            }
            _ => Err(DocError::invalid_url(url).into()),
        }
    }
}

async fn count_images(images_dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(images_dir).await else {
        return 0;
    };

    let mut count = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with('.') {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FlowTokenProvider;
    use larkdown_api::ApiClient;
    use larkdown_auth::{AppCredentials, LoginFlow, OAuthClient, TokenStore, UserToken};
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> (Larkdown, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(TokenStore::with_path(dir.path().join("auth.json")));

        let now = larkdown_util::current_time_secs();
        store
            .set(UserToken {
                access_token: "u-live".to_string(),
                refresh_token: None,
                expires_at: Some(now + 3600),
                scope: None,
                app_id: "cli_test".to_string(),
            })
            .await
            .unwrap();

        let credentials =
            AppCredentials::new("cli_test", "secret", "http://localhost:3000/callback");
        let oauth = OAuthClient::with_base_urls(credentials, server.uri(), server.uri());
        let flow = Arc::new(LoginFlow::with_parts(store, oauth));

        let api = ApiClient::with_base_url(
            Arc::new(FlowTokenProvider(flow.clone())),
            server.uri(),
        );

        (Larkdown::with_parts(flow, api), dir)
    }

    async fn mount_document(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/docx/v1/documents/doccn1/blocks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "items": [
                        {
                            "block_id": "doccn1",
                            "block_type": 1,
                            "children": ["t", "img"]
                        },
                        {
                            "block_id": "t",
                            "block_type": 2,
                            "parent_id": "doccn1",
                            "text": { "elements": [ { "text_run": { "content": "Body." } } ] }
                        },
                        {
                            "block_id": "img",
                            "block_type": 27,
                            "parent_id": "doccn1",
                            "image": { "token": "ImgTokAA" }
                        }
                    ],
                    "has_more": false
                }
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/drive/v1/medias/ImgTokAA/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_download_docx_url() {
        let server = MockServer::start().await;
        mount_document(&server).await;

        let (client, _auth_dir) = client_for(&server).await;
        let out_dir = TempDir::new().unwrap();
        let output_path = out_dir.path().join("doc.md");

        let report = client
            .download_document(
                "https://sample.feishu.cn/docx/doccn1",
                DownloadOptions::new(&output_path),
            )
            .await
            .unwrap();

        assert_eq!(report.images, 1);
        let written = std::fs::read_to_string(&output_path).unwrap();
        assert!(written.contains("Body."));
        assert!(written.contains("![img](images/ImgTokAA.png)"));
        assert!(out_dir.path().join("images/ImgTokAA.png").exists());
        assert_eq!(report.lines, written.lines().count());
    }

    #[tokio::test]
    async fn test_download_wiki_url_resolves_node() {
        let server = MockServer::start().await;
        mount_document(&server).await;

        Mock::given(method("GET"))
            .and(path("/wiki/v2/spaces/get_node"))
            .and(query_param("token", "wikcn1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "node": {
                        "space_id": "7001",
                        "node_token": "wikcn1",
                        "obj_token": "doccn1",
                        "obj_type": "docx",
                        "has_child": false,
                        "title": "Doc"
                    }
                }
            })))
            .mount(&server)
            .await;

        let (client, _auth_dir) = client_for(&server).await;
        let out_dir = TempDir::new().unwrap();
        let output_path = out_dir.path().join("doc.md");

        let mut options = DownloadOptions::new(&output_path);
        options.download_images = false;

        let report = client
            .download_document("https://sample.feishu.cn/wiki/wikcn1", options)
            .await
            .unwrap();

        assert_eq!(report.images, 0);
        let written = std::fs::read_to_string(&output_path).unwrap();
        // Placeholder path, no file on disk
        assert!(written.contains("![img](images/ImgTokAA.png)"));
        assert!(!out_dir.path().join("images/ImgTokAA.png").exists());
    }

    #[tokio::test]
    async fn test_download_rejects_non_docx_node() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wiki/v2/spaces/get_node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "node": {
                        "space_id": "7001",
                        "node_token": "wikcn2",
                        "obj_token": "shtcn1",
                        "obj_type": "sheet",
                        "has_child": false
                    }
                }
            })))
            .mount(&server)
            .await;

        let (client, _auth_dir) = client_for(&server).await;
        let out_dir = TempDir::new().unwrap();

        let err = client
            .download_document(
                "https://sample.feishu.cn/wiki/wikcn2",
                DownloadOptions::new(out_dir.path().join("doc.md")),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Doc(DocError::UnsupportedObjType(_))
        ));
    }

    #[tokio::test]
    async fn test_download_rejects_unknown_url() {
        let server = MockServer::start().await;
        let (client, _auth_dir) = client_for(&server).await;

        let err = client
            .download_document(
                "https://example.com/docx/whatever",
                DownloadOptions::new("out.md"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, crate::Error::Doc(DocError::InvalidUrl(_))));
    }
}
