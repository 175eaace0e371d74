//! Drive media download.

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Client for the drive media endpoints.
#[derive(Clone)]
pub struct DriveApi {
    client: ApiClient,
}

impl DriveApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Download a media file into `out_dir` and return the written path.
    ///
    /// The filename stem comes from the `Content-Disposition` header
    /// (falling back to the file token) and the extension from
    /// `Content-Type`. The body is streamed to disk.
    pub async fn download_media(&self, file_token: &str, out_dir: &Path) -> ApiResult<PathBuf> {
        let response = self
            .client
            .get_raw(&format!("/drive/v1/medias/{file_token}/download"))
            .await?;

        let content_type = header_str(&response, reqwest::header::CONTENT_TYPE);
        let content_disposition = header_str(&response, reqwest::header::CONTENT_DISPOSITION);

        let stem = filename_stem(content_disposition.as_deref())
            .unwrap_or_else(|| file_token.to_string());
        let extension = extension_for(content_type.as_deref());

        let file_name = match extension {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        };

        tokio::fs::create_dir_all(out_dir).await?;
        let out_path = out_dir.join(&file_name);

        let mut file = tokio::fs::File::create(&out_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ApiError::RequestFailed)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(token = %file_token, path = %out_path.display(), "Downloaded media");
        Ok(out_path)
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract the filename stem from a `Content-Disposition` header.
fn filename_stem(content_disposition: Option<&str>) -> Option<String> {
    let header = content_disposition?;

    let raw = header.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("filename=")
            .or_else(|| part.strip_prefix("filename*=UTF-8''"))
    })?;

    let name = raw.trim_matches(|c| c == '"' || c == '\'');
    if name.is_empty() {
        return None;
    }

    // Drop the extension; Content-Type decides the one we write.
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Map a `Content-Type` to a file extension.
fn extension_for(content_type: Option<&str>) -> Option<String> {
    let content_type = content_type?;

    if content_type.contains("image/png") {
        return Some("png".to_string());
    }
    if content_type.contains("image/jpeg") || content_type.contains("image/jpg") {
        return Some("jpg".to_string());
    }
    if content_type.contains("image/gif") {
        return Some("gif".to_string());
    }
    if content_type.contains("image/webp") {
        return Some("webp".to_string());
    }
    if content_type.contains("application/pdf") {
        return Some("pdf".to_string());
    }

    // Generic subtype, e.g. "image/svg+xml" -> "svg"
    let subtype = content_type.split('/').nth(1)?;
    let subtype = subtype.split(';').next()?.split('+').next()?.trim();
    if subtype.is_empty() {
        None
    } else {
        Some(subtype.to_string())
    }
}
