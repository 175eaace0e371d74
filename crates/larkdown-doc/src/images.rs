//! Image extraction, download, and path remapping.
//!
//! Image blocks carry a drive token rather than a URL. The exporter
//! downloads each token once, renames the file after a short token hash,
//! and records the path of the image relative to the Markdown file so the
//! generated `![img](...)` links resolve on disk.

use crate::block::BlockKind;
use larkdown_api::{Block, DriveApi};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Short filesystem-safe hash of a drive token, used as the image filename.
pub fn token_hash(token: &str) -> String {
    token
        .chars()
        .take(8)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Mapping from image token to the Markdown-relative path to use for it.
#[derive(Debug, Clone, Default)]
pub struct ImageMap {
    paths: HashMap<String, String>,
}

impl ImageMap {
    /// The path mapped for a token, or the placeholder when unmapped.
    pub fn path_for(&self, token: &str) -> String {
        self.paths
            .get(token)
            .cloned()
            .unwrap_or_else(|| Self::placeholder(token))
    }

    /// The placeholder path used when an image was not downloaded.
    pub fn placeholder(token: &str) -> String {
        format!("images/{}.png", token_hash(token))
    }

    /// Map a token to a path.
    pub fn insert(&mut self, token: String, path: String) {
        self.paths.insert(token, path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Collect the image tokens of a document, deduplicated, in document order.
pub fn collect_image_tokens(blocks: &[Block]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tokens = Vec::new();

    for block in blocks {
        if BlockKind::from_code(block.block_type) != BlockKind::Image {
            continue;
        }
        let Some(image) = &block.image else { continue };
        if image.token.is_empty() {
            continue;
        }
        if seen.insert(image.token.clone()) {
            tokens.push(image.token.clone());
        }
    }

    tokens
}

/// Download images and build the token → relative-path map.
///
/// Files land in `images_dir` named `<token-hash>.<ext>`; the mapped paths
/// are relative to `markdown_dir`. A failed download logs a warning and
/// maps the token to the placeholder path instead of failing the export.
pub async fn download_images(
    drive: &DriveApi,
    tokens: &[String],
    images_dir: &Path,
    markdown_dir: &Path,
) -> ImageMap {
    let mut map = ImageMap::default();

    if tokens.is_empty() {
        return map;
    }

    let temp_dir = images_dir.join(".tmp");

    for token in tokens {
        match fetch_one(drive, token, images_dir, &temp_dir, markdown_dir).await {
            Ok(relative) => {
                debug!(token = %token, path = %relative, "Image downloaded");
                map.insert(token.clone(), relative);
            }
            Err(e) => {
                warn!(token = %token, error = %e, "Image download failed, using placeholder");
                map.insert(token.clone(), ImageMap::placeholder(token));
            }
        }
    }

    // Drop the temp dir if nothing is left in it.
    let _ = tokio::fs::remove_dir(&temp_dir).await;

    map
}

async fn fetch_one(
    drive: &DriveApi,
    token: &str,
    images_dir: &Path,
    temp_dir: &Path,
    markdown_dir: &Path,
) -> crate::DocResult<String> {
    tokio::fs::create_dir_all(temp_dir).await?;

    // Download under a temp name first; the final name is derived from the
    // token, the extension from what the server actually sent.
    let downloaded = drive.download_media(token, temp_dir).await?;

    let extension = downloaded
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_string();

    let final_name = format!("{}.{}", token_hash(token), extension);
    let final_path = images_dir.join(&final_name);

    if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
        tokio::fs::remove_file(&final_path).await?;
    }
    tokio::fs::rename(&downloaded, &final_path).await?;

    Ok(larkdown_util::path::relative_markdown_path(
        markdown_dir,
        &final_path,
    ))
}
