//! Document export.

use crate::block::BlockKind;
use crate::error::{DocError, DocResult};
use crate::images::{collect_image_tokens, download_images, ImageMap};
use crate::markdown::MarkdownRenderer;
use larkdown_api::{Block, DocxApi, DriveApi, TextElement};
use std::path::PathBuf;
use tracing::{debug, info};

/// Options controlling a Markdown export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Download images and link them by relative path. Without this every
    /// image renders with a placeholder path.
    pub download_images: bool,
    /// Directory image files are written to. Required when downloading.
    pub images_dir: Option<PathBuf>,
    /// Directory the Markdown file will live in, for relative image paths.
    /// Defaults to `images_dir`.
    pub markdown_dir: Option<PathBuf>,
}

/// Summary numbers for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocStatistics {
    /// Characters of plain text.
    pub characters: usize,
    /// Non-empty lines of plain text.
    pub paragraphs: usize,
    /// Image blocks.
    pub images: usize,
    /// Hyperlinks in text runs.
    pub links: usize,
}

/// Exports documents as Markdown, plain text, or summary data.
pub struct DocExporter {
    docx: DocxApi,
    drive: DriveApi,
}

impl DocExporter {
    pub fn new(docx: DocxApi, drive: DriveApi) -> Self {
        Self { docx, drive }
    }

    /// Export a document as Markdown.
    ///
    /// Fetches every block (following pagination), resolves images per the
    /// options, and renders the tree.
    pub async fn export_markdown(
        &self,
        document_id: &str,
        options: &ExportOptions,
    ) -> DocResult<String> {
        let blocks = self.docx.list_all_blocks(document_id).await?;
        debug!(document_id = %document_id, blocks = blocks.len(), "Exporting document");

        let tokens = collect_image_tokens(&blocks);

        let images = if options.download_images && !tokens.is_empty() {
            let images_dir = options
                .images_dir
                .as_ref()
                .ok_or(DocError::MissingImagesDir)?;
            let markdown_dir = options.markdown_dir.as_ref().unwrap_or(images_dir);

            let map = download_images(&self.drive, &tokens, images_dir, markdown_dir).await;
            info!(
                document_id = %document_id,
                images = map.len(),
                "Image download complete"
            );
            map
        } else {
            // Placeholder paths keep the links stable for a later download.
            let mut map = ImageMap::default();
            for token in &tokens {
                map.insert(token.clone(), ImageMap::placeholder(token));
            }
            map
        };

        Ok(MarkdownRenderer::render(&blocks, &images, document_id))
    }

    /// Fetch the document's plain-text content.
    pub async fn raw_text(&self, document_id: &str) -> DocResult<String> {
        Ok(self.docx.raw_content(document_id).await?)
    }

    /// Collect every hyperlink in the document, deduplicated, in order.
    pub async fn extract_links(&self, document_id: &str) -> DocResult<Vec<String>> {
        let blocks = self.docx.list_all_blocks(document_id).await?;

        let mut seen = std::collections::HashSet::new();
        let mut links = Vec::new();
        for block in &blocks {
            for url in block_links(block) {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }

        Ok(links)
    }

    /// Compute summary statistics for a document.
    pub async fn statistics(&self, document_id: &str) -> DocResult<DocStatistics> {
        let text = self.docx.raw_content(document_id).await?;
        let blocks = self.docx.list_all_blocks(document_id).await?;

        let images = blocks
            .iter()
            .filter(|b| BlockKind::from_code(b.block_type) == BlockKind::Image)
            .count();
        let links = blocks.iter().map(|b| block_links(b).len()).sum();

        Ok(DocStatistics {
            characters: text.chars().count(),
            paragraphs: text.lines().filter(|line| !line.trim().is_empty()).count(),
            images,
            links,
        })
    }
}

/// Hyperlink URLs in a block's text runs.
fn block_links(block: &Block) -> Vec<String> {
    let mut urls = Vec::new();

    let mut scan = |elements: &[TextElement]| {
        for element in elements {
            if let Some(run) = &element.text_run {
                if let Some(style) = &run.text_element_style {
                    if let Some(link) = &style.link {
                        if !link.url.is_empty() {
                            urls.push(link.url.clone());
                        }
                    }
                }
            }
        }
    };

    if let Some(spans) = &block.text {
        scan(&spans.elements);
    }
    if let Some(spans) = &block.bullet {
        scan(&spans.elements);
    }
    if let Some(ordered) = &block.ordered {
        scan(&ordered.elements);
    }
    for spans in [
        &block.heading1,
        &block.heading2,
        &block.heading3,
        &block.heading4,
        &block.heading5,
        &block.heading6,
    ]
    .into_iter()
    .flatten()
    {
        scan(&spans.elements);
    }

    urls
}
