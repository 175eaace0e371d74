//! Document (docx) API.
//!
//! Covers raw-content export, block listing with pagination, Markdown
//! conversion, and block insertion. The [`Block`] struct is the wire shape
//! of a document block; only the payloads the conversion engine consumes
//! are modeled, everything else round-trips through `extra`.

use crate::client::{ApiClient, Page};
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Maximum page size accepted by the block listing endpoint.
const MAX_PAGE_SIZE: u32 = 500;

/// A hyperlink attached to a text run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Link {
    #[serde(default)]
    pub url: String,
}

/// A styled text run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub inline_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// A run of text with optional styling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_element_style: Option<TextStyle>,
}

/// One element of a text block. Non-text elements (mentions, equations)
/// deserialize with `text_run: None` and render as nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextElement {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

/// Elements of a paragraph-like block (text, headings, bullets, page title).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextSpans {
    #[serde(default)]
    pub elements: Vec<TextElement>,
}

/// Style carried by ordered-list items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderedStyle {
    /// Explicit sequence number, or "auto".
    #[serde(default)]
    pub sequence: Option<String>,
}

/// An ordered-list item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderedBlock {
    #[serde(default)]
    pub elements: Vec<TextElement>,
    #[serde(default)]
    pub style: Option<OrderedStyle>,
}

/// Style carried by code blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeStyle {
    /// Numeric language id assigned by the platform.
    #[serde(default)]
    pub language: Option<u16>,
}

/// A code block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeBlock {
    #[serde(default)]
    pub elements: Vec<TextElement>,
    #[serde(default)]
    pub style: Option<CodeStyle>,
}

/// An image block payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageBlock {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A file/video block payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileBlock {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token: String,
}

/// A document block as returned by the listing endpoint.
///
/// Blocks form a tree: `children` holds the ids of nested blocks in order,
/// and `parent_id` points back up. The root block's id equals the document
/// id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Block {
    #[serde(default)]
    pub block_id: String,
    #[serde(default)]
    pub block_type: u16,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading1: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading2: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading3: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading4: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading5: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading6: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<TextSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<OrderedBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileBlock>,

    /// Payloads this client doesn't interpret (tables, callout styling, ...).
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

/// Result of converting Markdown into block payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertedBlocks {
    #[serde(default)]
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub first_level_block_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct BlockHolder {
    block: Block,
}

/// Client for the docx endpoints.
#[derive(Clone)]
pub struct DocxApi {
    client: ApiClient,
}

impl DocxApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the document's plain-text content.
    pub async fn raw_content(&self, document_id: &str) -> ApiResult<String> {
        let payload: RawContent = self
            .client
            .get(
                &format!("/docx/v1/documents/{document_id}/raw_content"),
                &[("lang", "0".to_string())],
            )
            .await?;
        Ok(payload.content)
    }

    /// Fetch one page of the document's blocks.
    ///
    /// `page_size` is clamped to the endpoint's limit. The latest revision
    /// is always requested.
    pub async fn list_blocks(
        &self,
        document_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> ApiResult<Page<Block>> {
        let mut query = vec![
            ("document_revision_id", "-1".to_string()),
            ("page_size", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }

        self.client
            .get(&format!("/docx/v1/documents/{document_id}/blocks"), &query)
            .await
    }

    /// Fetch all blocks of a document, following pagination.
    pub async fn list_all_blocks(&self, document_id: &str) -> ApiResult<Vec<Block>> {
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_blocks(document_id, MAX_PAGE_SIZE, page_token.as_deref())
                .await?;
            let next = page.next_token().map(|t| t.to_string());
            all.extend(page.items);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(document_id = %document_id, blocks = all.len(), "Fetched document blocks");
        Ok(all)
    }

    /// Fetch a single block.
    pub async fn get_block(&self, document_id: &str, block_id: &str) -> ApiResult<Block> {
        let holder: BlockHolder = self
            .client
            .get(
                &format!("/docx/v1/documents/{document_id}/blocks/{block_id}"),
                &[],
            )
            .await?;
        Ok(holder.block)
    }

    /// Convert Markdown text into block payloads.
    pub async fn convert_markdown(&self, markdown: &str) -> ApiResult<ConvertedBlocks> {
        let body = serde_json::json!({
            "content_type": "markdown",
            "content": markdown,
        });

        self.client
            .post("/docx/v1/documents/blocks/convert", &body)
            .await
    }

    /// Insert block payloads under an existing block.
    pub async fn create_descendants(
        &self,
        document_id: &str,
        block_id: &str,
        children_ids: &[String],
        descendants: &[Value],
        index: u32,
    ) -> ApiResult<Value> {
        let body = serde_json::json!({
            "children_id": children_ids,
            "index": index,
            "descendants": descendants,
        });

        self.client
            .post(
                &format!("/docx/v1/documents/{document_id}/blocks/{block_id}/descendant"),
                &body,
            )
            .await
    }
}
