//! Markdown to document-block composition.
//!
//! The platform owns the Markdown parser: text goes to the conversion
//! endpoint, the returned block payloads are cleaned up, and then inserted
//! into the target document as descendants of its root block.

use crate::error::{DocError, DocResult};
use larkdown_api::DocxApi;
use serde_json::Value;
use tracing::debug;

/// Writes Markdown content into documents.
pub struct MarkdownComposer {
    docx: DocxApi,
}

impl MarkdownComposer {
    pub fn new(docx: DocxApi) -> Self {
        Self { docx }
    }

    /// Convert `markdown` and append the resulting blocks to the document.
    pub async fn append(&self, document_id: &str, markdown: &str) -> DocResult<Value> {
        let converted = self.docx.convert_markdown(markdown).await?;

        if converted.blocks.is_empty() {
            return Err(DocError::conversion("no blocks produced"));
        }
        if converted.first_level_block_ids.is_empty() {
            return Err(DocError::conversion("no first-level blocks produced"));
        }

        let cleaned: Vec<Value> = converted.blocks.into_iter().map(strip_merge_info).collect();

        debug!(
            document_id = %document_id,
            blocks = cleaned.len(),
            "Inserting converted blocks"
        );

        // The document root shares the document's id.
        Ok(self
            .docx
            .create_descendants(
                document_id,
                document_id,
                &converted.first_level_block_ids,
                &cleaned,
                0,
            )
            .await?)
    }
}

/// Remove the `table.property.merge_info` field from a block payload.
///
/// The conversion endpoint emits it but the insertion endpoint rejects it.
fn strip_merge_info(mut block: Value) -> Value {
    if let Some(property) = block
        .get_mut("table")
        .and_then(|t| t.get_mut("property"))
        .and_then(|p| p.as_object_mut())
    {
        property.remove("merge_info");
    }
    block
}
