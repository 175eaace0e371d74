//! Block-tree ⇄ Markdown conversion engine and document services.
//!
//! The centerpiece is [`MarkdownRenderer`]: document blocks arrive as a flat
//! list describing an implicit tree (`children` ids + `parent_id`), and the
//! renderer walks that tree depth-first into Markdown text. Around it:
//!
//! - [`DocExporter`] — fetches all blocks (paginated), runs the image
//!   pipeline, renders; also raw text, link extraction, statistics
//! - [`MarkdownComposer`] — the reverse direction, via the platform's
//!   Markdown-conversion endpoint
//! - [`NodeExplorer`] — wiki node trees, title search, node paths, and
//!   inserting Markdown as new documents

mod block;
mod compose;
mod error;
mod export;
mod images;
mod markdown;
mod nodes;

pub use block::BlockKind;
pub use compose::MarkdownComposer;
pub use error::{DocError, DocResult};
pub use export::{DocExporter, DocStatistics, ExportOptions};
pub use images::{collect_image_tokens, download_images, token_hash, ImageMap};
pub use markdown::MarkdownRenderer;
pub use nodes::{InsertMode, InsertOutcome, NodeExplorer, NodePath, NodeTree};
