//! Typed clients for the platform's open APIs.
//!
//! Everything goes through [`ApiClient`], which attaches the user access
//! token (via the [`TokenProvider`] seam) and unwraps the platform's
//! `{code, msg, data}` response envelope. On top of it sit thin typed
//! clients:
//!
//! - [`DocxApi`] — document raw content, block listing (paginated),
//!   Markdown conversion, block insertion
//! - [`WikiApi`] — wiki space node operations
//! - [`DriveApi`] — media download

mod client;
mod docx;
mod drive;
mod error;
mod wiki;

pub use client::{ApiClient, Page, StaticTokenProvider, TokenProvider};
pub use docx::{
    Block, CodeBlock, CodeStyle, ConvertedBlocks, DocxApi, FileBlock, ImageBlock, Link,
    OrderedBlock, OrderedStyle, TextElement, TextRun, TextSpans, TextStyle,
};
pub use drive::DriveApi;
pub use error::{ApiError, ApiResult};
pub use wiki::{CopyNode, CreateNode, Node, NodeType, ObjType, WikiApi};
