//! larkdown — a client for Lark-style document/wiki platforms.
//!
//! Ties together the workspace crates into one entry point:
//!
//! - [`larkdown_auth`] handles the OAuth authorization-code flow with a
//!   local callback server, persisted tokens, and expiry-aware refresh
//! - [`larkdown_api`] provides the typed docx/wiki/drive clients
//! - [`larkdown_doc`] converts block trees to Markdown (and back through
//!   the platform's conversion endpoint)
//!
//! # Example
//!
//! ```no_run
//! use larkdown::{AppCredentials, DownloadOptions, Larkdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Larkdown::new(AppCredentials::new(
//!         "cli_a1b2c3",
//!         "secret",
//!         "http://localhost:3000/callback",
//!     ))?;
//!
//!     client.login().await?;
//!
//!     let report = client
//!         .download_document(
//!             "https://sample.feishu.cn/wiki/EwALwz4TtiX0fjkRfXUc8zxInIg",
//!             DownloadOptions::new("handbook.md"),
//!         )
//!         .await?;
//!
//!     println!("wrote {} lines, {} images", report.lines, report.images);
//!     Ok(())
//! }
//! ```

mod client;
mod download;
mod error;

pub use client::{FlowTokenProvider, Larkdown};
pub use download::{DownloadOptions, DownloadReport};
pub use error::{Error, Result};

pub use larkdown_api::{
    ApiClient, ApiError, Block, DocxApi, DriveApi, Node, ObjType, Page, StaticTokenProvider,
    TokenProvider, WikiApi,
};
pub use larkdown_auth::{AppCredentials, AuthError, LoginFlow, TokenStore, UserToken};
pub use larkdown_doc::{
    DocError, DocExporter, DocStatistics, ExportOptions, ImageMap, InsertMode, InsertOutcome,
    MarkdownComposer, MarkdownRenderer, NodeExplorer, NodePath, NodeTree,
};
pub use larkdown_util::{extract_token, is_resource_url, ResourceKind, TokenRef};
