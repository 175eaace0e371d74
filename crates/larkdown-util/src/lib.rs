//! Shared utilities for larkdown.
//!
//! This crate provides the small pieces used across the larkdown workspace:
//! - Platform directory lookup (config/data paths)
//! - Resource-URL token extraction
//! - Logging setup with tracing

pub mod log;
pub mod path;
pub mod urls;

pub use urls::{extract_token, is_resource_url, ResourceKind, TokenRef};

/// Get the current time in seconds since Unix epoch.
pub fn current_time_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
