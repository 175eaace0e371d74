//! Path utilities.
//!
//! This module provides the larkdown directory layout and helpers for
//! computing Markdown-friendly relative paths.

use std::path::{Path, PathBuf};

/// Get the larkdown configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/larkdown` if set
/// - `~/.config/larkdown` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("larkdown"))
}

/// Get the larkdown data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/larkdown` if set
/// - `~/.local/share/larkdown` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("larkdown"))
}

/// Default location of the persisted user token.
pub fn default_auth_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("auth.json"))
}

/// Make a path relative to a base directory.
///
/// Returns `None` if the path is not within the base directory.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Compute the path to `target` relative to `from_dir`, joined with forward
/// slashes regardless of the host separator.
///
/// Markdown links use `/` on every platform; image references produced by
/// the exporter go through this. Falls back to the full target path when
/// the two share no common prefix.
pub fn relative_markdown_path(from_dir: &Path, target: &Path) -> String {
    let relative = pathdiff(from_dir, target).unwrap_or_else(|| target.to_path_buf());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative path from `base` to `path` without touching the filesystem.
fn pathdiff(base: &Path, path: &Path) -> Option<PathBuf> {
    let base_components: Vec<_> = base.components().collect();
    let path_components: Vec<_> = path.components().collect();

    let common = base_components
        .iter()
        .zip(path_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 && base.is_absolute() != path.is_absolute() {
        return None;
    }

    let mut result = PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component);
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("larkdown"));
    }

    #[test]
    fn test_default_auth_path() {
        let path = default_auth_path().unwrap();
        assert!(path.ends_with("larkdown/auth.json"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/home/user/notes");
        let path = Path::new("/home/user/notes/images/a.png");
        assert_eq!(
            relative_to(path, base),
            Some(PathBuf::from("images/a.png"))
        );
        assert_eq!(relative_to(Path::new("/etc/passwd"), base), None);
    }

    #[test]
    fn test_relative_markdown_path_subdir() {
        let rel = relative_markdown_path(
            Path::new("/docs/out"),
            Path::new("/docs/out/images/pic.png"),
        );
        assert_eq!(rel, "images/pic.png");
    }

    #[test]
    fn test_relative_markdown_path_sibling() {
        let rel = relative_markdown_path(
            Path::new("/docs/out/md"),
            Path::new("/docs/out/images/pic.png"),
        );
        assert_eq!(rel, "../images/pic.png");
    }

    #[test]
    fn test_relative_markdown_path_uses_forward_slashes() {
        let rel = relative_markdown_path(
            Path::new("/a"),
            Path::new("/a/b/c/d.png"),
        );
        assert!(!rel.contains('\\'));
        assert_eq!(rel, "b/c/d.png");
    }
}
