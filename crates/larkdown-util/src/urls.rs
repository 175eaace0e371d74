//! Resource-URL token extraction.
//!
//! Platform resources are shared as URLs (`https://sample.feishu.cn/docx/<token>`);
//! the APIs want the bare token plus the resource kind. This module maps the
//! known URL shapes to tokens.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Domains the platform serves resources from.
const RESOURCE_DOMAINS: &[&str] = &[
    "feishu.cn",
    "larksuite.com",
    "feishu.com",
    "lark.cn",
    "larkenterprise.com",
];

/// Kind of resource a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Drive folder.
    Folder,
    /// Drive file.
    File,
    /// Legacy document.
    Doc,
    /// New-style document (docx).
    Document,
    /// Spreadsheet.
    Spreadsheet,
    /// Bitable base.
    Base,
    /// Wiki space settings page.
    WikiSpace,
    /// Wiki node.
    WikiNode,
    /// Unrecognized URL.
    Unknown,
}

/// Result of token extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    /// The extracted token, empty when the URL is not recognized.
    pub token: String,
    /// Resource kind.
    pub kind: ResourceKind,
}

impl TokenRef {
    fn unknown() -> Self {
        Self {
            token: String::new(),
            kind: ResourceKind::Unknown,
        }
    }
}

// Order matters: `/wiki/settings/` must match before `/wiki/`.
static URL_PATTERNS: Lazy<Vec<(Regex, ResourceKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"/drive/folder/([^/#?]+)").unwrap(),
            ResourceKind::Folder,
        ),
        (Regex::new(r"/file/([^/#?]+)").unwrap(), ResourceKind::File),
        (Regex::new(r"/docs/([^/#?]+)").unwrap(), ResourceKind::Doc),
        (
            Regex::new(r"/docx/([^/#?]+)").unwrap(),
            ResourceKind::Document,
        ),
        (
            Regex::new(r"/sheets/([^/#?]+)").unwrap(),
            ResourceKind::Spreadsheet,
        ),
        (Regex::new(r"/base/([^/#?]+)").unwrap(), ResourceKind::Base),
        (
            Regex::new(r"/wiki/settings/([^/#?]+)").unwrap(),
            ResourceKind::WikiSpace,
        ),
        (
            Regex::new(r"/wiki/([^/#?]+)").unwrap(),
            ResourceKind::WikiNode,
        ),
    ]
});

fn is_resource_domain(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| {
                RESOURCE_DOMAINS
                    .iter()
                    .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
            })
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Extract the resource token from a platform URL.
///
/// Returns a [`TokenRef`] with [`ResourceKind::Unknown`] and an empty token
/// when the host is not a platform domain or no pattern matches.
pub fn extract_token(url: &str) -> TokenRef {
    if !is_resource_domain(url) {
        return TokenRef::unknown();
    }

    // Strip fragment and query before matching.
    let clean = url
        .split('#')
        .next()
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("");

    for (pattern, kind) in URL_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(clean) {
            if let Some(token) = captures.get(1) {
                return TokenRef {
                    token: token.as_str().to_string(),
                    kind: *kind,
                };
            }
        }
    }

    TokenRef::unknown()
}

/// Check whether a URL is a recognized platform resource URL.
pub fn is_resource_url(url: &str) -> bool {
    let result = extract_token(url);
    result.kind != ResourceKind::Unknown && !result.token.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_document_token() {
        let result = extract_token("https://sample.feishu.cn/docx/UXEAd6cRUoj5pexJZr0cdwaFnpd");
        assert_eq!(result.kind, ResourceKind::Document);
        assert_eq!(result.token, "UXEAd6cRUoj5pexJZr0cdwaFnpd");
    }

    #[test]
    fn test_extract_wiki_node_token() {
        let result = extract_token("https://trip.larkenterprise.com/wiki/EwALwz4TtiX0fjkRfXUc8zxInIg");
        assert_eq!(result.kind, ResourceKind::WikiNode);
        assert_eq!(result.token, "EwALwz4TtiX0fjkRfXUc8zxInIg");
    }

    #[test]
    fn test_wiki_settings_wins_over_wiki() {
        let result = extract_token("https://sample.feishu.cn/wiki/settings/7034502641455497244");
        assert_eq!(result.kind, ResourceKind::WikiSpace);
        assert_eq!(result.token, "7034502641455497244");
    }

    #[test]
    fn test_fragment_and_query_stripped() {
        let result = extract_token("https://sample.feishu.cn/docs/2olt0Ts4Mds7j7iqzdwrqEUnO7q#heading-3");
        assert_eq!(result.kind, ResourceKind::Doc);
        assert_eq!(result.token, "2olt0Ts4Mds7j7iqzdwrqEUnO7q");

        let result = extract_token("https://sample.feishu.cn/sheets/shtcn6Xyz?sheet=ab12cd");
        assert_eq!(result.kind, ResourceKind::Spreadsheet);
        assert_eq!(result.token, "shtcn6Xyz");
    }

    #[test]
    fn test_foreign_domain_rejected() {
        let result = extract_token("https://docs.google.com/docx/abcdef");
        assert_eq!(result.kind, ResourceKind::Unknown);
        assert!(result.token.is_empty());
    }

    #[test]
    fn test_domain_must_be_suffix_component() {
        // "notfeishu.cn.evil.com" must not pass the domain check
        let result = extract_token("https://feishu.cn.evil.com/docx/abcdef");
        assert_eq!(result.kind, ResourceKind::Unknown);
    }

    #[test]
    fn test_folder_url() {
        let result =
            extract_token("https://sample.feishu.cn/drive/folder/cSJe2JgtFFBwRuTKAJK6baNGUn0");
        assert_eq!(result.kind, ResourceKind::Folder);
        assert_eq!(result.token, "cSJe2JgtFFBwRuTKAJK6baNGUn0");
    }

    #[test]
    fn test_is_resource_url() {
        assert!(is_resource_url("https://sample.feishu.cn/docx/abc123"));
        assert!(is_resource_url("https://a.larksuite.com/wiki/xyz"));
        assert!(!is_resource_url("https://google.com"));
        assert!(!is_resource_url("https://sample.feishu.cn/unknown/abc"));
        assert!(!is_resource_url("not a url"));
    }
}
