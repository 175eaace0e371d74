//! Block-tree to Markdown rendering.
//!
//! Blocks arrive as a flat list; `children` ids describe the tree. The
//! renderer finds the root, then walks depth-first, emitting Markdown per
//! block kind. Quote containers and callouts put their descendants behind
//! `> ` prefixes.

use crate::block::BlockKind;
use crate::images::ImageMap;
use larkdown_api::{Block, TextElement};
use std::collections::HashMap;

/// Renders a document's blocks to Markdown.
pub struct MarkdownRenderer<'a> {
    map: HashMap<&'a str, &'a Block>,
    images: &'a ImageMap,
    out: Vec<String>,
}

impl<'a> MarkdownRenderer<'a> {
    /// Render `blocks` into Markdown.
    ///
    /// `doc_token` identifies the root block (the platform gives the root
    /// the document's own id). Unknown roots degrade gracefully: a
    /// parentless page block, any parentless block, or the first block.
    pub fn render(blocks: &'a [Block], images: &'a ImageMap, doc_token: &str) -> String {
        if blocks.is_empty() {
            return String::new();
        }

        let map: HashMap<&str, &Block> = blocks
            .iter()
            .map(|block| (block.block_id.as_str(), block))
            .collect();

        let root = find_root(blocks, &map, doc_token);

        let mut renderer = Self {
            map,
            images,
            out: Vec::new(),
        };

        if root.children.is_empty() {
            renderer.emit_block(root, false);
        } else {
            renderer.emit_children(root, false);
        }

        let mut markdown = renderer.out.concat();
        markdown.truncate(markdown.trim_end_matches('\n').len());
        markdown.push('\n');
        markdown
    }

    fn emit_children(&mut self, block: &Block, in_quote: bool) {
        for child_id in &block.children {
            if let Some(&child) = self.map.get(child_id.as_str()) {
                self.emit_block(child, in_quote);
            }
        }
    }

    fn emit_block(&mut self, block: &Block, in_quote: bool) {
        let kind = BlockKind::from_code(block.block_type);
        let prefix = if in_quote { "> " } else { "" };
        let mut emitted = false;

        match kind {
            BlockKind::Page => {
                if let Some(title) = block.page.as_ref().map(|p| render_spans(&p.elements)) {
                    if !title.trim().is_empty() {
                        self.out.push(format!("# {title}\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::Text => {
                if let Some(text) = block.text.as_ref().map(|t| render_spans(&t.elements)) {
                    if !text.trim().is_empty() {
                        self.out.push(format!("{prefix}{text}\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::Heading(level) => {
                if let Some(spans) = heading_spans(block, level) {
                    let text = render_spans(&spans.elements);
                    if !text.trim().is_empty() {
                        let hashes = "#".repeat(level as usize);
                        self.out.push(format!("{hashes} {text}\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::Bullet => {
                if let Some(text) = block.bullet.as_ref().map(|b| render_spans(&b.elements)) {
                    if !text.trim().is_empty() {
                        self.out.push(format!("{prefix}- {text}\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::Ordered => {
                if let Some(ordered) = &block.ordered {
                    let text = render_spans(&ordered.elements);
                    if !text.trim().is_empty() {
                        let sequence = ordered
                            .style
                            .as_ref()
                            .and_then(|s| s.sequence.as_deref())
                            .filter(|s| *s != "auto")
                            .unwrap_or("1");
                        self.out.push(format!("{prefix}{sequence}. {text}\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::Code => {
                if let Some(code) = &block.code {
                    let text: String = code
                        .elements
                        .iter()
                        .filter_map(|e| e.text_run.as_ref())
                        .map(|run| run.content.as_str())
                        .collect();
                    if !text.trim().is_empty() {
                        let tag = code
                            .style
                            .as_ref()
                            .and_then(|s| s.language)
                            .and_then(language_tag)
                            .unwrap_or("");
                        self.out.push(format!("```{tag}\n{text}\n```\n"));
                        emitted = true;
                    }
                }
            }
            BlockKind::File => {
                if let Some(file) = &block.file {
                    if is_video_name(&file.name) {
                        self.out.push(format!(
                            "<video data-token=\"{}\" data-name=\"{}\"></video>\n",
                            file.token, file.name
                        ));
                    } else {
                        self.out
                            .push(format!("[{}](file://{})\n", file.name, file.token));
                    }
                    emitted = true;
                }
            }
            BlockKind::Image => {
                if let Some(image) = &block.image {
                    if !image.token.is_empty() {
                        let path = self.images.path_for(&image.token);
                        self.out.push(format!("![img]({path})\n"));
                        emitted = true;
                    }
                }
            }
            // Containers emit nothing themselves; their children carry the content.
            BlockKind::Callout | BlockKind::View | BlockKind::QuoteContainer => {}
            BlockKind::Other(_) => {
                // Unknown kinds still often carry text spans.
                if let Some(text) = block.text.as_ref().map(|t| render_spans(&t.elements)) {
                    if !text.trim().is_empty() {
                        self.out.push(format!("{prefix}{text}\n"));
                        emitted = true;
                    }
                }
            }
        }

        if emitted && blank_line_after(kind, in_quote) {
            self.out.push("\n".to_string());
        }

        if !block.children.is_empty() {
            self.emit_children(block, in_quote || kind.opens_quote());
        }
    }
}

/// Whether a blank line follows the block.
///
/// Consecutive text lines inside a quote stay joined under their `> `
/// prefixes, and list items only separate when quoted.
fn blank_line_after(kind: BlockKind, in_quote: bool) -> bool {
    if in_quote && kind == BlockKind::Text {
        return false;
    }
    if kind.is_list_item() {
        return in_quote;
    }
    true
}

fn heading_spans(block: &Block, level: u8) -> Option<&larkdown_api::TextSpans> {
    match level {
        1 => block.heading1.as_ref(),
        2 => block.heading2.as_ref(),
        3 => block.heading3.as_ref(),
        4 => block.heading4.as_ref(),
        5 => block.heading5.as_ref(),
        6 => block.heading6.as_ref(),
        _ => None,
    }
}

/// Render text elements with inline styling.
///
/// Styles nest bold-innermost (`` `~~***text***~~` ``); a link wraps the
/// fully styled text.
pub(crate) fn render_spans(elements: &[TextElement]) -> String {
    elements
        .iter()
        .filter_map(|element| element.text_run.as_ref())
        .map(|run| {
            if run.content.is_empty() {
                return String::new();
            }

            let mut text = run.content.clone();
            if let Some(style) = &run.text_element_style {
                if style.bold {
                    text = format!("**{text}**");
                }
                if style.italic {
                    text = format!("*{text}*");
                }
                if style.strikethrough {
                    text = format!("~~{text}~~");
                }
                if style.inline_code {
                    text = format!("`{text}`");
                }
                if let Some(link) = &style.link {
                    if !link.url.is_empty() {
                        text = format!("[{text}]({})", link.url);
                    }
                }
            }
            text
        })
        .collect()
}

fn is_video_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    [".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Map the platform's numeric code-block language ids to fence tags.
///
/// Unknown ids produce an untagged fence.
fn language_tag(code: u16) -> Option<&'static str> {
    match code {
        7 => Some("bash"),
        8 => Some("csharp"),
        9 => Some("cpp"),
        10 => Some("c"),
        12 => Some("css"),
        15 => Some("dart"),
        18 => Some("dockerfile"),
        22 => Some("go"),
        25 => Some("html"),
        29 => Some("json"),
        30 => Some("java"),
        31 => Some("javascript"),
        33 => Some("kotlin"),
        37 => Some("lua"),
        39 => Some("makefile"),
        40 => Some("markdown"),
        44 => Some("php"),
        50 => Some("python"),
        53 => Some("ruby"),
        54 => Some("rust"),
        56 => Some("scss"),
        57 => Some("sql"),
        58 => Some("scala"),
        61 => Some("shell"),
        62 => Some("swift"),
        64 => Some("typescript"),
        67 => Some("xml"),
        68 => Some("yaml"),
        _ => None,
    }
}

/// Pick the root block of a document.
fn find_root<'a>(
    blocks: &'a [Block],
    map: &HashMap<&'a str, &'a Block>,
    doc_token: &str,
) -> &'a Block {
    if let Some(&root) = map.get(doc_token) {
        return root;
    }

    let orphans: Vec<&Block> = blocks
        .iter()
        .filter(|block| {
            block.parent_id.is_empty()
                || block.parent_id == "0"
                || block.parent_id == doc_token
                || !map.contains_key(block.parent_id.as_str())
        })
        .collect();

    orphans
        .iter()
        .find(|block| BlockKind::from_code(block.block_type) == BlockKind::Page)
        .or_else(|| orphans.first())
        .copied()
        .unwrap_or(&blocks[0])
}
