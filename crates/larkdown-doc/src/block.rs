//! Block kind classification.

/// Semantic kind of a document block, decoded from the numeric
/// `block_type` the platform assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Document root carrying the title.
    Page,
    /// Plain paragraph.
    Text,
    /// Heading with level 1..=6.
    Heading(u8),
    /// Unordered list item.
    Bullet,
    /// Ordered list item.
    Ordered,
    /// Code block.
    Code,
    /// Callout box; renders its children as a quote.
    Callout,
    /// File or video attachment.
    File,
    /// Image.
    Image,
    /// View container wrapping an attachment.
    View,
    /// Quote container; renders its children as a quote.
    QuoteContainer,
    /// Anything this engine doesn't interpret.
    Other(u16),
}

impl BlockKind {
    /// Decode a numeric block type.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => BlockKind::Page,
            2 => BlockKind::Text,
            3..=8 => BlockKind::Heading((code - 2) as u8),
            12 => BlockKind::Bullet,
            13 => BlockKind::Ordered,
            14 => BlockKind::Code,
            19 => BlockKind::Callout,
            23 => BlockKind::File,
            27 => BlockKind::Image,
            33 => BlockKind::View,
            34 => BlockKind::QuoteContainer,
            other => BlockKind::Other(other),
        }
    }

    /// Whether descendants of this block render inside a quote.
    pub fn opens_quote(&self) -> bool {
        matches!(self, BlockKind::QuoteContainer | BlockKind::Callout)
    }

    /// Whether this is a list item.
    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::Bullet | BlockKind::Ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(BlockKind::from_code(1), BlockKind::Page);
        assert_eq!(BlockKind::from_code(2), BlockKind::Text);
        assert_eq!(BlockKind::from_code(3), BlockKind::Heading(1));
        assert_eq!(BlockKind::from_code(8), BlockKind::Heading(6));
        assert_eq!(BlockKind::from_code(12), BlockKind::Bullet);
        assert_eq!(BlockKind::from_code(13), BlockKind::Ordered);
        assert_eq!(BlockKind::from_code(14), BlockKind::Code);
        assert_eq!(BlockKind::from_code(27), BlockKind::Image);
        assert_eq!(BlockKind::from_code(34), BlockKind::QuoteContainer);
        assert_eq!(BlockKind::from_code(99), BlockKind::Other(99));
    }

    #[test]
    fn test_opens_quote() {
        assert!(BlockKind::QuoteContainer.opens_quote());
        assert!(BlockKind::Callout.opens_quote());
        assert!(!BlockKind::Text.opens_quote());
    }

    #[test]
    fn test_is_list_item() {
        assert!(BlockKind::Bullet.is_list_item());
        assert!(BlockKind::Ordered.is_list_item());
        assert!(!BlockKind::Code.is_list_item());
    }
}
