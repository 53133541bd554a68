/// Position in source string (byte offset).
pub type Pos = usize;

/// All token kinds produced by the lexer.
///
/// Numbers, operators and punctuation are `Other`; quoted identifiers are
/// `Identifier`. Dollar-quoted and alternative-quoted literals are
/// `StringLiteral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Keyword,
    Identifier,
    StringLiteral,
    Delimiter,
    Whitespace,
    Comment,
    Parameter,
    Variable,
    ControlCommandMarker,
    Other,
}

impl TokenKind {
    /// Tokens that take part in statement structure (not whitespace or comments).
    pub fn is_significant(self) -> bool {
        !matches!(self, Self::Whitespace | Self::Comment)
    }

    pub fn is_word(self) -> bool {
        matches!(self, Self::Keyword | Self::Identifier)
    }

    /// Tokens that carry a bind placeholder.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::Parameter | Self::Variable)
    }
}

/// An immutable token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub kind: TokenKind,
    pub text: String,
    pub start: Pos,
    pub length: usize,
}

impl TokenEntry {
    pub fn new(kind: TokenKind, text: &str, start: Pos) -> Self {
        Self {
            kind,
            text: text.to_string(),
            start,
            length: text.len(),
        }
    }

    pub fn end(&self) -> Pos {
        self.start + self.length
    }

    pub fn is_significant(&self) -> bool {
        self.kind.is_significant()
    }

    /// True if `offset` falls inside this token.
    pub fn contains(&self, offset: Pos) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// Number of line feeds inside the token text.
    pub fn line_feeds(&self) -> usize {
        memchr::memchr_iter(b'\n', self.text.as_bytes()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significance() {
        assert!(TokenKind::Keyword.is_significant());
        assert!(TokenKind::Delimiter.is_significant());
        assert!(TokenKind::ControlCommandMarker.is_significant());
        assert!(!TokenKind::Whitespace.is_significant());
        assert!(!TokenKind::Comment.is_significant());
    }

    #[test]
    fn test_word_and_placeholder_classification() {
        assert!(TokenKind::Keyword.is_word());
        assert!(TokenKind::Identifier.is_word());
        assert!(!TokenKind::StringLiteral.is_word());

        assert!(TokenKind::Parameter.is_placeholder());
        assert!(TokenKind::Variable.is_placeholder());
        assert!(!TokenKind::Identifier.is_placeholder());
    }

    #[test]
    fn test_token_creation() {
        let tok = TokenEntry::new(TokenKind::Identifier, "foo", 5);
        assert_eq!(tok.kind, TokenKind::Identifier);
        assert_eq!(tok.text, "foo");
        assert_eq!(tok.start, 5);
        assert_eq!(tok.length, 3);
        assert_eq!(tok.end(), 8);
        assert!(tok.contains(5));
        assert!(tok.contains(7));
        assert!(!tok.contains(8));
    }

    #[test]
    fn test_line_feeds() {
        let tok = TokenEntry::new(TokenKind::Whitespace, " \n\n  \n", 0);
        assert_eq!(tok.line_feeds(), 3);
    }
}
