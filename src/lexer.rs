use std::ops::Range;

use memchr::{memchr, memmem, memrchr};

use crate::dialect::Dialect;
use crate::string_utils::{is_identifier_char, skip_quoted};
use crate::token::{Pos, TokenEntry, TokenKind};

/// Lazy, restartable tokenizer over a range of a script.
///
/// Offsets in produced tokens are absolute byte offsets into the full
/// source. Line-start checks look at the full source, so lexing a
/// sub-range yields the same tokens as lexing the whole text.
pub struct Lexer<'a> {
    source: &'a str,
    dialect: &'a Dialect,
    pos: Pos,
    end: Pos,
    delimiter: String,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, dialect: &'a Dialect) -> Self {
        Self::with_range(source, 0..source.len(), dialect)
    }

    pub fn with_range(source: &'a str, range: Range<Pos>, dialect: &'a Dialect) -> Self {
        let mut lexer = Self {
            source,
            dialect,
            pos: 0,
            end: 0,
            delimiter: dialect.statement_delimiter.clone(),
        };
        lexer.set_range(range);
        lexer
    }

    /// Continue lexing from `pos` (clamped to the current range).
    pub fn reset(&mut self, pos: Pos) {
        self.pos = floor_char_boundary(self.source, pos.min(self.end));
    }

    pub fn set_range(&mut self, range: Range<Pos>) {
        self.end = floor_char_boundary(self.source, range.end.min(self.source.len()));
        self.pos = floor_char_boundary(self.source, range.start.min(self.end));
    }

    /// The statement delimiter currently in effect.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Change the statement delimiter. A blank value restores the dialect
    /// default.
    pub fn set_delimiter(&mut self, delimiter: &str) {
        let delimiter = delimiter.trim();
        self.delimiter = if delimiter.is_empty() {
            self.dialect.statement_delimiter.clone()
        } else {
            delimiter.to_string()
        };
    }

    pub fn is_statement_delimiter(&self, text: &str) -> bool {
        self.delimiter.eq_ignore_ascii_case(text)
    }

    fn scan_token(&self, pos: Pos) -> (TokenKind, usize) {
        let text = &self.source[..self.end];
        let bytes = text.as_bytes();
        let rest = &bytes[pos..];
        let b = rest[0];
        let dialect = self.dialect;

        if b.is_ascii_whitespace() {
            let len = rest.iter().take_while(|c| c.is_ascii_whitespace()).count();
            return (TokenKind::Whitespace, len);
        }

        if let Some(len) = self.scan_control_line(pos) {
            return (TokenKind::ControlCommandMarker, len);
        }

        if let Some(len) = self.scan_comment(rest) {
            return (TokenKind::Comment, len);
        }

        if let Some(len) = self.scan_line_delimiter(pos) {
            return (TokenKind::Delimiter, len);
        }

        if let Some(len) = self.scan_statement_delimiter(pos) {
            return (TokenKind::Delimiter, len);
        }

        if b == b'$' {
            if dialect.variables {
                if let Some(len) = scan_variable(rest) {
                    return (TokenKind::Variable, len);
                }
            }
            if dialect.dollar_quoting {
                if let Some(len) = scan_dollar_string(rest) {
                    return (TokenKind::StringLiteral, len);
                }
            }
        }

        if dialect.alternative_quoting && matches!(b, b'q' | b'Q' | b'n' | b'N') {
            if let Some(len) = scan_alternative_quote(&text[pos..]) {
                return (TokenKind::StringLiteral, len);
            }
        }

        let c = text[pos..].chars().next().unwrap_or('\0');

        if c == dialect.string_quote && c.is_ascii() {
            let len = skip_quoted(rest, 0, c as u8, dialect.backslash_escapes);
            return (TokenKind::StringLiteral, len);
        }

        for &(open, close) in &dialect.identifier_quotes {
            if c == open && close.is_ascii() {
                return (TokenKind::Identifier, skip_quoted(rest, 0, close as u8, false));
            }
        }

        if dialect.named_parameter_prefix == Some(c) {
            if let Some(len) = self.scan_named_parameter(pos, c) {
                return (TokenKind::Parameter, len);
            }
        }

        if dialect.anonymous_parameter_mark == Some(c) {
            return (TokenKind::Parameter, c.len_utf8());
        }

        if b.is_ascii_digit() || (b == b'.' && rest.get(1).is_some_and(u8::is_ascii_digit)) {
            return (TokenKind::Other, scan_number(rest));
        }

        if c.is_alphabetic() || c == '_' {
            let len = self.word_length(pos);
            let kind = if dialect.is_keyword(&text[pos..pos + len]) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            return (kind, len);
        }

        (TokenKind::Other, c.len_utf8())
    }

    /// True when only blanks precede `pos` on its line.
    fn at_line_start(&self, pos: Pos) -> bool {
        let before = &self.source.as_bytes()[..pos];
        let line_begin = memrchr(b'\n', before).map_or(0, |i| i + 1);
        before[line_begin..]
            .iter()
            .all(|b| matches!(b, b' ' | b'\t' | b'\r'))
    }

    /// A control line runs to the end of its line, line break excluded.
    fn scan_control_line(&self, pos: Pos) -> Option<usize> {
        let text = &self.source[pos..self.end];
        let is_marker = match self.dialect.control_command_marker {
            Some(marker) => {
                let mut chars = text.chars();
                chars.next() == Some(marker) && chars.next().is_some_and(char::is_alphabetic)
            }
            None => false,
        };
        let is_redefiner = !is_marker
            && self.dialect.delimiter_redefiner.as_deref().is_some_and(|word| {
                starts_with_ignore_case(text.as_bytes(), word.as_bytes())
                    && text[word.len()..]
                        .chars()
                        .next()
                        .map_or(true, char::is_whitespace)
            });
        if !(is_marker || is_redefiner) || !self.at_line_start(pos) {
            return None;
        }
        Some(line_length(text.as_bytes()))
    }

    fn scan_comment(&self, rest: &[u8]) -> Option<usize> {
        for prefix in &self.dialect.single_line_comments {
            if rest.starts_with(prefix.as_bytes()) {
                return Some(memchr(b'\n', rest).unwrap_or(rest.len()));
            }
        }
        if let Some((open, close)) = &self.dialect.block_comment {
            if rest.starts_with(open.as_bytes()) {
                let body = &rest[open.len()..];
                return Some(match memmem::find(body, close.as_bytes()) {
                    Some(idx) => open.len() + idx + close.len(),
                    None => rest.len(),
                });
            }
        }
        None
    }

    /// Line delimiters count only when alone on their line.
    fn scan_line_delimiter(&self, pos: Pos) -> Option<usize> {
        let rest = &self.source.as_bytes()[pos..self.end];
        for delimiter in &self.dialect.line_delimiters {
            let len = delimiter.len();
            if !starts_with_ignore_case(rest, delimiter.as_bytes()) {
                continue;
            }
            let tail = &rest[len..];
            let eol = memchr(b'\n', tail).unwrap_or(tail.len());
            if tail[..eol].iter().all(u8::is_ascii_whitespace) && self.at_line_start(pos) {
                return Some(len);
            }
        }
        None
    }

    fn scan_statement_delimiter(&self, pos: Pos) -> Option<usize> {
        let text = &self.source[..self.end];
        let delimiter = self.delimiter.as_str();
        if !starts_with_ignore_case(&text.as_bytes()[pos..], delimiter.as_bytes()) {
            return None;
        }
        // A word delimiter (`GO`) is not matched inside a longer word; a
        // symbol delimiter (`$$`, `//`) may touch one (`END$$`).
        let starts_word = delimiter.chars().next().is_some_and(is_word_char);
        if starts_word && text[..pos].chars().next_back().is_some_and(is_identifier_char) {
            return None;
        }
        let ends_word = delimiter.chars().next_back().is_some_and(is_word_char);
        let after = pos + delimiter.len();
        if ends_word && text[after..].chars().next().is_some_and(is_identifier_char) {
            return None;
        }
        Some(delimiter.len())
    }

    /// Word length, stopping early where a non-word delimiter begins
    /// (`END$$` is `END` followed by the delimiter).
    fn word_length(&self, pos: Pos) -> usize {
        let text = &self.source[pos..self.end];
        let len = scan_word(text);
        // Only delimiters starting with a non-alphanumeric word character
        // (`$$`) can begin inside a word.
        match self.delimiter.chars().next() {
            Some(c) if is_identifier_char(c) && !is_word_char(c) => {}
            _ => return len,
        }
        let delimiter = self.delimiter.as_bytes();
        text[..len]
            .char_indices()
            .skip(1)
            .find(|(i, _)| starts_with_ignore_case(&text.as_bytes()[*i..], delimiter))
            .map_or(len, |(i, _)| i)
    }

    /// `:name` or `:"quoted name"`. Rejected after an identifier character,
    /// after the prefix itself (`a::int`), after `\` or `/`, and when the
    /// name is empty.
    fn scan_named_parameter(&self, pos: Pos, prefix: char) -> Option<usize> {
        let text = &self.source[..self.end];
        if let Some(prev) = text[..pos].chars().next_back() {
            if is_identifier_char(prev) || prev == prefix || prev == '\\' || prev == '/' {
                return None;
            }
        }
        let name_start = pos + prefix.len_utf8();
        let next = text[name_start..].chars().next()?;
        if next == '"' {
            let body = &text.as_bytes()[name_start + 1..];
            let close = memchr(b'"', body)?;
            if close == 0 {
                return None;
            }
            return Some(name_start + 1 + close + 1 - pos);
        }
        if next.is_alphanumeric() || next == '_' {
            return Some(name_start + scan_word(&text[name_start..]) - pos);
        }
        None
    }
}

impl Iterator for Lexer<'_> {
    type Item = TokenEntry;

    fn next(&mut self) -> Option<TokenEntry> {
        if self.pos >= self.end {
            return None;
        }
        let start = self.pos;
        let (kind, len) = self.scan_token(start);
        self.pos = (start + len.max(1)).min(self.end);
        Some(TokenEntry::new(kind, &self.source[start..self.pos], start))
    }
}

fn floor_char_boundary(text: &str, mut pos: Pos) -> Pos {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Letters, digits and `_`; unlike identifier characters, `$` is excluded.
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline]
fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Length up to the line break, a trailing `\r` excluded.
fn line_length(bytes: &[u8]) -> usize {
    let mut len = memchr(b'\n', bytes).unwrap_or(bytes.len());
    if len > 0 && bytes[len - 1] == b'\r' {
        len -= 1;
    }
    len
}

/// Scan an identifier (alphanumeric, `_`, `$`, any non-ASCII letter).
/// Returns byte length of the identifier.
#[inline]
fn scan_word(text: &str) -> usize {
    text.char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map_or(text.len(), |(i, _)| i)
}

/// Scan a numeric literal: hex, decimal with optional fraction and exponent.
fn scan_number(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let mut i = 0;

    if len > 2 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X') && bytes[2].is_ascii_hexdigit()
    {
        i = 2;
        while i < len && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        return i;
    }

    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    // `1..10` is a range, not a decimal point
    if i < len && bytes[i] == b'.' && bytes.get(i + 1) != Some(&b'.') {
        i += 1;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < len && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < len && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < len && bytes[j].is_ascii_digit() {
            i = j;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// `${name}` on a single line.
fn scan_variable(bytes: &[u8]) -> Option<usize> {
    if !bytes.starts_with(b"${") {
        return None;
    }
    let close = memchr(b'}', &bytes[2..])?;
    let name = &bytes[2..2 + close];
    if name.is_empty() || name.iter().any(|b| *b == b'\n' || b.is_ascii_whitespace()) {
        return None;
    }
    Some(2 + close + 1)
}

/// Scan a dollar-quoted string (`$tag$...$tag$`). `bytes` starts at `$`.
/// The tag is empty or an identifier that does not start with a digit.
/// Unterminated strings run to the end of input.
fn scan_dollar_string(bytes: &[u8]) -> Option<usize> {
    let mut tag_end = 1;
    while tag_end < bytes.len() && (bytes[tag_end].is_ascii_alphanumeric() || bytes[tag_end] == b'_')
    {
        tag_end += 1;
    }
    if tag_end >= bytes.len() || bytes[tag_end] != b'$' {
        return None;
    }
    if bytes.get(1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let tag = &bytes[..=tag_end];
    Some(match memmem::find(&bytes[tag.len()..], tag) {
        Some(idx) => tag.len() + idx + tag.len(),
        None => bytes.len(),
    })
}

/// Closing character for an alternative-quote opening character.
fn alternative_quote_close(open: char) -> Option<char> {
    match open {
        '[' => Some(']'),
        '(' => Some(')'),
        '{' => Some('}'),
        '<' => Some('>'),
        c if c.is_alphanumeric() || c.is_whitespace() || c == '\'' || c == '"' => None,
        c => Some(c),
    }
}

/// `q'<open>...<close>'` or `nq'...'`. Malformed forms return `None` and the
/// text is lexed as an ordinary word.
fn scan_alternative_quote(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let prefix = if bytes.len() > 1 && matches!(bytes[0], b'n' | b'N') {
        if !matches!(bytes[1], b'q' | b'Q') {
            return None;
        }
        2
    } else {
        1
    };
    if bytes.get(prefix) != Some(&b'\'') {
        return None;
    }
    let open = text[prefix + 1..].chars().next()?;
    let close = alternative_quote_close(open)?;
    let body_start = prefix + 1 + open.len_utf8();
    let mut terminator = [0u8; 5];
    let close_len = close.encode_utf8(&mut terminator).len();
    terminator[close_len] = b'\'';
    let idx = memmem::find(&bytes[body_start..], &terminator[..=close_len])?;
    Some(body_start + idx + close_len + 1)
}
