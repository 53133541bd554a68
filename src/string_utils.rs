use memchr::{memchr, memchr2};

/// Characters allowed inside an unquoted identifier after the first one.
#[inline]
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Skip a quoted region whose opening byte is at `i`, ending at the first
/// unescaped `close`. A doubled `close` is an escape; with `backslash` set
/// a backslash escapes the following byte as well.
/// Returns the position after the closing quote, or `bytes.len()` when the
/// region is unterminated.
pub(crate) fn skip_quoted(bytes: &[u8], i: usize, close: u8, backslash: bool) -> usize {
    let mut j = i + 1;
    while j < bytes.len() {
        let found = if backslash {
            memchr2(close, b'\\', &bytes[j..])
        } else {
            memchr(close, &bytes[j..])
        };
        let Some(offset) = found else {
            return bytes.len();
        };
        let end = j + offset;
        if bytes[end] == b'\\' {
            j = end + 2;
            continue;
        }
        if end + 1 < bytes.len() && bytes[end + 1] == close {
            j = end + 2;
            continue;
        }
        return end + 1;
    }
    bytes.len()
}

/// Whether `text` is wrapped in one of the usual quote pairs.
pub fn is_quoted(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return false;
    }
    matches!(
        (bytes[0], bytes[bytes.len() - 1]),
        (b'"', b'"') | (b'\'', b'\'') | (b'`', b'`') | (b'[', b']')
    )
}

/// Remove one pair of surrounding quotes, if present.
pub fn strip_quotes(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Quoted identifiers keep their case with the quotes removed; unquoted
/// ones are upper-cased.
pub fn normalize_identifier(name: &str) -> String {
    if is_quoted(name) {
        strip_quotes(name).to_string()
    } else {
        name.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_single_quoted_string() {
        let bytes = b"'hello' rest";
        assert_eq!(skip_quoted(bytes, 0, b'\'', false), 7);
    }

    #[test]
    fn test_skip_doubled_quote() {
        let bytes = b"'it''s' rest";
        assert_eq!(skip_quoted(bytes, 0, b'\'', false), 7);
    }

    #[test]
    fn test_skip_backslash_escape() {
        let bytes = b"'it\\'s' rest";
        assert_eq!(skip_quoted(bytes, 0, b'\'', true), 7);
        // without backslash escapes the quote after the backslash closes
        assert_eq!(skip_quoted(bytes, 0, b'\'', false), 5);
    }

    #[test]
    fn test_skip_bracket_and_unterminated() {
        assert_eq!(skip_quoted(b"[a b] x", 0, b']', false), 5);
        assert_eq!(skip_quoted(b"'open", 0, b'\'', false), 5);
    }

    #[test]
    fn test_strip_and_normalize() {
        assert_eq!(strip_quotes("\"MyVar8\""), "MyVar8");
        assert_eq!(strip_quotes("'x'"), "x");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(normalize_identifier("AbC"), "ABC");
        assert_eq!(normalize_identifier("\"SYs_B_1\""), "SYs_B_1");
        assert_eq!(normalize_identifier("[Col]"), "Col");
    }

    #[test]
    fn test_identifier_chars() {
        assert!(is_identifier_char('a'));
        assert!(is_identifier_char('_'));
        assert!(is_identifier_char('$'));
        assert!(is_identifier_char('é'));
        assert!(!is_identifier_char(':'));
        assert!(!is_identifier_char(' '));
    }
}
