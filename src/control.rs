use crate::string_utils::{skip_quoted, strip_quotes};
use crate::token::{Pos, TokenEntry};

/// An inline directive such as `@set name = value` or `DELIMITER $$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    pub start: Pos,
    pub length: usize,
    /// Trimmed control line without the marker character.
    pub text: String,
    /// Directive word, lower-cased.
    pub command: String,
    pub parameter_name: Option<String>,
    pub parameter_value: Option<String>,
}

impl ControlCommand {
    /// Parse a `ControlCommandMarker` token.
    ///
    /// `@set x = 1` gives name `x` and value `1`; `@include f.sql` gives name
    /// `f.sql`; for delimiter changes the whole argument is the value.
    pub fn parse(token: &TokenEntry, marker: Option<char>) -> Self {
        let line = token.text.trim();
        let body = match marker {
            Some(m) if line.starts_with(m) => &line[m.len_utf8()..],
            _ => line,
        };
        let text = body.trim().to_string();

        let (command, rest) = split_word(&text);
        let command = command.to_ascii_lowercase();
        let rest = rest.trim();

        let (parameter_name, parameter_value) = if rest.is_empty() {
            (None, None)
        } else if command == "delimiter" {
            (None, Some(rest.to_string()))
        } else {
            let (name, after) = split_name(rest);
            let after = after.trim_start();
            let after = after.strip_prefix('=').unwrap_or(after).trim();
            let value = (!after.is_empty()).then(|| strip_quotes(after).to_string());
            let name = (!name.is_empty()).then(|| strip_quotes(name).to_string());
            (name, value)
        };

        Self {
            start: token.start,
            length: token.length,
            text,
            command,
            parameter_name,
            parameter_value,
        }
    }

    pub fn end(&self) -> Pos {
        self.start + self.length
    }

    pub fn is_delimiter_change(&self) -> bool {
        self.command == "delimiter"
    }

    /// The new statement delimiter; `None` restores the dialect default.
    pub fn new_delimiter(&self) -> Option<&str> {
        if !self.is_delimiter_change() {
            return None;
        }
        self.parameter_value.as_deref()
    }
}

fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], &text[idx..]),
        None => (text, ""),
    }
}

/// Quote-aware name: a quoted run, or everything up to whitespace or `=`.
fn split_name(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    if let Some(&first) = bytes.first() {
        let close = match first {
            b'"' => Some(b'"'),
            b'\'' => Some(b'\''),
            b'`' => Some(b'`'),
            b'[' => Some(b']'),
            _ => None,
        };
        if let Some(close) = close {
            let end = skip_quoted(bytes, 0, close, false);
            return (&text[..end], &text[end..]);
        }
    }
    let end = text
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn control(text: &str) -> ControlCommand {
        let token = TokenEntry::new(TokenKind::ControlCommandMarker, text, 3);
        ControlCommand::parse(&token, Some('@'))
    }

    #[test]
    fn test_set_with_value() {
        let cmd = control("@set myVar = 'some value'");
        assert_eq!(cmd.command, "set");
        assert_eq!(cmd.text, "set myVar = 'some value'");
        assert_eq!(cmd.parameter_name.as_deref(), Some("myVar"));
        assert_eq!(cmd.parameter_value.as_deref(), Some("some value"));
        assert_eq!(cmd.start, 3);
        assert_eq!(cmd.end(), 3 + "@set myVar = 'some value'".len());
    }

    #[test]
    fn test_set_without_spaces_and_quoted_name() {
        let cmd = control("@SET x=10");
        assert_eq!(cmd.command, "set");
        assert_eq!(cmd.parameter_name.as_deref(), Some("x"));
        assert_eq!(cmd.parameter_value.as_deref(), Some("10"));

        let cmd = control("@set \"My Var\" = 1");
        assert_eq!(cmd.parameter_name.as_deref(), Some("My Var"));
        assert_eq!(cmd.parameter_value.as_deref(), Some("1"));
    }

    #[test]
    fn test_name_only_and_bare_command() {
        let cmd = control("@include scripts/init.sql");
        assert_eq!(cmd.command, "include");
        assert_eq!(cmd.parameter_name.as_deref(), Some("scripts/init.sql"));
        assert_eq!(cmd.parameter_value, None);

        let cmd = control("@echo");
        assert_eq!(cmd.command, "echo");
        assert_eq!(cmd.parameter_name, None);
        assert_eq!(cmd.parameter_value, None);
    }

    #[test]
    fn test_delimiter_change() {
        let token = TokenEntry::new(TokenKind::ControlCommandMarker, "DELIMITER $$", 0);
        let cmd = ControlCommand::parse(&token, Some('@'));
        assert!(cmd.is_delimiter_change());
        assert_eq!(cmd.text, "DELIMITER $$");
        assert_eq!(cmd.new_delimiter(), Some("$$"));

        let token = TokenEntry::new(TokenKind::ControlCommandMarker, "delimiter", 0);
        let cmd = ControlCommand::parse(&token, Some('@'));
        assert!(cmd.is_delimiter_change());
        assert_eq!(cmd.new_delimiter(), None);

        assert_eq!(control("@set x = 1").new_delimiter(), None);
    }
}
