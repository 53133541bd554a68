use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::control::ControlCommand;
use crate::dialect::{Dialect, DialectEntry, DialectRegistry};
use crate::error::Result;
use crate::lexer::Lexer;
use crate::options::SplitOptions;
use crate::report::{FileResult, Report};
use crate::script::ScriptElement;
use crate::splitter::{self, ScriptSplitter};
use crate::token::{Pos, TokenEntry, TokenKind};

pub use crate::parameters::extract_parameters;

/// Split a script with the builtin dialect named in `options`.
pub fn split_string(source: &str, options: &SplitOptions) -> Result<Vec<ScriptElement>> {
    let registry = DialectRegistry::with_builtin();
    let entry = registry.get(&options.dialect)?;
    Ok(split_script(source, &entry, options))
}

pub fn split_script(text: &str, entry: &DialectEntry, options: &SplitOptions) -> Vec<ScriptElement> {
    split_range(text, 0..text.len(), entry, options)
}

/// Split only `range` of `text`; element offsets stay absolute.
pub fn split_range(
    text: &str,
    range: Range<Pos>,
    entry: &DialectEntry,
    options: &SplitOptions,
) -> Vec<ScriptElement> {
    ScriptSplitter::with_range(
        text,
        range,
        &entry.dialect,
        &entry.predicates,
        options.clone(),
    )
    .collect()
}

/// The element under the cursor at `offset`.
pub fn statement_at(
    text: &str,
    entry: &DialectEntry,
    options: &SplitOptions,
    offset: Pos,
) -> Option<ScriptElement> {
    let elements = split_script(text, entry, options);
    splitter::element_at(text, &elements, offset).cloned()
}

pub fn next_statement(
    text: &str,
    entry: &DialectEntry,
    options: &SplitOptions,
    offset: Pos,
) -> Option<ScriptElement> {
    let elements = split_script(text, entry, options);
    splitter::next_element(&elements, offset).cloned()
}

pub fn previous_statement(
    text: &str,
    entry: &DialectEntry,
    options: &SplitOptions,
    offset: Pos,
) -> Option<ScriptElement> {
    let elements = split_script(text, entry, options);
    splitter::previous_element(&elements, offset).cloned()
}

/// All tokens of `text`, following `DELIMITER` directives the way the
/// splitter does.
pub fn tokenize(text: &str, dialect: &Dialect) -> Vec<TokenEntry> {
    let mut lexer = Lexer::new(text, dialect);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        if token.kind == TokenKind::ControlCommandMarker {
            let command = ControlCommand::parse(&token, dialect.control_command_marker);
            if command.is_delimiter_change() {
                lexer.set_delimiter(command.new_delimiter().unwrap_or_default());
            }
        }
        tokens.push(token);
    }
    tokens
}

/// The token covering `offset`.
pub fn token_at(text: &str, dialect: &Dialect, offset: Pos) -> Option<TokenEntry> {
    tokenize(text, dialect)
        .into_iter()
        .find(|token| token.contains(offset))
}

/// Split every script found under `files`.
pub fn run(files: &[PathBuf], options: &SplitOptions) -> Result<Report> {
    let registry = DialectRegistry::with_builtin();
    let entry = registry.get(&options.dialect)?;
    let mut report = Report::new();
    for path in get_matching_paths(files, options) {
        report.add(split_file(&path, &entry, options));
    }
    Ok(report)
}

fn split_file(path: &Path, entry: &DialectEntry, options: &SplitOptions) -> FileResult {
    match std::fs::read_to_string(path) {
        Ok(source) => {
            let elements = split_script(&source, entry, options);
            debug!(path = %path.display(), elements = elements.len(), "split file");
            FileResult {
                path: path.to_path_buf(),
                source,
                elements,
                error: None,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read file");
            FileResult {
                path: path.to_path_buf(),
                source: String::new(),
                elements: Vec::new(),
                error: Some(format!("read error: {}", e)),
            }
        }
    }
}

/// Script files among `paths`, directories walked recursively, sorted.
pub fn get_matching_paths(paths: &[PathBuf], options: &SplitOptions) -> Vec<PathBuf> {
    let extensions = options.sql_extensions();
    let exclude: Vec<glob::Pattern> = options
        .exclude
        .iter()
        .filter_map(|pattern| match glob::Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "ignoring invalid exclude pattern");
                None
            }
        })
        .collect();
    let mut result = HashSet::new();

    for path in paths {
        if path.is_file() {
            if is_sql_file(path, extensions) {
                result.insert(path.clone());
            }
        } else if path.is_dir() {
            collect_sql_files(path, extensions, &exclude, &mut result);
        }
    }

    let mut sorted: Vec<PathBuf> = result.into_iter().collect();
    sorted.sort();
    sorted
}

fn is_sql_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn collect_sql_files(
    dir: &Path,
    extensions: &[&str],
    exclude: &[glob::Pattern],
    result: &mut HashSet<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') || exclude.iter().any(|p| p.matches(&name)) {
            continue;
        }
        if path.is_dir() {
            collect_sql_files(&path, extensions, exclude, result);
        } else if is_sql_file(&path, extensions) {
            result.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_string_uses_dialect() {
        let options = SplitOptions {
            dialect: "oracle".to_string(),
            ..SplitOptions::default()
        };
        let elements = split_string("BEGIN NULL; END;\nselect 1 from dual;", &options).unwrap();
        let texts: Vec<&str> = elements.iter().map(ScriptElement::text).collect();
        assert_eq!(texts, vec!["BEGIN NULL; END;", "select 1 from dual"]);

        let options = SplitOptions {
            dialect: "klingon".to_string(),
            ..SplitOptions::default()
        };
        assert!(split_string("select 1", &options).is_err());
    }

    #[test]
    fn test_cursor_helpers() {
        let entry = DialectEntry::new(Dialect::generic());
        let options = SplitOptions::default();
        let text = "select 1;\nselect 2;\nselect 3;";
        let at = statement_at(text, &entry, &options, 12).unwrap();
        assert_eq!(at.text(), "select 2");
        let next = next_statement(text, &entry, &options, 12).unwrap();
        assert_eq!(next.text(), "select 3");
        let previous = previous_statement(text, &entry, &options, 12).unwrap();
        assert_eq!(previous.text(), "select 1");
    }

    #[test]
    fn test_tokenize_follows_delimiter_directive() {
        let mysql = Dialect::mysql();
        let text = "DELIMITER //\nselect 1; select 2//";
        let delimiters: Vec<String> = tokenize(text, &mysql)
            .into_iter()
            .filter(|t| t.kind == TokenKind::Delimiter)
            .map(|t| t.text)
            .collect();
        assert_eq!(delimiters, vec!["//"]);

        let token = token_at(text, &mysql, 14).unwrap();
        assert_eq!(token.text, "select");
        assert!(token_at(text, &mysql, text.len()).is_none());
    }

    #[test]
    fn test_is_sql_file() {
        let extensions = &["sql", "pks"];
        assert!(is_sql_file(Path::new("a.sql"), extensions));
        assert!(is_sql_file(Path::new("PKG.PKS"), extensions));
        assert!(!is_sql_file(Path::new("notes.txt"), extensions));
        assert!(!is_sql_file(Path::new("sql"), extensions));
    }

    #[test]
    fn test_matching_paths_and_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.sql"), "select 1; select 2;").unwrap();
        std::fs::write(dir.path().join("b.txt"), "select 3;").unwrap();
        let skipped = dir.path().join("build");
        std::fs::create_dir(&skipped).unwrap();
        std::fs::write(skipped.join("c.sql"), "select 4;").unwrap();

        let options = SplitOptions {
            exclude: vec!["build".to_string()],
            ..SplitOptions::default()
        };
        let paths = get_matching_paths(&[dir.path().to_path_buf()], &options);
        assert_eq!(paths, vec![dir.path().join("a.sql")]);

        let report = run(&[dir.path().to_path_buf()], &options).unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.queries(), 2);
        assert!(!report.has_errors());

        let result = &report.results[0];
        assert_eq!(result.source, "select 1; select 2;");
        let second = &result.elements[1];
        assert_eq!(&result.source[second.start()..second.end()], "select 2;");
    }
}
