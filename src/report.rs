use std::path::PathBuf;

use crate::script::ScriptElement;

/// Result of splitting a single file.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    /// The text the element spans point into; empty when the file could
    /// not be read.
    pub source: String,
    pub elements: Vec<ScriptElement>,
    pub error: Option<String>,
}

impl FileResult {
    pub fn queries(&self) -> usize {
        self.elements.iter().filter(|e| !e.is_control()).count()
    }

    pub fn controls(&self) -> usize {
        self.elements.iter().filter(|e| e.is_control()).count()
    }
}

/// Aggregated results over all processed files.
#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn queries(&self) -> usize {
        self.results.iter().map(FileResult::queries).sum()
    }

    pub fn controls(&self) -> usize {
        self.results.iter().map(FileResult::controls).sum()
    }

    pub fn errors(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} file(s) processed", self.total()),
            format!("{} statement(s)", self.queries()),
        ];
        if self.controls() > 0 {
            parts.push(format!("{} control command(s)", self.controls()));
        }
        if self.errors() > 0 {
            parts.push(format!("{} error(s)", self.errors()));
        }
        parts.join(", ")
    }

    pub fn print_errors(&self) {
        for result in &self.results {
            if let Some(ref error) = result.error {
                eprintln!("error: {}: {}", result.path.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlCommand;
    use crate::script::SqlQuery;
    use crate::token::{TokenEntry, TokenKind};

    fn query(text: &str) -> ScriptElement {
        ScriptElement::Query(SqlQuery {
            start: 0,
            length: text.len(),
            text: text.to_string(),
            parameters: Vec::new(),
        })
    }

    #[test]
    fn test_report_summary() {
        let control = TokenEntry::new(TokenKind::ControlCommandMarker, "@set x = 1", 0);
        let mut report = Report::new();
        report.add(FileResult {
            path: PathBuf::from("a.sql"),
            source: "select 1;\n@echo\nselect 2;".to_string(),
            elements: vec![
                query("select 1"),
                ScriptElement::Control(ControlCommand::parse(&control, Some('@'))),
                query("select 2"),
            ],
            error: None,
        });
        report.add(FileResult {
            path: PathBuf::from("b.sql"),
            source: String::new(),
            elements: Vec::new(),
            error: Some("read error".to_string()),
        });

        assert_eq!(report.total(), 2);
        assert_eq!(report.queries(), 2);
        assert_eq!(report.controls(), 1);
        assert!(report.has_errors());
        assert_eq!(
            report.summary(),
            "2 file(s) processed, 2 statement(s), 1 control command(s), 1 error(s)"
        );
    }
}
