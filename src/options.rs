use serde::Deserialize;

use crate::dialect::{self, Dialect};
use crate::error::Result;

/// SplitOptions holds the splitting configuration for sqlsplit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitOptions {
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Keep the terminating delimiter in every query text.
    #[serde(default)]
    pub keep_delimiters: bool,

    /// A blank line ends a statement at depth zero.
    #[serde(default)]
    pub blank_line_delimiter: bool,

    /// Extract parameters for every emitted query.
    #[serde(default)]
    pub parse_parameters: bool,

    /// Extract parameters from DDL statements too.
    #[serde(default)]
    pub parameters_in_ddl: bool,

    /// Glob patterns to exclude when walking directories.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_dialect() -> String {
    "generic".to_string()
}

impl SplitOptions {
    /// Build the builtin dialect named by `dialect`.
    pub fn dialect(&self) -> Result<Dialect> {
        dialect::dialect_from_name(&self.dialect)
    }

    /// Script file extensions picked up when walking directories.
    pub fn sql_extensions(&self) -> &[&str] {
        &["sql", "ddl", "dml", "pls", "pkb", "pks"]
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            keep_delimiters: false,
            blank_line_delimiter: false,
            parse_parameters: false,
            parameters_in_ddl: false,
            exclude: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SplitOptions::default();
        assert_eq!(options.dialect, "generic");
        assert!(!options.keep_delimiters);
        assert!(!options.blank_line_delimiter);
        assert!(!options.parse_parameters);
        assert!(!options.parameters_in_ddl);
    }

    #[test]
    fn test_dialect_creation() {
        let mut options = SplitOptions::default();
        assert_eq!(options.dialect().unwrap().name, "generic");

        options.dialect = "oracle".to_string();
        assert!(options.dialect().unwrap().alternative_quoting);

        options.dialect = "klingon".to_string();
        assert!(options.dialect().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let options: SplitOptions = toml::from_str("dialect = \"mysql\"\nkeep_delimiters = true").unwrap();
        assert_eq!(options.dialect, "mysql");
        assert!(options.keep_delimiters);
        assert!(!options.parse_parameters);
    }
}
