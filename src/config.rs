use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SqlsplitError};
use crate::options::SplitOptions;

const CONFIG_FILE: &str = "sqlsplit.toml";
const PYPROJECT_FILE: &str = "pyproject.toml";

const KNOWN_KEYS: [&str; 6] = [
    "dialect",
    "keep_delimiters",
    "blank_line_delimiter",
    "parse_parameters",
    "parameters_in_ddl",
    "exclude",
];

/// Load sqlsplit options.
///
/// An explicit `config_path` must exist. Otherwise the parent directories of
/// `files` are searched for `sqlsplit.toml` or a `pyproject.toml` with a
/// `[tool.sqlsplit]` table, falling back to the user config directory.
pub fn load_config(files: &[PathBuf], config_path: Option<&Path>) -> Result<SplitOptions> {
    let mut options = SplitOptions::default();

    let config_file = match config_path {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(path) => {
            return Err(SqlsplitError::Config(format!(
                "config file not found: {}",
                path.display()
            )))
        }
        None => find_config_file(files).or_else(user_config_file),
    };

    if let Some(path) = config_file {
        debug!(path = %path.display(), "loading config");
        let raw = load_config_from_path(&path)?;
        apply_config(&mut options, &raw)?;
    }

    Ok(options)
}

fn find_config_file(files: &[PathBuf]) -> Option<PathBuf> {
    for parent in get_common_parents(files) {
        let config = parent.join(CONFIG_FILE);
        if config.exists() {
            return Some(config);
        }
        let config = parent.join(PYPROJECT_FILE);
        if config.exists() && has_tool_section(&config) {
            return Some(config);
        }
    }
    None
}

fn user_config_file() -> Option<PathBuf> {
    let config = dirs::config_dir()?.join("sqlsplit").join(CONFIG_FILE);
    config.exists().then_some(config)
}

/// A pyproject.toml only counts when it configures sqlsplit.
fn has_tool_section(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<toml::Table>(&content).ok())
        .is_some_and(|table| {
            table
                .get("tool")
                .and_then(|tool| tool.get("sqlsplit"))
                .is_some()
        })
}

/// Parent directories of the given paths, most specific first.
fn get_common_parents(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut parents = Vec::new();

    for file in files {
        let start = if file.is_dir() {
            file.clone()
        } else {
            match file.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        let start = start.canonicalize().unwrap_or(start);

        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            if !parents.iter().any(|p| p == dir) {
                parents.push(dir.to_path_buf());
            }
            current = dir.parent();
        }
    }

    parents
}

fn load_config_from_path(path: &Path) -> Result<HashMap<String, toml::Value>> {
    let content = std::fs::read_to_string(path)?;
    let parsed: toml::Table = toml::from_str(&content)?;

    let is_pyproject = path
        .file_name()
        .is_some_and(|name| name == PYPROJECT_FILE);
    let section = if is_pyproject {
        parsed
            .get("tool")
            .and_then(|tool| tool.get("sqlsplit"))
            .and_then(toml::Value::as_table)
            .cloned()
            .unwrap_or_default()
    } else {
        parsed
    };

    Ok(section
        .into_iter()
        .map(|(key, value)| (key.to_lowercase().replace('-', "_"), value))
        .collect())
}

fn apply_config(options: &mut SplitOptions, config: &HashMap<String, toml::Value>) -> Result<()> {
    for key in config.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(SqlsplitError::Config(format!("unknown config option: {}", key)));
        }
    }

    if let Some(value) = config.get("dialect") {
        options.dialect = expect_str(value, "dialect")?.to_string();
        // fail early on a misspelled dialect
        options.dialect()?;
    }

    for (key, flag) in [
        ("keep_delimiters", &mut options.keep_delimiters),
        ("blank_line_delimiter", &mut options.blank_line_delimiter),
        ("parse_parameters", &mut options.parse_parameters),
        ("parameters_in_ddl", &mut options.parameters_in_ddl),
    ] {
        if let Some(value) = config.get(key) {
            *flag = value.as_bool().ok_or_else(|| {
                SqlsplitError::Config(format!("{} must be a boolean", key))
            })?;
        }
    }

    if let Some(value) = config.get("exclude") {
        let patterns = value
            .as_array()
            .ok_or_else(|| SqlsplitError::Config("exclude must be an array".to_string()))?;
        options.exclude = patterns
            .iter()
            .map(|pattern| expect_str(pattern, "exclude").map(String::from))
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(())
}

fn expect_str<'v>(value: &'v toml::Value, key: &str) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| SqlsplitError::Config(format!("{} must be a string", key)))
}
