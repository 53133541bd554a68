use thiserror::Error;

/// User-facing errors.
///
/// Splitting itself never fails: malformed SQL always produces some
/// partition of the input. These errors cover the surrounding surface only
/// (dialect lookup, configuration, file access).
#[derive(Error, Debug)]
pub enum SqlsplitError {
    #[error("sqlsplit config error: {0}")]
    Config(String),

    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SqlsplitError>;
