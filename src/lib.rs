pub mod api;
pub mod config;
pub mod control;
pub mod dialect;
pub mod error;
pub mod lexer;
pub mod options;
pub mod parameters;
pub mod predicate;
pub mod predicate_set;
pub mod report;
pub mod script;
pub mod splitter;
pub mod string_utils;
pub mod token;
pub mod trie;

// Re-export the main public API
pub use api::{
    extract_parameters, get_matching_paths, next_statement, previous_statement, run,
    split_range, split_script, split_string, statement_at, token_at, tokenize,
};
pub use config::load_config;
pub use dialect::{Dialect, DialectEntry, DialectRegistry};
pub use error::{Result, SqlsplitError};
pub use options::SplitOptions;
pub use script::{ScriptElement, SqlQuery};
pub use splitter::ScriptSplitter;
