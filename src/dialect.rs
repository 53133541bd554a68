use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use phf::phf_set;

use crate::error::{Result, SqlsplitError};
use crate::predicate::{
    alternative, empty, optional, sequence, words, ParserAction, TokenPredicatesCondition,
};
use crate::predicate_set::PredicateSet;

/// Keywords shared by every dialect. Matched upper-cased.
static BASE_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BEGIN", "BETWEEN", "BODY", "BY",
    "CALL", "CASE", "CHECK", "COLUMN", "COMMENT", "COMMIT", "CONSTRAINT", "CREATE",
    "CROSS", "CURSOR", "DECLARE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DO",
    "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "FETCH", "FOR",
    "FOREIGN", "FROM", "FULL", "FUNCTION", "GRANT", "GROUP", "HAVING", "IF", "IN",
    "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT",
    "LIKE", "LIMIT", "LOOP", "MERGE", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER",
    "OUTER", "PACKAGE", "PRIMARY", "PROCEDURE", "REFERENCES", "RENAME", "REPLACE",
    "RETURN", "RETURNS", "REVOKE", "RIGHT", "ROLLBACK", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "THEN", "TO", "TRANSACTION", "TRIGGER", "TRUNCATE", "TYPE", "UNION",
    "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WHILE", "WITH",
    "WORK",
};

/// Lexical and structural description of a SQL dialect.
///
/// Dialects are plain data: every preset is a `Dialect` value built from
/// [`Dialect::generic`] with a few fields changed.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub name: String,
    /// Dialect keywords on top of the shared base set, upper-cased.
    pub keywords: HashSet<String>,

    pub statement_delimiter: String,
    /// Delimiters recognised only when alone on a line (`/`, `GO`).
    pub line_delimiters: Vec<String>,

    pub string_quote: char,
    pub backslash_escapes: bool,
    pub identifier_quotes: Vec<(char, char)>,
    pub single_line_comments: Vec<String>,
    pub block_comment: Option<(String, String)>,
    pub dollar_quoting: bool,
    /// Oracle `q'[...]'` literals.
    pub alternative_quoting: bool,

    pub named_parameter_prefix: Option<char>,
    pub anonymous_parameter_mark: Option<char>,
    /// `${name}` variables.
    pub variables: bool,

    pub control_command_marker: Option<char>,
    /// Word that redefines the statement delimiter at line start (`DELIMITER`).
    pub delimiter_redefiner: Option<String>,

    pub block_begin_words: Vec<String>,
    /// The block-begin word that opens the body of a pending header.
    pub body_begin_word: String,
    pub block_end_word: String,
    pub block_header_words: Vec<String>,
    pub nested_block_headers: Vec<String>,
    /// Words turning a nested header from a forward declaration into a
    /// definition that waits for its body (`PROCEDURE p IS`).
    pub nested_body_words: Vec<String>,

    pub ddl_keywords: Vec<String>,
    pub execute_keywords: Vec<String>,

    /// Queries containing blocks keep a trailing delimiter.
    pub delimiter_after_query: bool,
    /// Blocks ending in `END` keep a trailing delimiter (`END;`).
    pub delimiter_after_block: bool,
    /// Comment-only statements are emitted as queries.
    pub supports_comment_query: bool,

    pub conditions: Vec<TokenPredicatesCondition>,
}

fn upper_all(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_ascii_uppercase()).collect()
}

/// `BEGIN` followed by one of `followers` is a transaction statement.
fn skip_begin(followers: &[&str]) -> TokenPredicatesCondition {
    TokenPredicatesCondition::new(
        ParserAction::SkipSuffixToken,
        empty(),
        sequence(vec![
            "BEGIN".into(),
            alternative(followers.iter().map(|f| (*f).into()).collect()),
        ]),
    )
}

fn skip_if_exists() -> TokenPredicatesCondition {
    TokenPredicatesCondition::new(
        ParserAction::SkipSuffixToken,
        empty(),
        sequence(vec!["IF".into(), optional("NOT".into()), "EXISTS".into()]),
    )
}

impl Dialect {
    /// Portable defaults: `;` delimiter, `--` and `/* */` comments, `"`
    /// identifiers, `:name` and `?` parameters, `@` control commands.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            keywords: HashSet::new(),
            statement_delimiter: ";".to_string(),
            line_delimiters: Vec::new(),
            string_quote: '\'',
            backslash_escapes: false,
            identifier_quotes: vec![('"', '"')],
            single_line_comments: vec!["--".to_string()],
            block_comment: Some(("/*".to_string(), "*/".to_string())),
            dollar_quoting: false,
            alternative_quoting: false,
            named_parameter_prefix: Some(':'),
            anonymous_parameter_mark: Some('?'),
            variables: true,
            control_command_marker: Some('@'),
            delimiter_redefiner: None,
            block_begin_words: upper_all(&["BEGIN", "CASE"]),
            body_begin_word: "BEGIN".to_string(),
            block_end_word: "END".to_string(),
            block_header_words: Vec::new(),
            nested_block_headers: Vec::new(),
            nested_body_words: Vec::new(),
            ddl_keywords: upper_all(&[
                "CREATE", "ALTER", "DROP", "TRUNCATE", "COMMENT", "GRANT", "REVOKE", "RENAME",
            ]),
            execute_keywords: upper_all(&["EXEC", "EXECUTE", "CALL"]),
            delimiter_after_query: false,
            delimiter_after_block: false,
            supports_comment_query: false,
            conditions: vec![skip_begin(&["TRANSACTION", "TRAN", "WORK", ";"])],
        }
    }

    pub fn postgres() -> Self {
        Self {
            name: "postgres".to_string(),
            keywords: upper_all(&["ILIKE", "RETURNING", "LANGUAGE", "ISOLATION"])
                .into_iter()
                .collect(),
            dollar_quoting: true,
            // `?` is a JSON operator
            anonymous_parameter_mark: None,
            conditions: vec![skip_begin(&[
                ";",
                "TRANSACTION",
                "WORK",
                "ISOLATION",
                "READ",
                "NOT",
                "DEFERRABLE",
            ])],
            ..Self::generic()
        }
    }

    pub fn oracle() -> Self {
        let create_prefix = sequence(vec![
            "CREATE".into(),
            optional(words("OR REPLACE")),
            optional(alternative(vec!["EDITIONABLE".into(), "NONEDITIONABLE".into()])),
        ]);
        let stored_unit = alternative(vec![
            words("PACKAGE BODY"),
            "PACKAGE".into(),
            "PROCEDURE".into(),
            "FUNCTION".into(),
            "TRIGGER".into(),
            words("TYPE BODY"),
        ]);
        Self {
            name: "oracle".to_string(),
            keywords: upper_all(&[
                "ELSIF",
                "EXCEPTION",
                "EDITIONABLE",
                "NONEDITIONABLE",
                "PRAGMA",
                "RAISE",
            ])
            .into_iter()
            .collect(),
            line_delimiters: vec!["/".to_string()],
            alternative_quoting: true,
            block_begin_words: upper_all(&["BEGIN", "CASE", "IF", "LOOP"]),
            block_header_words: upper_all(&["DECLARE"]),
            nested_block_headers: upper_all(&["PROCEDURE", "FUNCTION"]),
            nested_body_words: upper_all(&["IS", "AS"]),
            delimiter_after_block: true,
            conditions: vec![
                TokenPredicatesCondition::new(ParserAction::BeginBlock, create_prefix, stored_unit),
                skip_if_exists(),
            ],
            ..Self::generic()
        }
    }

    pub fn sqlserver() -> Self {
        Self {
            name: "sqlserver".to_string(),
            keywords: upper_all(&["GO", "TOP", "TRAN", "TRY", "CATCH"])
                .into_iter()
                .collect(),
            line_delimiters: vec!["GO".to_string()],
            identifier_quotes: vec![('"', '"'), ('[', ']')],
            // `@name` starts a T-SQL variable
            control_command_marker: None,
            delimiter_after_query: true,
            conditions: vec![
                skip_begin(&["TRAN", "TRANSACTION", "DISTRIBUTED", ";"]),
                skip_if_exists(),
            ],
            ..Self::generic()
        }
    }

    pub fn mysql() -> Self {
        let skip_call = |word: &str| {
            TokenPredicatesCondition::new(
                ParserAction::SkipSuffixToken,
                empty(),
                sequence(vec![word.into(), "(".into()]),
            )
        };
        Self {
            name: "mysql".to_string(),
            keywords: upper_all(&["DELIMITER", "REPEAT", "UNTIL", "LEAVE", "ITERATE"])
                .into_iter()
                .collect(),
            backslash_escapes: true,
            identifier_quotes: vec![('`', '`'), ('"', '"')],
            single_line_comments: vec!["--".to_string(), "#".to_string()],
            delimiter_redefiner: Some("DELIMITER".to_string()),
            block_begin_words: upper_all(&["BEGIN", "CASE", "IF", "LOOP", "WHILE", "REPEAT"]),
            conditions: vec![
                skip_call("IF"),
                skip_call("REPEAT"),
                skip_if_exists(),
                skip_begin(&[";", "WORK"]),
            ],
            ..Self::generic()
        }
    }

    /// Case-insensitive keyword test against the base set plus this
    /// dialect's own keywords.
    pub fn is_keyword(&self, word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        BASE_KEYWORDS.contains(upper.as_str()) || self.keywords.contains(&upper)
    }

    pub fn is_block_begin(&self, upper: &str) -> bool {
        self.block_begin_words.iter().any(|w| w == upper)
    }

    pub fn is_block_end(&self, upper: &str) -> bool {
        self.block_end_word == upper
    }

    pub fn is_block_header(&self, upper: &str) -> bool {
        self.block_header_words.iter().any(|w| w == upper)
    }

    pub fn is_nested_block_header(&self, upper: &str) -> bool {
        self.nested_block_headers.iter().any(|w| w == upper)
    }

    pub fn is_nested_body_word(&self, upper: &str) -> bool {
        self.nested_body_words.iter().any(|w| w == upper)
    }

    pub fn is_ddl_keyword(&self, upper: &str) -> bool {
        self.ddl_keywords.iter().any(|w| w == upper)
    }

    pub fn is_execute_keyword(&self, upper: &str) -> bool {
        self.execute_keywords.iter().any(|w| w == upper)
    }

    /// Statements starting with this word may need `END;` kept intact.
    pub fn starts_block_statement(&self, upper: &str) -> bool {
        self.is_ddl_keyword(upper) || self.is_block_begin(upper) || self.is_block_header(upper)
    }
}

/// Create a builtin dialect from its name.
pub fn dialect_from_name(name: &str) -> Result<Dialect> {
    match name.to_ascii_lowercase().as_str() {
        "generic" | "default" => Ok(Dialect::generic()),
        "postgres" | "postgresql" => Ok(Dialect::postgres()),
        "oracle" => Ok(Dialect::oracle()),
        "sqlserver" | "mssql" => Ok(Dialect::sqlserver()),
        "mysql" | "mariadb" => Ok(Dialect::mysql()),
        _ => Err(SqlsplitError::UnknownDialect(name.to_string())),
    }
}

/// A dialect together with its compiled predicate index.
#[derive(Debug)]
pub struct DialectEntry {
    pub dialect: Dialect,
    pub predicates: PredicateSet,
}

impl DialectEntry {
    pub fn new(dialect: Dialect) -> Self {
        let predicates = PredicateSet::new(dialect.conditions.clone());
        Self {
            dialect,
            predicates,
        }
    }
}

/// Name to dialect mapping. Entries are immutable once registered;
/// registering a name again replaces the whole entry.
#[derive(Debug, Default)]
pub struct DialectRegistry {
    entries: HashMap<String, Arc<DialectEntry>>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every builtin preset.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for dialect in [
            Dialect::generic(),
            Dialect::postgres(),
            Dialect::oracle(),
            Dialect::sqlserver(),
            Dialect::mysql(),
        ] {
            registry.register(dialect);
        }
        registry
    }

    /// Compile and register a dialect under its (lower-cased) name.
    ///
    /// Panics if the dialect has an empty statement delimiter.
    pub fn register(&mut self, dialect: Dialect) -> Arc<DialectEntry> {
        assert!(
            !dialect.statement_delimiter.is_empty(),
            "dialect {} has an empty statement delimiter",
            dialect.name
        );
        let name = dialect.name.to_ascii_lowercase();
        let entry = Arc::new(DialectEntry::new(dialect));
        self.entries.insert(name, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, name: &str) -> Result<Arc<DialectEntry>> {
        let key = name.to_ascii_lowercase();
        if let Some(entry) = self.entries.get(&key) {
            return Ok(Arc::clone(entry));
        }
        // Aliases resolve through the builtin names.
        let canonical = dialect_from_name(name)?.name;
        self.entries
            .get(&canonical)
            .cloned()
            .ok_or(SqlsplitError::UnknownDialect(name.to_string()))
    }

}
