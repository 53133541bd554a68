use std::collections::HashMap;
use std::ops::Range;

use crate::dialect::Dialect;
use crate::lexer::Lexer;
use crate::options::SplitOptions;
use crate::string_utils::normalize_identifier;
use crate::token::{Pos, TokenEntry, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// `:name` or `:"quoted name"`.
    Named,
    /// `?`.
    Anonymous,
    /// `${name}`.
    Variable,
}

/// A bind placeholder found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQueryParameter {
    pub name: String,
    /// Ordinal within the statement.
    pub position: usize,
    pub kind: ParameterKind,
    /// Byte offset relative to the statement start.
    pub offset: usize,
    pub length: usize,
    /// Ordinal of the last earlier parameter with the same name.
    pub previous: Option<usize>,
}

impl SqlQueryParameter {
    fn from_token(token: &TokenEntry, statement_start: Pos, prefix: Option<char>) -> Self {
        let (kind, name) = if token.kind == TokenKind::Variable {
            let inner = token
                .text
                .strip_prefix("${")
                .and_then(|t| t.strip_suffix('}'))
                .unwrap_or(token.text.as_str());
            (ParameterKind::Variable, inner.to_string())
        } else {
            match prefix.and_then(|p| token.text.strip_prefix(p)) {
                Some(name) => (ParameterKind::Named, normalize_identifier(name)),
                None => (ParameterKind::Anonymous, "?".to_string()),
            }
        };
        Self {
            name,
            position: 0,
            kind,
            offset: token.start - statement_start,
            length: token.length,
            previous: None,
        }
    }
}

/// Collect the parameters and variables of the statement at `range`.
///
/// DDL statements yield nothing unless `parameters_in_ddl` is set; `?`
/// marks are ignored in statements starting with an execute keyword.
pub fn extract_parameters(
    text: &str,
    range: Range<Pos>,
    dialect: &Dialect,
    options: &SplitOptions,
) -> Vec<SqlQueryParameter> {
    let statement_start = range.start;
    let mut tokens = Lexer::with_range(text, range, dialect).filter(TokenEntry::is_significant);

    let Some(first) = tokens.next() else {
        return Vec::new();
    };
    let first_word = if first.kind.is_word() {
        first.text.to_ascii_uppercase()
    } else {
        String::new()
    };
    if dialect.is_ddl_keyword(&first_word) && !options.parameters_in_ddl {
        return Vec::new();
    }
    let skip_anonymous = dialect.is_execute_keyword(&first_word);

    let mut parameters: Vec<SqlQueryParameter> = Vec::new();
    let mut last_by_name: HashMap<(ParameterKind, String), usize> = HashMap::new();

    for token in std::iter::once(first).chain(tokens) {
        if !token.kind.is_placeholder() {
            continue;
        }
        let mut parameter =
            SqlQueryParameter::from_token(&token, statement_start, dialect.named_parameter_prefix);
        if parameter.kind == ParameterKind::Anonymous && skip_anonymous {
            continue;
        }
        parameter.position = parameters.len();
        if parameter.kind != ParameterKind::Anonymous {
            let key = (parameter.kind, parameter.name.clone());
            parameter.previous = last_by_name.insert(key, parameter.position);
        }
        parameters.push(parameter);
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &[SqlQueryParameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    fn extract(sql: &str, dialect: &Dialect) -> Vec<SqlQueryParameter> {
        extract_parameters(sql, 0..sql.len(), dialect, &SplitOptions::default())
    }

    #[test]
    fn test_named_parameter_normalisation() {
        let sql = "select :1, :\"SYs_B_1\", :\"MyVar8\", :AbC, :&6^34 from dual";
        let params = extract(sql, &Dialect::oracle());
        assert_eq!(names(&params), vec!["1", "SYs_B_1", "MyVar8", "ABC"]);
        assert!(params.iter().all(|p| p.kind == ParameterKind::Named));
        assert_eq!(params[0].offset, 7);
        assert_eq!(params[0].length, 2);
        assert_eq!(params[3].position, 3);
    }

    #[test]
    fn test_offsets_relative_to_statement() {
        let sql = "select 1; select :x from t where y = ?";
        let start = 10;
        let params = extract_parameters(sql, start..sql.len(), &Dialect::generic(), &SplitOptions::default());
        assert_eq!(names(&params), vec!["X", "?"]);
        assert_eq!(params[0].offset, 7);
        assert_eq!(&sql[start + params[0].offset..][..params[0].length], ":x");
        assert_eq!(params[1].kind, ParameterKind::Anonymous);
    }

    #[test]
    fn test_repeated_names_link_previous() {
        let params = extract("select :a, :b, :A, ?, ? from t", &Dialect::generic());
        assert_eq!(names(&params), vec!["A", "B", "A", "?", "?"]);
        assert_eq!(params[0].previous, None);
        assert_eq!(params[2].previous, Some(0));
        assert_eq!(params[4].previous, None);
    }

    #[test]
    fn test_variables() {
        let params = extract("select ${col} from t where a = :p", &Dialect::generic());
        assert_eq!(params[0].kind, ParameterKind::Variable);
        assert_eq!(params[0].name, "col");
        assert_eq!(params[1].name, "P");
    }

    #[test]
    fn test_ddl_skipped_unless_enabled() {
        let sql = "create table t as select :x from dual";
        let oracle = Dialect::oracle();
        assert!(extract(sql, &oracle).is_empty());

        let options = SplitOptions {
            parameters_in_ddl: true,
            ..SplitOptions::default()
        };
        let params = extract_parameters(sql, 0..sql.len(), &oracle, &options);
        assert_eq!(names(&params), vec!["X"]);
    }

    #[test]
    fn test_execute_skips_anonymous() {
        let params = extract("call proc(?, :x, ?)", &Dialect::generic());
        assert_eq!(names(&params), vec!["X"]);
        assert_eq!(params[0].position, 0);
    }

    #[test]
    fn test_literals_and_comments_have_no_parameters() {
        let params = extract("select ':a', \":b\" /* :c */ -- :d\n from t", &Dialect::generic());
        assert!(params.is_empty());
        assert!(extract("   ", &Dialect::generic()).is_empty());
    }
}
