use crate::control::ControlCommand;
use crate::parameters::SqlQueryParameter;
use crate::token::Pos;

/// One executable statement.
///
/// `start..start + length` covers the statement including its terminating
/// delimiter; `text` is trimmed and carries a delimiter only when the
/// dialect or options ask for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub start: Pos,
    pub length: usize,
    pub text: String,
    pub parameters: Vec<SqlQueryParameter>,
}

impl SqlQuery {
    pub fn end(&self) -> Pos {
        self.start + self.length
    }
}

/// A statement or a control directive, in script order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    Query(SqlQuery),
    Control(ControlCommand),
}

impl ScriptElement {
    pub fn start(&self) -> Pos {
        match self {
            Self::Query(q) => q.start,
            Self::Control(c) => c.start,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Self::Query(q) => q.length,
            Self::Control(c) => c.length,
        }
    }

    pub fn end(&self) -> Pos {
        self.start() + self.length()
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Query(q) => &q.text,
            Self::Control(c) => &c.text,
        }
    }

    pub fn as_query(&self) -> Option<&SqlQuery> {
        match self {
            Self::Query(q) => Some(q),
            Self::Control(_) => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlCommand> {
        match self {
            Self::Control(c) => Some(c),
            Self::Query(_) => None,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Self::Control(_))
    }
}
