use std::collections::VecDeque;
use std::ops::Range;

use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::control::ControlCommand;
use crate::dialect::Dialect;
use crate::lexer::Lexer;
use crate::options::SplitOptions;
use crate::parameters::extract_parameters;
use crate::predicate::ParserAction;
use crate::predicate_set::PredicateSet;
use crate::script::{ScriptElement, SqlQuery};
use crate::token::{Pos, TokenEntry, TokenKind};

/// Window key for tokens that never take part in a predicate (strings,
/// parameters, control lines). Must not be empty: `""` is the trie wildcard.
const OPAQUE_KEY: &str = "\u{1}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Normal,
    /// Inside open blocks; holds the block stack depth.
    InBlock(usize),
    /// A control line was seen after a pending statement; the statement has
    /// been emitted and the control line comes next.
    InControlCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    /// `DECLARE` or a header pattern, waiting for its `BEGIN`.
    Header,
    Begin,
    Bracket,
}

#[derive(Debug, Clone, Copy)]
struct BlockFrame {
    kind: BlockKind,
    /// Nested header that may still turn out to be a forward declaration.
    forward: bool,
}

impl BlockFrame {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            forward: false,
        }
    }
}

/// How the statement text ends, as far as blocks are concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TrailingClose {
    #[default]
    None,
    /// `... END`
    End,
    /// `... END name`
    Tagged,
}

#[derive(Debug, Default)]
struct PendingStatement {
    start: Option<Pos>,
    text_end: Pos,
    /// Holds something besides comments.
    valuable: bool,
    blocks: SmallVec<[BlockFrame; 8]>,
    has_blocks: bool,
    first_keyword: Option<CompactString>,
    trailing: TrailingClose,
    /// Recent significant token keys, nearest first.
    head: VecDeque<CompactString>,
}

impl PendingStatement {
    fn top(&self) -> Option<&BlockFrame> {
        self.blocks.last()
    }

    fn top_is(&self, kind: BlockKind) -> bool {
        self.top().is_some_and(|frame| frame.kind == kind)
    }
}

/// Lazy statement splitter over a SQL script.
///
/// Yields queries and control commands in script order. Malformed input
/// never fails: unbalanced blocks are closed by the end of input.
pub struct ScriptSplitter<'a> {
    source: &'a str,
    dialect: &'a Dialect,
    predicates: &'a PredicateSet,
    options: SplitOptions,
    lexer: Lexer<'a>,
    lookahead: VecDeque<TokenEntry>,
    state: ScanState,
    stmt: PendingStatement,
}

impl<'a> ScriptSplitter<'a> {
    pub fn new(
        source: &'a str,
        dialect: &'a Dialect,
        predicates: &'a PredicateSet,
        options: SplitOptions,
    ) -> Self {
        Self::with_range(source, 0..source.len(), dialect, predicates, options)
    }

    /// Split only `range` of `source`. Offsets stay absolute.
    pub fn with_range(
        source: &'a str,
        range: Range<Pos>,
        dialect: &'a Dialect,
        predicates: &'a PredicateSet,
        options: SplitOptions,
    ) -> Self {
        Self {
            source,
            dialect,
            predicates,
            options,
            lexer: Lexer::with_range(source, range, dialect),
            lookahead: VecDeque::new(),
            state: ScanState::Normal,
            stmt: PendingStatement::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The statement delimiter currently in effect.
    pub fn delimiter(&self) -> &str {
        self.lexer.delimiter()
    }

    fn next_token(&mut self) -> Option<TokenEntry> {
        self.lookahead.pop_front().or_else(|| self.lexer.next())
    }

    fn step(&mut self, token: TokenEntry) -> Option<ScriptElement> {
        if self.state == ScanState::InControlCommand {
            return Some(self.emit_control(&token));
        }
        match token.kind {
            TokenKind::Whitespace => {
                if self.options.blank_line_delimiter
                    && self.stmt.blocks.is_empty()
                    && token.line_feeds() >= 2
                {
                    return self.take_query(None);
                }
                None
            }
            TokenKind::Comment => {
                self.stmt.start.get_or_insert(token.start);
                self.stmt.text_end = token.end();
                if self.dialect.supports_comment_query {
                    self.stmt.valuable = true;
                }
                None
            }
            TokenKind::ControlCommandMarker if self.stmt.blocks.is_empty() => {
                if self.stmt.valuable {
                    self.lookahead.push_front(token);
                    let query = self.take_query(None);
                    self.state = ScanState::InControlCommand;
                    return query;
                }
                Some(self.emit_control(&token))
            }
            TokenKind::Delimiter => self.delimiter_token(&token),
            _ => {
                self.body_token(&token);
                None
            }
        }
    }

    fn delimiter_token(&mut self, token: &TokenEntry) -> Option<ScriptElement> {
        let is_statement_delimiter = self.lexer.is_statement_delimiter(&token.text);
        if is_statement_delimiter && !self.stmt.blocks.is_empty() {
            // Forward declaration (`PROCEDURE p;`) ends its nested header.
            if self.stmt.top().is_some_and(|f| f.kind == BlockKind::Header && f.forward) {
                self.stmt.blocks.pop();
            }
            self.stmt.text_end = token.end();
            self.stmt.trailing = TrailingClose::None;
            self.push_head(token_key(self.dialect, token));
            self.sync_state();
            return None;
        }
        if !self.stmt.blocks.is_empty() {
            debug!(
                offset = token.start,
                depth = self.stmt.blocks.len(),
                "line delimiter closes unbalanced block"
            );
        }
        self.take_query(Some(token))
    }

    fn body_token(&mut self, token: &TokenEntry) {
        let key = token_key(self.dialect, token);
        self.stmt.start.get_or_insert(token.start);
        self.stmt.valuable = true;
        self.stmt.text_end = token.end();
        if self.stmt.first_keyword.is_none() {
            self.stmt.first_keyword = Some(key.clone());
        }

        let closed = self.update_blocks(token, &key);
        self.stmt.trailing = if closed {
            TrailingClose::End
        } else if self.stmt.trailing == TrailingClose::End && token.kind.is_word() {
            TrailingClose::Tagged
        } else {
            TrailingClose::None
        };

        self.push_head(key);
        self.sync_state();
    }

    /// Apply the token to the block stack. Returns true when it closed a block.
    fn update_blocks(&mut self, token: &TokenEntry, key: &CompactString) -> bool {
        match token.kind {
            TokenKind::Keyword | TokenKind::Identifier => {}
            TokenKind::Other => {
                match key.as_str() {
                    "(" | "[" | "{" => self.stmt.blocks.push(BlockFrame::new(BlockKind::Bracket)),
                    ")" | "]" | "}" => {
                        if self.stmt.top_is(BlockKind::Bracket) {
                            self.stmt.blocks.pop();
                        }
                    }
                    _ => {}
                }
                return false;
            }
            _ => return false,
        }

        let predicates = self.predicates;
        if predicates.may_match_at(key) {
            let tail = self.tail_window(key.clone());
            match predicates.action_at(self.stmt.head.make_contiguous(), &tail) {
                Some(ParserAction::SkipSuffixToken) => {
                    trace!(offset = token.start, word = %key, "block keyword skipped");
                    return false;
                }
                Some(ParserAction::BeginBlock) if self.stmt.blocks.is_empty() => {
                    self.stmt.blocks.push(BlockFrame::new(BlockKind::Header));
                    self.stmt.has_blocks = true;
                    return false;
                }
                _ => {}
            }
        }

        let dialect = self.dialect;
        let word = key.as_str();

        if dialect.is_block_end(word) {
            if self.stmt.top().is_some_and(|f| f.kind != BlockKind::Bracket) {
                self.stmt.blocks.pop();
                return true;
            }
            debug!(offset = token.start, "block end without an open block");
            return false;
        }

        if dialect.is_block_begin(word) {
            // `END IF`, `END LOOP`, `END CASE`
            if self.stmt.head.front().is_some_and(|prev| dialect.is_block_end(prev)) {
                return false;
            }
            let opens_body = self.stmt.top_is(BlockKind::Header) && word == dialect.body_begin_word;
            match self.stmt.blocks.last_mut() {
                Some(frame) if opens_body => *frame = BlockFrame::new(BlockKind::Begin),
                _ => self.stmt.blocks.push(BlockFrame::new(BlockKind::Begin)),
            }
            self.stmt.has_blocks = true;
            return false;
        }

        if dialect.is_block_header(word) {
            if !self.stmt.top_is(BlockKind::Header) {
                self.stmt.blocks.push(BlockFrame::new(BlockKind::Header));
            }
            self.stmt.has_blocks = true;
            return false;
        }

        if dialect.is_nested_block_header(word) && self.stmt.top_is(BlockKind::Header) {
            self.stmt.blocks.push(BlockFrame {
                kind: BlockKind::Header,
                forward: true,
            });
        } else if dialect.is_nested_body_word(word) {
            if let Some(frame) = self.stmt.blocks.last_mut() {
                if frame.kind == BlockKind::Header {
                    frame.forward = false;
                }
            }
        }
        false
    }

    /// Keys of the current token and the significant tokens after it.
    /// Peeked tokens stay queued; peeking stops at a control line.
    fn tail_window(&mut self, current: CompactString) -> SmallVec<[CompactString; 8]> {
        let want = self.predicates.max_suffix_length().max(1);
        let mut tail = SmallVec::new();
        tail.push(current);
        let mut idx = 0;
        while tail.len() < want {
            if idx == self.lookahead.len() {
                match self.lexer.next() {
                    Some(token) => self.lookahead.push_back(token),
                    None => break,
                }
            }
            let token = &self.lookahead[idx];
            idx += 1;
            if token.kind == TokenKind::ControlCommandMarker {
                break;
            }
            if token.is_significant() {
                tail.push(token_key(self.dialect, token));
            }
        }
        tail
    }

    fn push_head(&mut self, key: CompactString) {
        let limit = self.predicates.max_prefix_length().max(1);
        self.stmt.head.push_front(key);
        self.stmt.head.truncate(limit);
    }

    fn sync_state(&mut self) {
        self.state = match self.stmt.blocks.len() {
            0 => ScanState::Normal,
            depth => ScanState::InBlock(depth),
        };
    }

    fn emit_control(&mut self, token: &TokenEntry) -> ScriptElement {
        let command = ControlCommand::parse(token, self.dialect.control_command_marker);
        if let Some(delimiter) = command.is_delimiter_change().then(|| command.new_delimiter()) {
            self.lexer.set_delimiter(delimiter.unwrap_or_default());
            // Tokens peeked past the directive were lexed with the old delimiter.
            self.lookahead.clear();
            self.lexer.reset(token.end());
            debug!(delimiter = self.lexer.delimiter(), "statement delimiter changed");
        } else {
            debug!(command = %command.command, offset = command.start, "control command");
        }
        self.stmt = PendingStatement::default();
        self.state = ScanState::Normal;
        ScriptElement::Control(command)
    }

    /// Finish the pending statement. Comment-only statements are dropped.
    fn take_query(&mut self, terminator: Option<&TokenEntry>) -> Option<ScriptElement> {
        let stmt = std::mem::take(&mut self.stmt);
        self.state = ScanState::Normal;
        let start = stmt.start.filter(|_| stmt.valuable)?;

        let mut text = self.source[start..stmt.text_end].trim().to_string();
        if let Some(closing) = self.closing_delimiter(&stmt, terminator) {
            text.push_str(closing);
        }
        let end = terminator.map_or(stmt.text_end, TokenEntry::end);
        let parameters = if self.options.parse_parameters {
            extract_parameters(self.source, start..stmt.text_end, self.dialect, &self.options)
        } else {
            Vec::new()
        };

        Some(ScriptElement::Query(SqlQuery {
            start,
            length: end - start,
            text,
            parameters,
        }))
    }

    fn closing_delimiter(
        &self,
        stmt: &PendingStatement,
        terminator: Option<&TokenEntry>,
    ) -> Option<&'a str> {
        let dialect = self.dialect;
        let default = dialect.statement_delimiter.as_str();
        // Only a default delimiter is re-appended; `GO`, `/`, `//` and end
        // of input leave the text as written.
        if !terminator.is_some_and(|t| t.text == default) {
            return None;
        }
        if self.options.keep_delimiters {
            return Some(default);
        }
        if !stmt.has_blocks {
            return None;
        }
        if dialect.delimiter_after_query {
            return Some(default);
        }
        let block_statement = stmt
            .first_keyword
            .as_deref()
            .is_some_and(|word| dialect.starts_block_statement(word));
        if dialect.delimiter_after_block && stmt.trailing != TrailingClose::None && block_statement {
            return Some(default);
        }
        None
    }

    fn finish(&mut self) -> Option<ScriptElement> {
        if self.stmt.valuable && !self.stmt.blocks.is_empty() {
            debug!(depth = self.stmt.blocks.len(), "end of input inside an open block");
        }
        self.take_query(None)
    }
}

impl Iterator for ScriptSplitter<'_> {
    type Item = ScriptElement;

    fn next(&mut self) -> Option<ScriptElement> {
        while let Some(token) = self.next_token() {
            if let Some(element) = self.step(token) {
                return Some(element);
            }
        }
        self.finish()
    }
}

/// Predicate key of a token: upper-cased text for words and punctuation,
/// the dialect delimiter for every delimiter token.
fn token_key(dialect: &Dialect, token: &TokenEntry) -> CompactString {
    match token.kind {
        TokenKind::Keyword | TokenKind::Identifier | TokenKind::Other => {
            CompactString::from(token.text.to_ascii_uppercase())
        }
        TokenKind::Delimiter => CompactString::from(dialect.statement_delimiter.as_str()),
        _ => CompactString::from(OPAQUE_KEY),
    }
}

/// Index of the element under `offset`.
///
/// An element's end counts as inside it. Between elements, the previous one
/// wins when only blanks on the same line separate it from `offset`.
pub fn element_index_at(source: &str, elements: &[ScriptElement], offset: Pos) -> Option<usize> {
    if let Some(idx) = elements
        .iter()
        .position(|e| e.start() <= offset && offset < e.end())
    {
        return Some(idx);
    }
    if let Some(idx) = elements.iter().rposition(|e| e.end() == offset) {
        return Some(idx);
    }
    let next = elements.iter().position(|e| e.start() > offset);
    let previous = match next {
        Some(0) => None,
        Some(idx) => Some(idx - 1),
        None => elements.len().checked_sub(1),
    };
    match (previous, next) {
        (Some(prev), Some(next)) => {
            let gap = source.get(elements[prev].end()..offset).unwrap_or("");
            Some(if gap.contains('\n') { next } else { prev })
        }
        (Some(prev), None) => Some(prev),
        (None, next) => next,
    }
}

pub fn element_at<'e>(
    source: &str,
    elements: &'e [ScriptElement],
    offset: Pos,
) -> Option<&'e ScriptElement> {
    element_index_at(source, elements, offset).map(|idx| &elements[idx])
}

/// First element starting after `offset`.
pub fn next_element(elements: &[ScriptElement], offset: Pos) -> Option<&ScriptElement> {
    elements.iter().find(|e| e.start() > offset)
}

/// Last element ending before `offset`; the element touching `offset` is
/// not its own predecessor.
pub fn previous_element(elements: &[ScriptElement], offset: Pos) -> Option<&ScriptElement> {
    elements.iter().rev().find(|e| e.end() < offset)
}
