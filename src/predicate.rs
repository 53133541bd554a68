use std::collections::BTreeSet;

use compact_str::CompactString;

/// A concrete token sequence produced by expanding a predicate tree.
/// Each element is an upper-cased token text.
pub type TokenSequence = Vec<CompactString>;

/// A combinator expression describing acceptable multi-token sequences.
///
/// Trees are owned values, so a cycle cannot be built; the number of
/// sequences `expand` yields is the product of the branch counts and
/// callers keep trees small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPredicateNode {
    Literal(CompactString),
    Sequence(Vec<TokenPredicateNode>),
    Optional(Box<TokenPredicateNode>),
    Alternative(Vec<TokenPredicateNode>),
}

/// A single token, matched case-insensitively.
pub fn literal(token: &str) -> TokenPredicateNode {
    TokenPredicateNode::Literal(CompactString::from(token.to_ascii_uppercase()))
}

pub fn sequence(nodes: Vec<TokenPredicateNode>) -> TokenPredicateNode {
    TokenPredicateNode::Sequence(nodes)
}

pub fn optional(node: TokenPredicateNode) -> TokenPredicateNode {
    TokenPredicateNode::Optional(Box::new(node))
}

pub fn alternative(nodes: Vec<TokenPredicateNode>) -> TokenPredicateNode {
    TokenPredicateNode::Alternative(nodes)
}

/// Whitespace-separated words as a sequence of literals: `words("OR REPLACE")`.
pub fn words(text: &str) -> TokenPredicateNode {
    let mut nodes: Vec<TokenPredicateNode> = text.split_whitespace().map(literal).collect();
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        sequence(nodes)
    }
}

/// The predicate that matches the empty window.
pub fn empty() -> TokenPredicateNode {
    TokenPredicateNode::Sequence(Vec::new())
}

impl From<&str> for TokenPredicateNode {
    fn from(token: &str) -> Self {
        literal(token)
    }
}

impl TokenPredicateNode {
    /// All concrete token sequences this tree can match.
    pub fn expand(&self) -> BTreeSet<TokenSequence> {
        match self {
            Self::Literal(token) => BTreeSet::from([vec![token.clone()]]),
            Self::Sequence(children) => {
                let mut acc: BTreeSet<TokenSequence> = BTreeSet::from([Vec::new()]);
                for child in children {
                    let tails = child.expand();
                    let mut next = BTreeSet::new();
                    for head in &acc {
                        for tail in &tails {
                            let mut seq = head.clone();
                            seq.extend(tail.iter().cloned());
                            next.insert(seq);
                        }
                    }
                    acc = next;
                }
                acc
            }
            Self::Optional(child) => {
                let mut result = child.expand();
                result.insert(Vec::new());
                result
            }
            Self::Alternative(children) => children.iter().flat_map(|c| c.expand()).collect(),
        }
    }
}

/// What the statement scanner does when a condition matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParserAction {
    /// The token at the position opens a block header (e.g. `PACKAGE` in
    /// `CREATE OR REPLACE PACKAGE BODY`).
    BeginBlock,
    /// The token at the position is not a block keyword (e.g. `BEGIN` in
    /// `BEGIN TRANSACTION`).
    SkipSuffixToken,
}

/// A compiled lookaround condition.
///
/// `prefixes` must match the tokens before the candidate position and
/// `suffixes` the tokens from the position on. Head windows are passed
/// nearest-first; tail windows in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPredicatesCondition {
    pub action: ParserAction,
    prefixes: Vec<TokenSequence>,
    suffixes: Vec<TokenSequence>,
    max_prefix_length: usize,
    max_suffix_length: usize,
}

impl TokenPredicatesCondition {
    pub fn new(
        action: ParserAction,
        prefix: TokenPredicateNode,
        suffix: TokenPredicateNode,
    ) -> Self {
        let prefixes: Vec<TokenSequence> = prefix.expand().into_iter().collect();
        let suffixes: Vec<TokenSequence> = suffix.expand().into_iter().collect();
        let max_prefix_length = prefixes.iter().map(Vec::len).max().unwrap_or(0);
        let max_suffix_length = suffixes.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            action,
            prefixes,
            suffixes,
            max_prefix_length,
            max_suffix_length,
        }
    }

    pub fn prefixes(&self) -> &[TokenSequence] {
        &self.prefixes
    }

    pub fn suffixes(&self) -> &[TokenSequence] {
        &self.suffixes
    }

    pub fn max_prefix_length(&self) -> usize {
        self.max_prefix_length
    }

    pub fn max_suffix_length(&self) -> usize {
        self.max_suffix_length
    }

    /// True if some prefix matches `head` and some suffix matches `tail`.
    pub fn matches(&self, head: &[CompactString], tail: &[CompactString]) -> bool {
        let head_ok = self.prefixes.iter().any(|p| {
            p.len() <= head.len() && p.iter().rev().zip(head).all(|(a, b)| a == b)
        });
        head_ok
            && self
                .suffixes
                .iter()
                .any(|s| s.len() <= tail.len() && s.iter().zip(tail).all(|(a, b)| a == b))
    }
}

/// A flat OR of conditions evaluated by direct window comparison.
///
/// Answers the same questions as the trie-backed `PredicateSet`, without the
/// index; used to cross-check it.
#[derive(Debug, Clone, Default)]
pub struct TokenPredicatesList {
    conditions: Vec<TokenPredicatesCondition>,
}

impl TokenPredicatesList {
    pub fn new(conditions: Vec<TokenPredicatesCondition>) -> Self {
        Self { conditions }
    }

    /// Indices of all conditions matching the windows, ascending.
    pub fn matching(&self, head: &[CompactString], tail: &[CompactString]) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches(head, tail))
            .map(|(i, _)| i)
            .collect()
    }
}
