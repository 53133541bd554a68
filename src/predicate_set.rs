use std::collections::{BTreeSet, HashSet};

use compact_str::CompactString;

use crate::predicate::{ParserAction, TokenPredicatesCondition};
use crate::trie::{StringComparator, Trie};

/// Trie-backed index over a dialect's compiled conditions.
///
/// Prefix sequences are stored reversed so that a head window given
/// nearest-first walks them directly. A condition matches a position when
/// it is found on both the prefix path and the suffix path.
#[derive(Debug, Clone)]
pub struct PredicateSet {
    conditions: Vec<TokenPredicatesCondition>,
    prefix_trie: Trie<CompactString, usize, StringComparator>,
    suffix_trie: Trie<CompactString, usize, StringComparator>,
    // First tokens of all suffixes; `any_head` when some suffix is empty.
    suffix_heads: HashSet<CompactString>,
    any_head: bool,
    max_prefix_length: usize,
    max_suffix_length: usize,
}

impl PredicateSet {
    pub fn new(conditions: Vec<TokenPredicatesCondition>) -> Self {
        let mut prefix_trie = Trie::new(StringComparator);
        let mut suffix_trie = Trie::new(StringComparator);
        let mut suffix_heads = HashSet::new();
        let mut any_head = false;
        let mut max_prefix_length = 0;
        let mut max_suffix_length = 0;

        for (idx, condition) in conditions.iter().enumerate() {
            for prefix in condition.prefixes() {
                let reversed: Vec<CompactString> = prefix.iter().rev().cloned().collect();
                prefix_trie.add(&reversed, idx);
            }
            for suffix in condition.suffixes() {
                suffix_trie.add(suffix, idx);
                match suffix.first() {
                    Some(head) => {
                        suffix_heads.insert(head.clone());
                    }
                    None => any_head = true,
                }
            }
            max_prefix_length = max_prefix_length.max(condition.max_prefix_length());
            max_suffix_length = max_suffix_length.max(condition.max_suffix_length());
        }

        Self {
            conditions,
            prefix_trie,
            suffix_trie,
            suffix_heads,
            any_head,
            max_prefix_length,
            max_suffix_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Longest head window any condition inspects.
    pub fn max_prefix_length(&self) -> usize {
        self.max_prefix_length
    }

    /// Longest tail window any condition inspects (current token included).
    pub fn max_suffix_length(&self) -> usize {
        self.max_suffix_length
    }

    /// Cheap pre-check: can any condition match at a token with this key?
    pub fn may_match_at(&self, key: &str) -> bool {
        self.any_head || self.suffix_heads.contains(key)
    }

    /// Indices of the conditions matching at a position, ascending.
    pub fn matching(&self, head: &[CompactString], tail: &[CompactString]) -> Vec<usize> {
        if self.conditions.is_empty() {
            return Vec::new();
        }
        let by_suffix = self.suffix_trie.collect_values_on_path(tail);
        if by_suffix.is_empty() {
            return Vec::new();
        }
        let by_prefix: BTreeSet<usize> = self.prefix_trie.collect_values_on_path(head);
        by_suffix.intersection(&by_prefix).copied().collect()
    }

    /// The action to take at a position. A skip wins over a block start.
    pub fn action_at(&self, head: &[CompactString], tail: &[CompactString]) -> Option<ParserAction> {
        let mut action = None;
        for idx in self.matching(head, tail) {
            match self.conditions[idx].action {
                ParserAction::SkipSuffixToken => return Some(ParserAction::SkipSuffixToken),
                ParserAction::BeginBlock => action = Some(ParserAction::BeginBlock),
            }
        }
        action
    }
}
