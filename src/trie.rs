//! Sequence trie with a pluggable lookup comparator.
//!
//! Keys are sequences of `K`; every node may hold several values. A lookup
//! walks a query path and unions the values of every node it visits, so a
//! query returns all entries whose key is a prefix of the path. Terms the
//! comparator reports as partially comparable (wildcards) follow every
//! matching child at once.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use smallvec::SmallVec;

/// Ordering and matching rules used to navigate a [`Trie`].
pub trait LookupComparator<K> {
    /// Navigation order of child keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// The term can be located by binary search over the children.
    fn is_strongly_comparable(&self, term: &K) -> bool;

    /// The term may match children that do not compare equal to it.
    fn is_partially_comparable(&self, term: &K) -> bool;

    /// Whether a child key is accepted for a query term.
    fn matches(&self, key: &K, term: &K) -> bool;
}

/// Comparator over string-like keys: non-empty terms match exactly, the
/// empty string is a wildcard that matches any key.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringComparator;

impl<K: AsRef<str>> LookupComparator<K> for StringComparator {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.as_ref().cmp(b.as_ref())
    }

    fn is_strongly_comparable(&self, term: &K) -> bool {
        !term.as_ref().is_empty()
    }

    fn is_partially_comparable(&self, term: &K) -> bool {
        term.as_ref().is_empty()
    }

    fn matches(&self, key: &K, term: &K) -> bool {
        term.as_ref().is_empty() || key.as_ref() == term.as_ref()
    }
}

#[derive(Debug, Clone)]
struct TrieNode<K, V> {
    // Sorted by the trie's comparator.
    children: Vec<(K, TrieNode<K, V>)>,
    values: Vec<V>,
}

impl<K, V> TrieNode<K, V> {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trie<K, V, C> {
    root: TrieNode<K, V>,
    comparator: C,
    len: usize,
}

impl<K, V, C> Trie<K, V, C>
where
    K: Clone,
    V: Clone + Ord,
    C: LookupComparator<K>,
{
    pub fn new(comparator: C) -> Self {
        Self {
            root: TrieNode::new(),
            comparator,
            len: 0,
        }
    }

    /// Number of distinct (path, value) entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Attach `value` to the node at `path`, creating nodes as needed.
    /// Adding the same value twice on one path is a no-op.
    pub fn add(&mut self, path: &[K], value: V) {
        let comparator = &self.comparator;
        let mut node = &mut self.root;
        for key in path {
            let idx = match node
                .children
                .binary_search_by(|(k, _)| comparator.compare(k, key))
            {
                Ok(idx) => idx,
                Err(idx) => {
                    node.children.insert(idx, (key.clone(), TrieNode::new()));
                    idx
                }
            };
            node = &mut node.children[idx].1;
        }
        if !node.values.contains(&value) {
            node.values.push(value);
            self.len += 1;
        }
    }

    /// Union of the values held by every node reached while consuming
    /// `path`, the root included.
    pub fn collect_values_on_path(&self, path: &[K]) -> BTreeSet<V> {
        let mut result: BTreeSet<V> = self.root.values.iter().cloned().collect();
        let mut frontier: SmallVec<[&TrieNode<K, V>; 4]> = SmallVec::new();
        frontier.push(&self.root);

        for term in path {
            let mut next: SmallVec<[&TrieNode<K, V>; 4]> = SmallVec::new();
            for node in &frontier {
                self.advance(node, term, &mut next);
            }
            if next.is_empty() {
                break;
            }
            for node in &next {
                result.extend(node.values.iter().cloned());
            }
            frontier = next;
        }
        result
    }

    fn advance<'t>(
        &self,
        node: &'t TrieNode<K, V>,
        term: &K,
        out: &mut SmallVec<[&'t TrieNode<K, V>; 4]>,
    ) {
        let cmp = &self.comparator;
        if cmp.is_partially_comparable(term) {
            for (key, child) in &node.children {
                if cmp.matches(key, term) {
                    out.push(child);
                }
            }
            return;
        }
        if cmp.is_strongly_comparable(term) {
            let children = &node.children;
            let lo = children.partition_point(|(k, _)| cmp.compare(k, term) == Ordering::Less);
            let hi = lo
                + children[lo..]
                    .partition_point(|(k, _)| cmp.compare(k, term) != Ordering::Greater);
            for (key, child) in &children[lo..hi] {
                if cmp.matches(key, term) {
                    out.push(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    fn path(items: &[&str]) -> Vec<CompactString> {
        items.iter().map(|s| CompactString::from(*s)).collect()
    }

    fn sample() -> Trie<CompactString, u32, StringComparator> {
        let mut trie = Trie::new(StringComparator);
        trie.add(&path(&["5", "1", "2", "3", "4"]), 1);
        trie.add(&path(&["5", "2", "3", "4"]), 2);
        trie.add(&path(&["5", "1", "3", "4"]), 3);
        trie.add(&path(&["5", "1", "2"]), 4);
        trie.add(&path(&["5", "1"]), 5);
        trie.add(&path(&["5", "1", "2", "4"]), 6);
        trie
    }

    #[test]
    fn test_collect_exact_paths() {
        let trie = sample();
        assert_eq!(
            trie.collect_values_on_path(&path(&["5", "1", "2"])),
            BTreeSet::from([4, 5])
        );
        assert_eq!(
            trie.collect_values_on_path(&path(&["5", "1"])),
            BTreeSet::from([5])
        );
        assert_eq!(
            trie.collect_values_on_path(&path(&["5", "1", "2", "3", "4"])),
            BTreeSet::from([1, 4, 5])
        );
    }

    #[test]
    fn test_wildcard_follows_all_siblings() {
        let trie = sample();
        assert_eq!(
            trie.collect_values_on_path(&path(&["5", "", "2", "4"])),
            BTreeSet::from([4, 5, 6])
        );
    }

    #[test]
    fn test_unknown_path_is_empty() {
        let trie = sample();
        assert!(trie.collect_values_on_path(&path(&["7"])).is_empty());
        assert!(trie.collect_values_on_path(&[]).is_empty());
    }

    #[test]
    fn test_root_values_always_included() {
        let mut trie = sample();
        trie.add(&[], 0);
        assert_eq!(
            trie.collect_values_on_path(&path(&["9"])),
            BTreeSet::from([0])
        );
        assert_eq!(
            trie.collect_values_on_path(&path(&["5", "1"])),
            BTreeSet::from([0, 5])
        );
    }

    #[test]
    fn test_add_deduplicates_values() {
        let mut trie = Trie::new(StringComparator);
        trie.add(&path(&["a", "b"]), 1u32);
        trie.add(&path(&["a", "b"]), 1);
        trie.add(&path(&["a", "b"]), 2);
        assert_eq!(trie.len(), 2);
        assert_eq!(
            trie.collect_values_on_path(&path(&["a", "b", "c"])),
            BTreeSet::from([1, 2])
        );
    }
}
