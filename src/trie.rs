//! `trie` — fixed-fanout trie over the dictionary, with wildcard search.
//!
//! Nodes live in an arena indexed by `u32`, each carrying its parent and
//! depth, so cursors can walk back out without reference cycles. The trie is
//! frozen once built; the only mutable state afterwards is the wildcard
//! result cache, which is a concurrent map keyed by a base-27 positional
//! hash of the pattern (injective for patterns up to length 10, see tests).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::dictionary::{Dictionary, MAX_WORD_LEN};
use crate::errors::TrieError;

/// Pattern byte standing for "any letter".
pub const WILDCARD: u8 = b'?';

const FANOUT: usize = 26;
const ROOT: u32 = 0;

#[derive(Debug)]
struct Node {
    /// Child arena indices; 0 means "no child" (slot 0 is the root, which is
    /// never anyone's child).
    children: [u32; FANOUT],
    parent: u32,
    depth: u8,
    is_end: bool,
}

impl Node {
    fn new(parent: u32, depth: u8) -> Self {
        Self {
            children: [0; FANOUT],
            parent,
            depth,
            is_end: false,
        }
    }
}

/// Trie over words of one fixed length.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<Node>,
    word_len: usize,
    cache: DashMap<u64, Arc<Vec<String>>>,
    cache_hits: AtomicU64,
}

impl Trie {
    /// # Errors
    ///
    /// `LengthOutOfRange` unless 1 ≤ `word_len` ≤ 10.
    pub fn new(word_len: usize) -> Result<Self, TrieError> {
        if word_len < 1 || word_len > MAX_WORD_LEN {
            return Err(TrieError::LengthOutOfRange(word_len));
        }
        Ok(Self {
            // root is its own parent so walk_out at the root is a no-op
            nodes: vec![Node::new(ROOT, 0)],
            word_len,
            cache: DashMap::new(),
            cache_hits: AtomicU64::new(0),
        })
    }

    /// Build a trie holding every word of a dictionary.
    ///
    /// # Errors
    ///
    /// Propagates [`Trie::insert`] failures; a validated dictionary never
    /// triggers them.
    pub fn for_dictionary(dict: &Dictionary) -> Result<Self, TrieError> {
        let mut trie = Self::new(dict.word_len())?;
        for word in dict.words() {
            trie.insert(word)?;
        }
        Ok(trie)
    }

    /// Insert a word. Idempotent.
    ///
    /// # Errors
    ///
    /// `InvalidLength` if the word is not exactly `word_len` characters,
    /// `InvalidChar` for anything outside lowercase a-z.
    pub fn insert(&mut self, word: &str) -> Result<(), TrieError> {
        if word.len() != self.word_len {
            return Err(TrieError::InvalidLength {
                expected: self.word_len,
                got: word.len(),
            });
        }
        let mut node = ROOT;
        for (i, b) in word.bytes().enumerate() {
            if !b.is_ascii_lowercase() {
                return Err(TrieError::InvalidChar(
                    word.chars().nth(i).unwrap_or(b as char),
                ));
            }
            let slot = (b - b'a') as usize;
            let child = self.nodes[node as usize].children[slot];
            node = if child != 0 {
                child
            } else {
                let depth = self.nodes[node as usize].depth + 1;
                let id = self.nodes.len() as u32;
                self.nodes.push(Node::new(node, depth));
                self.nodes[node as usize].children[slot] = id;
                id
            };
        }
        self.nodes[node as usize].is_end = true;
        Ok(())
    }

    /// Every dictionary word matching `pattern`, where `?` matches any
    /// letter. Results are memoised per pattern; repeated searches return
    /// the same shared vector and bump the hit counter.
    ///
    /// # Errors
    ///
    /// `InvalidLength` for a pattern of the wrong length, `InvalidChar` for
    /// anything outside lowercase a-z and `?`. Invalid patterns are rejected
    /// before they reach the cache.
    pub fn search_wildcard(&self, pattern: &str) -> Result<Arc<Vec<String>>, TrieError> {
        let bytes = pattern.as_bytes();
        if bytes.len() != self.word_len {
            return Err(TrieError::InvalidLength {
                expected: self.word_len,
                got: bytes.len(),
            });
        }
        for (i, &b) in bytes.iter().enumerate() {
            if b != WILDCARD && !b.is_ascii_lowercase() {
                return Err(TrieError::InvalidChar(
                    pattern.chars().nth(i).unwrap_or(b as char),
                ));
            }
        }

        let hash = pattern_hash(bytes);
        if let Some(hit) = self.cache.get(&hash) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit.value()));
        }

        let mut current = Vec::with_capacity(self.word_len);
        let mut results = Vec::new();
        self.search_rec(ROOT, bytes, 0, &mut current, &mut results);
        let results = Arc::new(results);
        self.cache.insert(hash, Arc::clone(&results));
        Ok(results)
    }

    fn search_rec(
        &self,
        node: u32,
        pattern: &[u8],
        index: usize,
        current: &mut Vec<u8>,
        results: &mut Vec<String>,
    ) {
        let n = &self.nodes[node as usize];
        if index == pattern.len() {
            if n.is_end {
                results.push(current.iter().map(|&b| b as char).collect());
            }
            return;
        }
        if pattern[index] == WILDCARD {
            for (slot, &child) in n.children.iter().enumerate() {
                if child != 0 {
                    current.push(b'a' + slot as u8);
                    self.search_rec(child, pattern, index + 1, current, results);
                    current.pop();
                }
            }
        } else {
            let child = n.children[(pattern[index] - b'a') as usize];
            if child != 0 {
                current.push(pattern[index]);
                self.search_rec(child, pattern, index + 1, current, results);
                current.pop();
            }
        }
    }

    /// Number of cache hits served so far.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Number of distinct patterns cached so far.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn word_len(&self) -> usize {
        self.word_len
    }

    /// A fresh cursor parked at the root.
    #[must_use]
    pub fn cursor(self: &Arc<Self>) -> TrieCursor {
        TrieCursor {
            trie: Arc::clone(self),
            node: ROOT,
        }
    }
}

/// Injective hash of a fixed-length pattern over `{a..z, ?}`.
///
/// Base-27 positional value with a leading 1, so patterns of different
/// lengths never collide either; 27^10 fits comfortably in 64 bits.
#[must_use]
pub fn pattern_hash(pattern: &[u8]) -> u64 {
    let mut h: u64 = 1;
    for &b in pattern {
        let v = if b == WILDCARD {
            26
        } else {
            u64::from(b - b'a')
        };
        h = h * 27 + v;
    }
    h
}

/// A mutable position in a shared trie. One cursor per column per
/// enumerator; cursors are never shared across threads.
#[derive(Debug, Clone)]
pub struct TrieCursor {
    trie: Arc<Trie>,
    node: u32,
}

impl TrieCursor {
    /// Move into the child for `letter`. Returns false (cursor unchanged)
    /// when no such child exists or `letter` is not a lowercase letter.
    pub fn walk_in(&mut self, letter: u8) -> bool {
        let Some(slot) = (letter as usize)
            .checked_sub(b'a' as usize)
            .filter(|s| *s < FANOUT)
        else {
            return false;
        };
        let child = self.trie.nodes[self.node as usize].children[slot];
        if child == 0 {
            return false;
        }
        self.node = child;
        true
    }

    /// Move to the parent; a no-op at the root.
    pub fn walk_out(&mut self) {
        self.node = self.trie.nodes[self.node as usize].parent;
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.trie.nodes[self.node as usize].depth as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn trie_of(word_len: usize, words: &[&str]) -> Trie {
        let mut t = Trie::new(word_len).unwrap();
        for w in words {
            t.insert(w).unwrap();
        }
        t
    }

    #[test]
    fn test_search_word_missing() {
        let t = trie_of(5, &["berry"]);
        assert!(t.search_wildcard("apple").unwrap().is_empty());
    }

    #[test]
    fn test_search_end_wildcard() {
        let t = trie_of(3, &["abz", "aba", "acz", "aca", "acb", "acc", "acd"]);
        let got = t.search_wildcard("ab?").unwrap();
        assert_eq!(*got, vec!["aba".to_string(), "abz".to_string()]);
    }

    #[test]
    fn test_search_all_wildcards_returns_everything() {
        let t = trie_of(2, &["ab", "ba", "bb"]);
        let got = t.search_wildcard("??").unwrap();
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn test_insert_rejects_non_letters() {
        let mut t = Trie::new(1).unwrap();
        assert_eq!(t.insert("1"), Err(TrieError::InvalidChar('1')));
    }

    #[test]
    fn test_search_rejects_non_letters() {
        let t = trie_of(1, &["a"]);
        assert_eq!(
            t.search_wildcard("1").unwrap_err(),
            TrieError::InvalidChar('1')
        );
        // a rejected pattern must not end up cached
        assert_eq!(t.cache_len(), 0);
    }

    #[test]
    fn test_search_rejects_wrong_length() {
        let t = trie_of(3, &["abc"]);
        assert_eq!(
            t.search_wildcard("ab").unwrap_err(),
            TrieError::InvalidLength { expected: 3, got: 2 }
        );
    }

    #[test]
    fn test_cache_returns_shared_result_and_counts_hits() {
        let t = trie_of(3, &["abc", "abd"]);
        let first = t.search_wildcard("ab?").unwrap();
        assert_eq!(t.cache_hits(), 0);
        let second = t.search_wildcard("ab?").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(t.cache_hits(), 1);
        assert_eq!(t.cache_len(), 1);
    }

    #[test]
    fn test_pattern_hash_injective_small_lengths() {
        const SYMBOLS: [u8; 27] = {
            let mut s = [0u8; 27];
            let mut i = 0;
            while i < 26 {
                s[i] = b'a' + i as u8;
                i += 1;
            }
            s[26] = WILDCARD;
            s
        };

        for length in 1..=4usize {
            let mut seen: HashMap<u64, Vec<u8>> = HashMap::new();
            let mut pattern = vec![0u8; length];
            let mut counters = vec![0usize; length];
            loop {
                for (i, &c) in counters.iter().enumerate() {
                    pattern[i] = SYMBOLS[c];
                }
                let h = pattern_hash(&pattern);
                if let Some(prev) = seen.insert(h, pattern.clone()) {
                    panic!(
                        "hash collision at length {length}: {prev:?} vs {pattern:?} -> {h}"
                    );
                }
                // odometer over 27 symbols
                let mut pos = 0;
                loop {
                    if pos == length {
                        break;
                    }
                    counters[pos] += 1;
                    if counters[pos] < SYMBOLS.len() {
                        break;
                    }
                    counters[pos] = 0;
                    pos += 1;
                }
                if pos == length {
                    break;
                }
            }
            assert_eq!(seen.len(), SYMBOLS.len().pow(length as u32));
        }
    }

    #[test]
    fn test_cursor_walks() {
        let t = Arc::new(trie_of(3, &["cat", "cot"]));
        let mut cursor = t.cursor();
        assert_eq!(cursor.depth(), 0);
        assert!(cursor.walk_in(b'c'));
        assert!(cursor.walk_in(b'a'));
        assert_eq!(cursor.depth(), 2);
        assert!(!cursor.walk_in(b'z'));
        assert_eq!(cursor.depth(), 2);
        cursor.walk_out();
        assert!(cursor.walk_in(b'o'));
        assert!(cursor.walk_in(b't'));
        assert_eq!(cursor.depth(), 3);
    }

    #[test]
    fn test_cursor_walk_out_at_root_is_noop() {
        let t = Arc::new(trie_of(2, &["ab"]));
        let mut cursor = t.cursor();
        cursor.walk_out();
        assert_eq!(cursor.depth(), 0);
        assert!(cursor.walk_in(b'a'));
    }
}
