//! `dictionary` — the ordered word list every other component is built over.
//!
//! A `Dictionary` holds distinct lowercase words of one shared length N
//! (1 ≤ N ≤ 10), sorted lexicographically. A word's position in the list is
//! its [`WordId`]; the enumerator's prefix-skip pruning depends on the sort
//! order, so construction enforces it rather than trusting the input file.
//!
//! The word-list file format is plain UTF-8 text, one word per line. Parsing
//! is split into `parse_from_str` (works on any in-memory source) and a
//! `load_from_path` convenience wrapper for the CLI.

use crate::errors::DictionaryError;

/// Index of a word in the dictionary.
pub type WordId = u32;

/// Largest supported word length (and therefore grid size).
pub const MAX_WORD_LEN: usize = 10;

/// A validated, sorted, deduplicated list of equal-length lowercase words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    words: Vec<String>,
    word_len: usize,
}

impl Dictionary {
    /// Validate and canonicalise a word list.
    ///
    /// The expected length is taken from the first word; every other word
    /// must match it. Words are sorted and deduplicated, so `WordId`s refer
    /// to the canonical order, not the input order.
    ///
    /// # Errors
    ///
    /// `NoWords` for an empty list, `WordTooLong` for lengths outside
    /// [1, 10], `InconsistentWordLengths` on a mismatch, `InvalidChar` for
    /// anything outside lowercase a-z.
    pub fn new(mut words: Vec<String>) -> Result<Self, DictionaryError> {
        let Some(first) = words.first() else {
            return Err(DictionaryError::NoWords);
        };
        let word_len = first.len();
        if word_len < 1 || word_len > MAX_WORD_LEN {
            return Err(DictionaryError::WordTooLong(word_len));
        }
        for word in &words {
            if word.len() != word_len {
                return Err(DictionaryError::InconsistentWordLengths {
                    expected: word_len,
                    got: word.len(),
                    word: word.clone(),
                });
            }
            if let Some(bad) = word.chars().find(|c| !c.is_ascii_lowercase()) {
                return Err(DictionaryError::InvalidChar {
                    invalid_char: bad,
                    word: word.clone(),
                });
            }
        }
        words.sort();
        words.dedup();
        Ok(Self { words, word_len })
    }

    /// Parse a word-list file's contents: one word per line, blank lines
    /// skipped.
    ///
    /// # Errors
    ///
    /// Same as [`Dictionary::new`].
    pub fn parse_from_str(contents: &str) -> Result<Self, DictionaryError> {
        let words = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(words)
    }

    /// Read a word-list file from disk and parse it.
    ///
    /// # Errors
    ///
    /// I/O failures are returned as-is; validation failures are wrapped as
    /// `InvalidData` so CLI callers can bubble a single error type.
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let path_ref = path.as_ref();
        let data = std::fs::read_to_string(path_ref).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to read word list from '{}': {}", path_ref.display(), e),
            )
        })?;
        Self::parse_from_str(&data).map_err(std::io::Error::from)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Shared length of every word (the grid size N).
    #[must_use]
    pub fn word_len(&self) -> usize {
        self.word_len
    }

    #[must_use]
    pub fn word(&self, id: WordId) -> &str {
        &self.words[id as usize]
    }

    /// Byte view of a word; cheap to index by column.
    #[must_use]
    pub fn word_bytes(&self, id: WordId) -> &[u8] {
        self.words[id as usize].as_bytes()
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(words: &[&str]) -> Result<Dictionary, DictionaryError> {
        Dictionary::new(words.iter().map(|w| (*w).to_string()).collect())
    }

    #[test]
    fn test_new_sorts_and_dedups() {
        let d = dict(&["cab", "abc", "cab", "bca"]).unwrap();
        assert_eq!(d.words(), ["abc", "bca", "cab"]);
        assert_eq!(d.word_len(), 3);
        assert_eq!(d.word(1), "bca");
    }

    #[test]
    fn test_new_rejects_empty_list() {
        assert!(matches!(dict(&[]), Err(DictionaryError::NoWords)));
    }

    #[test]
    fn test_new_rejects_uneven_lengths() {
        assert!(matches!(
            dict(&["abc", "ab"]),
            Err(DictionaryError::InconsistentWordLengths { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_new_rejects_long_words() {
        assert!(matches!(
            dict(&["abcdefghijk"]),
            Err(DictionaryError::WordTooLong(11))
        ));
    }

    #[test]
    fn test_new_rejects_bad_chars() {
        assert!(matches!(
            dict(&["aBc"]),
            Err(DictionaryError::InvalidChar { invalid_char: 'B', .. })
        ));
        assert!(matches!(
            dict(&["a1c"]),
            Err(DictionaryError::InvalidChar { invalid_char: '1', .. })
        ));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let d = Dictionary::parse_from_str("cat\n\n  dog  \n\nowl\n").unwrap();
        assert_eq!(d.words(), ["cat", "dog", "owl"]);
    }
}
