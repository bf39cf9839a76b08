//! `search` — inverted index over a solved corpus, answering "which squares
//! extend this partial grid" as a lazy stream.
//!
//! Keys are 24-bit tokens `(kind << 16) | (index << 8) | letter_id`. Row
//! keys encode exact positions ("row i holds letter c"); column keys only
//! encode presence ("column j contains c somewhere"), so intersecting
//! posting lists over-approximates and a pointwise filter stage runs behind
//! it. Both stages stream over bounded channels and observe a cancellation
//! signal on every candidate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use log::{debug, info};
use roaring::RoaringBitmap;

use crate::catalog::SolutionSet;
use crate::errors::QueryError;
use crate::grid::Grid;

/// Streaming channel bound; imposes backpressure on slow consumers.
const CHANNEL_CAPACITY: usize = 100;

/// Out-of-band stop signal with an optional deadline.
///
/// Cloned into every streaming stage; each stage checks it per candidate
/// and closes its channel within one record of it firing.
#[derive(Debug, Clone)]
pub struct Cancellation {
    deadline: Option<Instant>,
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// A signal that only fires when [`Cancellation::cancel`] is called.
    #[must_use]
    pub fn never() -> Self {
        Self {
            deadline: None,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A signal that also fires once `limit` has elapsed.
    #[must_use]
    pub fn with_deadline(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Letter ↔ 8-bit id mapping drawn from the dictionary, in first-occurrence
/// order. Id 0 is reserved for the empty cell and never assigned.
#[derive(Debug)]
struct Alphabet {
    /// `ids[letter - 'a']`; 0 means "not in the dictionary".
    ids: [u8; 26],
    /// `letters[id]`; slot 0 holds the empty marker.
    letters: Vec<u8>,
}

impl Alphabet {
    fn build(words: &[String]) -> Self {
        let mut ids = [0u8; 26];
        let mut letters = vec![0u8];
        for word in words {
            for &b in word.as_bytes() {
                if !b.is_ascii_lowercase() {
                    continue;
                }
                let slot = (b - b'a') as usize;
                if ids[slot] == 0 {
                    ids[slot] = letters.len() as u8;
                    letters.push(b);
                }
            }
        }
        Self { ids, letters }
    }

    fn id_of(&self, letter: u8) -> Option<u8> {
        let slot = (letter as usize).checked_sub(b'a' as usize)?;
        let id = *self.ids.get(slot)?;
        (id != 0).then_some(id)
    }

    fn letter_of(&self, id: u8) -> u8 {
        self.letters.get(id as usize).copied().unwrap_or(0)
    }
}

const KIND_ROW: u32 = 1;
const KIND_COL: u32 = 2;

/// Packed posting-list key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key(u32);

impl Key {
    fn row(index: usize, letter_id: u8) -> Self {
        Self((KIND_ROW << 16) | ((index as u32) << 8) | u32::from(letter_id))
    }

    fn col(index: usize, letter_id: u8) -> Self {
        Self((KIND_COL << 16) | ((index as u32) << 8) | u32::from(letter_id))
    }

    fn kind(self) -> u32 {
        (self.0 >> 16) & 0xFF
    }

    fn index(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    fn letter_id(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// Immutable inverted index over one solution catalog, shared across
/// concurrent queries.
pub struct Searcher {
    index: AHashMap<Key, RoaringBitmap>,
    alphabet: Alphabet,
    set: SolutionSet,
    size: usize,
}

impl Searcher {
    /// Build the index: one posting insert per filled cell (row keys) and
    /// per distinct (column, letter) pair (column keys) of every solution.
    #[must_use]
    pub fn new(set: SolutionSet) -> Self {
        let size = set.dictionary.first().map(String::len).unwrap_or(0);
        let alphabet = Alphabet::build(&set.dictionary);
        let mut searcher = Self {
            index: AHashMap::new(),
            alphabet,
            set,
            size,
        };

        let started = Instant::now();
        info!(
            "extracting keys from {} solutions",
            searcher.set.solutions.len()
        );
        let mut inserted: u64 = 0;
        for idx in 0..searcher.set.solutions.len() {
            let grid = searcher.set.grid(idx);
            // solution grids only hold dictionary letters, so key
            // extraction cannot miss the alphabet
            let Ok(keys) = searcher.extract_keys(&grid) else {
                continue;
            };
            for key in keys {
                searcher
                    .index
                    .entry(key)
                    .or_insert_with(RoaringBitmap::new)
                    .insert(idx as u32);
                inserted += 1;
                if inserted % 10_000_000 == 0 {
                    debug!("processed {inserted} keys");
                }
            }
        }
        info!(
            "extracted {} keys in {:?}",
            searcher.index.len(),
            started.elapsed()
        );
        searcher
    }

    #[must_use]
    pub fn solution_set(&self) -> &SolutionSet {
        &self.set
    }

    #[must_use]
    pub fn solutions_count(&self) -> usize {
        self.set.solutions.len()
    }

    /// Grid size the catalog was solved at.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    fn describe(&self, key: Key) -> String {
        let letter = self.alphabet.letter_of(key.letter_id()) as char;
        match key.kind() {
            KIND_ROW => format!("Row {} contains letter {letter}", key.index()),
            KIND_COL => format!("Col {} contains letter {letter}", key.index()),
            _ => format!("Unknown key {}", key.0),
        }
    }

    /// The query's key set: positional row keys for every filled cell, and
    /// presence column keys for every letter seen anywhere in a column.
    fn extract_keys(&self, grid: &Grid) -> Result<AHashSet<Key>, QueryError> {
        let mut keys = AHashSet::new();
        let mut column_letters = vec![[false; 26]; grid.size()];
        for (i, j, c) in grid.filled_cells() {
            let id = self.alphabet.id_of(c).ok_or_else(|| {
                QueryError::MissingKey(format!("Row {i} contains letter {}", c as char))
            })?;
            keys.insert(Key::row(i, id));
            column_letters[j][(c - b'a') as usize] = true;
        }
        for (j, seen) in column_letters.iter().enumerate() {
            for (slot, present) in seen.iter().enumerate() {
                if *present {
                    let letter = b'a' + slot as u8;
                    let id = self.alphabet.id_of(letter).ok_or_else(|| {
                        QueryError::MissingKey(format!(
                            "Col {j} contains letter {}",
                            letter as char
                        ))
                    })?;
                    keys.insert(Key::col(j, id));
                }
            }
        }
        Ok(keys)
    }

    /// Stream indices of every catalog solution extending `query`.
    ///
    /// An all-empty query streams the entire catalog. Otherwise posting
    /// lists are intersected smallest-first and survivors pass through the
    /// pointwise filter before emission. Both stages stop within one record
    /// of `cancel` firing or the receiver hanging up.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` for a query of the wrong dimensions; `MissingKey`
    /// when a derived key has no posting list at all.
    pub fn stream_matches(
        self: &Arc<Self>,
        query: &Grid,
        cancel: &Cancellation,
    ) -> Result<Receiver<u32>, QueryError> {
        if query.size() != self.size {
            return Err(QueryError::SizeMismatch {
                expected: self.size,
                got: query.size(),
            });
        }

        if query.is_all_empty() {
            // no keys to intersect: the whole catalog matches
            let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
            let me = Arc::clone(self);
            let cancel = cancel.clone();
            thread::spawn(move || {
                for idx in 0..me.set.solutions.len() as u32 {
                    if cancel.is_cancelled() || tx.send(idx).is_err() {
                        return;
                    }
                }
            });
            return Ok(rx);
        }

        let mut keyed: Vec<(Key, u64)> = Vec::new();
        for key in self.extract_keys(query)? {
            let posting = self
                .index
                .get(&key)
                .ok_or_else(|| QueryError::MissingKey(self.describe(key)))?;
            keyed.push((key, posting.len()));
        }
        keyed.sort_by_key(|&(_, len)| len);
        let keys: Vec<Key> = keyed.into_iter().map(|(k, _)| k).collect();

        // stage 1: iterate the smallest posting list, keep members of all
        // others
        let (candidate_tx, candidate_rx) = sync_channel(CHANNEL_CAPACITY);
        let me = Arc::clone(self);
        let stage1_cancel = cancel.clone();
        thread::spawn(move || {
            let lists: Vec<&RoaringBitmap> = keys.iter().map(|k| &me.index[k]).collect();
            for idx in lists[0].iter() {
                if stage1_cancel.is_cancelled() {
                    debug!("intersection canceled");
                    return;
                }
                if lists[1..].iter().all(|l| l.contains(idx))
                    && candidate_tx.send(idx).is_err()
                {
                    return;
                }
            }
        });

        // stage 2: column keys only prove presence, so confirm each
        // candidate pointwise against the query
        let (match_tx, match_rx) = sync_channel(CHANNEL_CAPACITY);
        let me = Arc::clone(self);
        let stage2_cancel = cancel.clone();
        let query = query.clone();
        thread::spawn(move || {
            for idx in candidate_rx {
                if stage2_cancel.is_cancelled() {
                    debug!("match filter canceled");
                    return;
                }
                if query.matches(&me.set.grid(idx as usize)) && match_tx.send(idx).is_err() {
                    return;
                }
            }
        });

        Ok(match_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::enumerator::{Enumerator, Step};
    use crate::square::Square;

    /// The S3 corpus: all 26 squares over [aaa, aab, abb, bbb, bbc].
    fn s3_catalog() -> SolutionSet {
        let words = ["aaa", "aab", "abb", "bbb", "bbc"];
        let dict =
            Arc::new(Dictionary::new(words.iter().map(|w| (*w).to_string()).collect()).unwrap());
        let mut e = Enumerator::new(Arc::clone(&dict)).unwrap();
        let mut solutions = Vec::new();
        while e.next() == Step::Advanced {
            solutions.push(e.current_square().clone());
        }
        SolutionSet {
            dictionary: dict.words().to_vec(),
            solutions,
        }
    }

    fn collect(rx: Receiver<u32>) -> Vec<u32> {
        let mut out: Vec<u32> = rx.iter().collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_empty_query_streams_entire_catalog() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        assert_eq!(searcher.solutions_count(), 26);
        let rx = searcher
            .stream_matches(&Grid::new(3), &Cancellation::never())
            .unwrap();
        assert_eq!(collect(rx), (0..26).collect::<Vec<u32>>());
    }

    #[test]
    fn test_center_cell_query_is_sound_and_complete() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        let query = Grid::from_text("___\n_b_\n___").unwrap();
        let rx = searcher.stream_matches(&query, &Cancellation::never()).unwrap();
        let got = collect(rx);

        let expected: Vec<u32> = (0..searcher.solutions_count() as u32)
            .filter(|&i| query.matches(&searcher.solution_set().grid(i as usize)))
            .collect();
        assert_eq!(got, expected);
        // center 'b' means the middle row word is abb, bbb or bbc
        assert_eq!(got.len(), 15);
        for idx in &got {
            let square = &searcher.solution_set().solutions[*idx as usize];
            assert!(square.word(1) >= 2);
        }
    }

    #[test]
    fn test_positional_query_filters_presence_false_positives() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        // 'c' only ever appears at (2, 2); no row-1 posting list exists for
        // it even though column 2 carries a presence key
        let query = Grid::from_text("___\n__c\n___").unwrap();
        let err = searcher
            .stream_matches(&query, &Cancellation::never())
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::MissingKey("Row 1 contains letter c".to_string())
        );

        let query = Grid::from_text("___\n___\n__c").unwrap();
        let rx = searcher.stream_matches(&query, &Cancellation::never()).unwrap();
        let got = collect(rx);
        assert!(!got.is_empty());
        for idx in got {
            assert_eq!(searcher.solution_set().grid(idx as usize).get(2, 2), b'c');
        }
    }

    #[test]
    fn test_unknown_letter_surfaces_missing_key() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        let query = Grid::from_text("z__\n___\n___").unwrap();
        let err = searcher
            .stream_matches(&query, &Cancellation::never())
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::MissingKey("Row 0 contains letter z".to_string())
        );
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        let err = searcher
            .stream_matches(&Grid::new(5), &Cancellation::never())
            .unwrap_err();
        assert_eq!(err, QueryError::SizeMismatch { expected: 3, got: 5 });
    }

    #[test]
    fn test_cancellation_stops_stream_promptly() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        let cancel = Cancellation::never();
        cancel.cancel();
        let rx = searcher.stream_matches(&Grid::new(3), &cancel).unwrap();
        // at most one record may already be in flight
        assert!(rx.iter().count() <= 1);
    }

    #[test]
    fn test_deadline_in_the_past_behaves_like_cancel() {
        let searcher = Arc::new(Searcher::new(s3_catalog()));
        let cancel = Cancellation::with_deadline(Duration::from_secs(0));
        let query = Grid::from_text("___\n_b_\n___").unwrap();
        let rx = searcher.stream_matches(&query, &cancel).unwrap();
        assert!(rx.iter().count() <= 1);
    }

    #[test]
    fn test_alphabet_reserves_zero_for_empty() {
        let alphabet = Alphabet::build(&["cab".to_string()]);
        assert_eq!(alphabet.id_of(b'c'), Some(1));
        assert_eq!(alphabet.id_of(b'a'), Some(2));
        assert_eq!(alphabet.id_of(b'b'), Some(3));
        assert_eq!(alphabet.id_of(b'z'), None);
        assert_eq!(alphabet.letter_of(0), 0);
        assert_eq!(alphabet.letter_of(2), b'a');
    }

    #[test]
    fn test_key_packing() {
        let key = Key::row(3, 7);
        assert_eq!(key.0, (1 << 16) | (3 << 8) | 7);
        assert_eq!(key.kind(), KIND_ROW);
        assert_eq!(key.index(), 3);
        assert_eq!(key.letter_id(), 7);
        assert_ne!(Key::row(1, 1), Key::col(1, 1));
    }

    #[test]
    fn test_first_solution_is_all_first_word() {
        let catalog = s3_catalog();
        assert_eq!(catalog.solutions[0], Square::from_words(vec![0, 0, 0]));
    }
}
