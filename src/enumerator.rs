//! `enumerator` — row-at-a-time backtracking over the tuple space of row
//! word assignments.
//!
//! The state walks N-tuples of word ids in lexicographic order, keeping one
//! trie cursor per column. Two prunes keep the walk tractable:
//!
//! 1. a row is only kept when every column cursor can walk into its letter
//!    (all column prefixes still extend to at least one word), and
//! 2. when a column rejects a row at position k, the proposal jumps over
//!    every later word sharing the first k+1 letters — the prefix-skip
//!    table — since each of them fails the same column.
//!
//! A state owns a half-open `[start, end)` slice of the tuple space, which
//! makes range partitioning a matter of base-|D| integer arithmetic; each
//! partition shares the dictionary, trie and skip table and owns its
//! cursors.

use std::fmt;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use log::debug;

use crate::catalog::Checkpoint;
use crate::dictionary::{Dictionary, WordId};
use crate::errors::EnumeratorError;
use crate::square::Square;
use crate::trie::{Trie, TrieCursor};

/// Result of one [`Enumerator::next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The state now holds a fully-populated solution square.
    Advanced,
    /// The state's share of the tuple space is spent.
    Exhausted,
}

/// `skip[w][p]`: the first word id after `w` whose prefix of length `p+1`
/// differs from `w`'s. `|D|` when no such word exists.
#[derive(Debug)]
pub struct PrefixSkip {
    table: Vec<Vec<u32>>,
}

impl PrefixSkip {
    #[must_use]
    pub fn build(dict: &Dictionary) -> Self {
        let len = dict.len();
        let size = dict.word_len();
        let mut table = vec![vec![0u32; size]; len];
        let mut prefix_indices = vec![0usize; size];
        for i in 1..=len {
            for j in 0..size {
                let differs = i == len
                    || dict.word_bytes(i as WordId)[..=j]
                        != dict.word_bytes((i - 1) as WordId)[..=j];
                if differs {
                    for row in &mut table[prefix_indices[j]..i] {
                        row[j] = i as u32;
                    }
                    prefix_indices[j] = i;
                }
            }
        }
        Self { table }
    }

    #[must_use]
    pub fn get(&self, word: WordId, column: usize) -> WordId {
        self.table[word as usize][column]
    }
}

/// One partition of the enumeration, positioned somewhere inside its range.
pub struct Enumerator {
    dict: Arc<Dictionary>,
    trie: Arc<Trie>,
    skip: Arc<PrefixSkip>,
    /// One cursor per column, each at depth `current_row + 1`.
    cursors: Vec<TrieCursor>,
    /// Row tuple; entries beyond `current_row` are 0.
    rows: Square,
    /// Index of the last assigned row; −1 before the first.
    current_row: i32,
    start: Square,
    /// Exclusive bound. A fresh state's top digit is `|D|`, one past the
    /// maximal tuple.
    end: Square,
    done: bool,
}

impl Enumerator {
    /// A fresh enumerator over the dictionary's whole tuple space.
    ///
    /// # Errors
    ///
    /// Propagates trie construction failures (impossible for a validated
    /// dictionary).
    pub fn new(dict: Arc<Dictionary>) -> Result<Self, EnumeratorError> {
        let trie = Arc::new(Trie::for_dictionary(&dict)?);
        let skip = Arc::new(PrefixSkip::build(&dict));
        let size = dict.word_len();
        let mut end = Square::zeroed(size);
        end.set_word(0, dict.len() as u32);
        Ok(Self::with_bounds(dict, trie, skip, Square::zeroed(size), end))
    }

    fn with_bounds(
        dict: Arc<Dictionary>,
        trie: Arc<Trie>,
        skip: Arc<PrefixSkip>,
        start: Square,
        end: Square,
    ) -> Self {
        let size = dict.word_len();
        Self {
            cursors: (0..size).map(|_| trie.cursor()).collect(),
            rows: Square::zeroed(size),
            current_row: -1,
            dict,
            trie,
            skip,
            start,
            end,
            done: false,
        }
    }

    /// Restore a state from a checkpoint by replaying its placed rows.
    /// The result is equivalent to the snapshotted original, cursors
    /// included.
    ///
    /// # Errors
    ///
    /// Validation failures on the stored fields, or `ReplayFailed` when a
    /// stored row no longer stacks (a corrupt checkpoint).
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Result<Self, EnumeratorError> {
        let dict = Arc::new(Dictionary::new(checkpoint.dictionary.clone())?);
        let size = dict.word_len();
        let len = dict.len() as u32;
        if checkpoint.current_row < -1 || checkpoint.current_row >= size as i32 {
            return Err(EnumeratorError::CurrentRowOutOfRange {
                current_row: checkpoint.current_row,
                size,
            });
        }
        for square in [&checkpoint.current, &checkpoint.start, &checkpoint.end] {
            if square.len() != size {
                return Err(EnumeratorError::SquareSizeMismatch {
                    expected: size,
                    got: square.len(),
                });
            }
        }
        for &id in checkpoint.current.words().iter().chain(checkpoint.start.words()) {
            if id >= len {
                return Err(EnumeratorError::WordIdOutOfRange {
                    id,
                    dictionary_len: dict.len(),
                });
            }
        }
        // the end bound's top digit may legitimately be one past the
        // dictionary (the exclusive cover of the whole space)
        for (i, &id) in checkpoint.end.words().iter().enumerate() {
            if id > len || (i > 0 && id >= len) {
                return Err(EnumeratorError::WordIdOutOfRange {
                    id,
                    dictionary_len: dict.len(),
                });
            }
        }

        let trie = Arc::new(Trie::for_dictionary(&dict)?);
        let skip = Arc::new(PrefixSkip::build(&dict));
        let mut state = Self::with_bounds(
            dict,
            trie,
            skip,
            checkpoint.start.clone(),
            checkpoint.end.clone(),
        );
        for row in 0..=checkpoint.current_row {
            let word = checkpoint.current.word(row as usize);
            if let Some(column) = state.add_row(word) {
                return Err(EnumeratorError::ReplayFailed {
                    row: row as usize,
                    word,
                    column,
                });
            }
        }
        state.done = !state.within_end();
        Ok(state)
    }

    /// Snapshot the state. `from_checkpoint` of the result reproduces this
    /// state exactly.
    #[must_use]
    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            dictionary: self.dict.words().to_vec(),
            current: self.rows.clone(),
            current_row: self.current_row,
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// Split the configured `[start, end)` range into `partitions`
    /// contiguous half-open sub-ranges of near-equal integer size. The
    /// partitions share the dictionary, trie and skip table; each seeks to
    /// its own start tuple.
    ///
    /// # Errors
    ///
    /// `RangeTooSmall` when the range holds no more tuples than requested
    /// partitions.
    pub fn partition(&self, partitions: usize) -> Result<Vec<Enumerator>, EnumeratorError> {
        let base = self.dict.len() as u32;
        let size = self.size();
        let start_int = self.start.to_nat(base);
        let end_int = self.end.to_nat(base);
        let range = end_int.sub(&start_int);
        if partitions == 0 || range <= crate::square::Nat::from_u64(partitions as u64) {
            return Err(EnumeratorError::RangeTooSmall {
                partitions,
                range_size: range.to_string(),
            });
        }
        let (width, _) = range.div_rem_small(partitions as u32);
        let mut parts = Vec::with_capacity(partitions);
        for i in 0..partitions {
            let part_start = start_int.add(&width.mul_small(i as u32));
            let part_end = if i + 1 == partitions {
                end_int.clone()
            } else {
                start_int.add(&width.mul_small(i as u32 + 1))
            };
            let mut part = Self::with_bounds(
                Arc::clone(&self.dict),
                Arc::clone(&self.trie),
                Arc::clone(&self.skip),
                Square::from_nat(&part_start, base, size),
                Square::from_nat(&part_end, base, size),
            );
            part.seek();
            parts.push(part);
        }
        debug!("partitioned range of {range} tuples into {partitions} parts");
        Ok(parts)
    }

    /// Place `word` at `current_row + 1` if every column accepts its
    /// letter. On failure returns the rejecting column, with the first
    /// cursors rolled back and the row count unchanged.
    fn add_row(&mut self, word: WordId) -> Option<usize> {
        if self.terminal() {
            return None;
        }
        let bytes = self.dict.word_bytes(word);
        for col in 0..self.size() {
            if !self.cursors[col].walk_in(bytes[col]) {
                for cursor in &mut self.cursors[..col] {
                    cursor.walk_out();
                }
                return Some(col);
            }
        }
        self.current_row += 1;
        self.rows.set_word(self.current_row as usize, word);
        None
    }

    /// Unassign the current row. Returns true when the removed row was the
    /// first one, i.e. the state is back past the root.
    fn remove_row(&mut self) -> bool {
        if self.current_row < 0 {
            return false;
        }
        self.rows.set_word(self.current_row as usize, 0);
        for cursor in &mut self.cursors {
            cursor.walk_out();
        }
        self.current_row -= 1;
        self.current_row < 0
    }

    /// All N rows assigned (and therefore, by column-cursor construction,
    /// all N columns are dictionary words).
    #[must_use]
    pub fn terminal(&self) -> bool {
        self.current_row + 1 == self.size() as i32
    }

    fn within_end(&self) -> bool {
        self.rows < self.end
    }

    /// Advance to the next solution square at or after the current
    /// position. Emits `Advanced` with the state holding the square, or
    /// `Exhausted` once the range is spent (and on every later call).
    pub fn next(&mut self) -> Step {
        if self.done {
            return Step::Exhausted;
        }
        let (propose, replace) = if self.terminal() {
            (self.rows.word(self.current_row as usize) + 1, true)
        } else {
            (0, false)
        };
        self.run_from(propose, replace)
    }

    /// The shared proposal loop: try `propose` at the open row, pruning and
    /// backtracking until a solution square materialises or the range ends.
    fn run_from(&mut self, mut propose: WordId, mut replace: bool) -> Step {
        let len = self.dict.len() as WordId;
        loop {
            // ran off the dictionary: back out rows until a sibling exists
            while propose >= len {
                if replace && self.remove_row() {
                    self.done = true;
                    return Step::Exhausted;
                }
                if self.current_row < 0 {
                    self.done = true;
                    return Step::Exhausted;
                }
                propose = self.rows.word(self.current_row as usize) + 1;
                replace = true;
            }
            if replace {
                self.remove_row();
                replace = false;
            }
            let failed_column = self.add_row(propose);
            if !self.within_end() {
                self.done = true;
                return Step::Exhausted;
            }
            match failed_column {
                None if self.terminal() => return Step::Advanced,
                // all column prefixes viable: descend into the next row
                None => propose = 0,
                // skip every word sharing the invalidating prefix
                Some(column) => propose = self.skip.get(propose, column),
            }
        }
    }

    /// Position the state at its start tuple: replay its rows, and if one
    /// of them no longer stacks, fall through to the proposal loop so the
    /// state lands on the first solution past the dead prefix.
    fn seek(&mut self) {
        for row in 0..self.size() {
            let target = self.start.word(row);
            match self.add_row(target) {
                None => {
                    if !self.within_end() {
                        self.done = true;
                        return;
                    }
                }
                Some(column) => {
                    let _ = self.run_from(self.skip.get(target, column), false);
                    return;
                }
            }
        }
    }

    /// Drain every solution in this partition's range into `out`, starting
    /// with the current state if it already holds one. Returns early when
    /// the receiver hangs up.
    pub fn collect_terminals(mut self, out: SyncSender<Square>) {
        if self.terminal() && !self.done && out.send(self.rows.clone()).is_err() {
            return;
        }
        while self.next() == Step::Advanced {
            if out.send(self.rows.clone()).is_err() {
                return;
            }
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.dict.word_len()
    }

    #[must_use]
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dict
    }

    /// The row tuple as currently assigned (entries beyond the current row
    /// are 0).
    #[must_use]
    pub fn current_square(&self) -> &Square {
        &self.rows
    }

    #[must_use]
    pub fn current_row(&self) -> i32 {
        self.current_row
    }

    /// Depth of each column cursor; always `current_row + 1`.
    #[must_use]
    pub fn column_depths(&self) -> Vec<usize> {
        self.cursors.iter().map(TrieCursor::depth).collect()
    }
}

impl fmt::Display for Enumerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        for i in 0..size {
            if i as i32 <= self.current_row {
                for b in self.dict.word_bytes(self.rows.word(i)) {
                    write!(f, "{} ", *b as char)?;
                }
            } else {
                for _ in 0..size {
                    write!(f, "_ ")?;
                }
            }
            write!(f, "{}", self.rows.word(i))?;
            if i + 1 < size {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
