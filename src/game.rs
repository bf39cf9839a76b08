//! `game` — interactive grid editor, a consumer of the trie's wildcard
//! search.
//!
//! The editor owns a mutable grid and a count of open cells per line (rows
//! first, then columns). Adding a word reports exactly the cells it newly
//! filled, so removal can restore the previous state without disturbing
//! letters contributed by crossing words.

use std::collections::HashSet;
use std::sync::Arc;

use crate::dictionary::Dictionary;
use crate::errors::{GameError, TrieError};
use crate::grid::{Grid, EMPTY};
use crate::trie::{Trie, WILDCARD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    fn increments(self) -> (usize, usize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
        }
    }

    #[must_use]
    pub fn cross(self) -> Direction {
        match self {
            Direction::Horizontal => Direction::Vertical,
            Direction::Vertical => Direction::Horizontal,
        }
    }
}

/// A word the editor can legally place on a line right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub index: usize,
    pub direction: Direction,
    pub word: String,
}

pub struct Game {
    grid: Grid,
    words: HashSet<String>,
    trie: Arc<Trie>,
    /// Open cells per line: rows in `0..N`, columns in `N..2N`.
    remaining_slots: Vec<usize>,
    size: usize,
}

impl Game {
    /// # Errors
    ///
    /// Propagates trie construction failures (impossible for a validated
    /// dictionary).
    pub fn new(dict: &Dictionary) -> Result<Self, TrieError> {
        let size = dict.word_len();
        Ok(Self {
            grid: Grid::new(size),
            words: dict.words().iter().cloned().collect(),
            trie: Arc::new(Trie::for_dictionary(dict)?),
            remaining_slots: vec![size; 2 * size],
            size,
        })
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Open cells on a row (`Horizontal`) or column (`Vertical`).
    #[must_use]
    pub fn remaining_slots(&self, index: usize, direction: Direction) -> usize {
        match direction {
            Direction::Horizontal => self.remaining_slots[index],
            Direction::Vertical => self.remaining_slots[self.size + index],
        }
    }

    /// Every line is full, i.e. the grid is a complete square.
    #[must_use]
    pub fn terminal(&self) -> bool {
        self.remaining_slots.iter().all(|&open| open == 0)
    }

    fn line_start(&self, index: usize, direction: Direction) -> (usize, usize) {
        match direction {
            Direction::Horizontal => (index, 0),
            Direction::Vertical => (0, index),
        }
    }

    /// Place a dictionary word on a line. Returns the cross-axis indices of
    /// the cells it newly filled (cells already holding the right letter
    /// are left alone and not reported). The grid is untouched on error.
    ///
    /// # Errors
    ///
    /// `OutOfBounds`, `UnknownWord`, or `Collision` on the first cell whose
    /// letter disagrees.
    pub fn add_word(
        &mut self,
        word: &str,
        index: usize,
        direction: Direction,
    ) -> Result<Vec<usize>, GameError> {
        if index >= self.size {
            return Err(GameError::OutOfBounds {
                index,
                size: self.size,
            });
        }
        if !self.words.contains(word) {
            return Err(GameError::UnknownWord(word.to_string()));
        }
        let (row_inc, col_inc) = direction.increments();
        let (start_row, start_col) = self.line_start(index, direction);

        // detect collisions before touching anything
        let (mut row, mut col) = (start_row, start_col);
        for &b in word.as_bytes() {
            let cell = self.grid.get(row, col);
            if cell != EMPTY && cell != b {
                return Err(GameError::Collision { row, col });
            }
            row += row_inc;
            col += col_inc;
        }

        let mut filled = Vec::new();
        let (mut row, mut col) = (start_row, start_col);
        for &b in word.as_bytes() {
            if self.grid.get(row, col) == EMPTY {
                self.grid.set(row, col, b);
                self.remaining_slots[row] -= 1;
                self.remaining_slots[self.size + col] -= 1;
                filled.push(match direction {
                    Direction::Horizontal => col,
                    Direction::Vertical => row,
                });
            }
            row += row_inc;
            col += col_inc;
        }
        Ok(filled)
    }

    /// Undo an `add_word`: clear exactly the cells it reported as newly
    /// filled.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` for a bad line index.
    pub fn remove_word(
        &mut self,
        filled: &[usize],
        index: usize,
        direction: Direction,
    ) -> Result<(), GameError> {
        if index >= self.size {
            return Err(GameError::OutOfBounds {
                index,
                size: self.size,
            });
        }
        for &i in filled {
            let (row, col) = match direction {
                Direction::Horizontal => (index, i),
                Direction::Vertical => (i, index),
            };
            self.grid.set(row, col, EMPTY);
            self.remaining_slots[row] += 1;
            self.remaining_slots[self.size + col] += 1;
        }
        Ok(())
    }

    /// The line's current letters with `?` in every open cell.
    fn extract_pattern(&self, index: usize, direction: Direction) -> String {
        let (row_inc, col_inc) = direction.increments();
        let (mut row, mut col) = self.line_start(index, direction);
        let mut pattern = String::with_capacity(self.size);
        for _ in 0..self.size {
            let cell = self.grid.get(row, col);
            pattern.push(if cell == EMPTY {
                WILDCARD as char
            } else {
                cell as char
            });
            row += row_inc;
            col += col_inc;
        }
        pattern
    }

    /// Candidate placements for every line with open cells: each trie match
    /// for the line's pattern, kept only if placing it leaves every crossed
    /// line with at least one candidate of its own.
    pub fn completions(&mut self) -> Vec<Completion> {
        let mut out = Vec::new();
        for line in 0..2 * self.size {
            if self.remaining_slots[line] == 0 {
                continue;
            }
            let (index, direction) = if line < self.size {
                (line, Direction::Horizontal)
            } else {
                (line - self.size, Direction::Vertical)
            };
            let pattern = self.extract_pattern(index, direction);
            let Ok(candidates) = self.trie.search_wildcard(&pattern) else {
                continue;
            };
            for word in candidates.iter() {
                let Ok(filled) = self.add_word(word, index, direction) else {
                    continue;
                };
                let viable = filled.iter().all(|&cross_index| {
                    let cross_pattern = self.extract_pattern(cross_index, direction.cross());
                    self.trie
                        .search_wildcard(&cross_pattern)
                        .map(|matches| !matches.is_empty())
                        .unwrap_or(false)
                });
                if self.remove_word(&filled, index, direction).is_err() {
                    continue;
                }
                if viable {
                    out.push(Completion {
                        index,
                        direction,
                        word: word.clone(),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(words: &[&str]) -> Dictionary {
        Dictionary::new(words.iter().map(|w| (*w).to_string()).collect()).unwrap()
    }

    #[test]
    fn test_add_word_fills_line_and_reports_new_cells() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        let filled = game.add_word("ab", 0, Direction::Horizontal).unwrap();
        assert_eq!(filled, vec![0, 1]);
        assert_eq!(game.grid().to_string(), "ab\n__");
        assert_eq!(game.remaining_slots(0, Direction::Horizontal), 0);
        assert_eq!(game.remaining_slots(0, Direction::Vertical), 1);
    }

    #[test]
    fn test_crossing_word_only_reports_its_new_cells() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        game.add_word("ab", 0, Direction::Horizontal).unwrap();
        // "ab" down column 0 shares the 'a' at (0, 0)
        let filled = game.add_word("ab", 0, Direction::Vertical).unwrap();
        assert_eq!(filled, vec![1]);
        assert_eq!(game.grid().to_string(), "ab\nb_");
    }

    #[test]
    fn test_collision_leaves_grid_untouched() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        game.add_word("ab", 0, Direction::Horizontal).unwrap();
        let err = game.add_word("ba", 0, Direction::Vertical).unwrap_err();
        assert_eq!(err, GameError::Collision { row: 0, col: 0 });
        assert_eq!(game.grid().to_string(), "ab\n__");
        assert_eq!(game.remaining_slots(1, Direction::Horizontal), 2);
    }

    #[test]
    fn test_unknown_word_and_bad_index_rejected() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        assert_eq!(
            game.add_word("zz", 0, Direction::Horizontal).unwrap_err(),
            GameError::UnknownWord("zz".to_string())
        );
        assert_eq!(
            game.add_word("ab", 5, Direction::Horizontal).unwrap_err(),
            GameError::OutOfBounds { index: 5, size: 2 }
        );
    }

    #[test]
    fn test_remove_word_restores_state() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        game.add_word("ab", 0, Direction::Horizontal).unwrap();
        let filled = game.add_word("ab", 0, Direction::Vertical).unwrap();
        game.remove_word(&filled, 0, Direction::Vertical).unwrap();
        assert_eq!(game.grid().to_string(), "ab\n__");
        assert_eq!(game.remaining_slots(1, Direction::Horizontal), 2);
    }

    #[test]
    fn test_terminal_when_every_line_is_full() {
        let mut game = Game::new(&dict(&["ab", "ba"])).unwrap();
        assert!(!game.terminal());
        game.add_word("ab", 0, Direction::Horizontal).unwrap();
        game.add_word("ba", 1, Direction::Horizontal).unwrap();
        assert!(game.terminal());
    }

    #[test]
    fn test_completions_on_empty_grid_offer_every_line() {
        let mut game = Game::new(&dict(&["aa"])).unwrap();
        let completions = game.completions();
        // one candidate per row and per column
        assert_eq!(completions.len(), 4);
        assert!(completions.iter().all(|c| c.word == "aa"));
        // probing left the grid untouched
        assert!(game.grid().is_all_empty());
    }

    #[test]
    fn test_completions_respect_crossing_lines() {
        // "cd" across row 0 would force columns to start 'c' and 'd',
        // which no word does, so it must be filtered out
        let mut game = Game::new(&dict(&["ab", "ba", "cd"])).unwrap();
        let completions = game.completions();
        assert!(completions
            .iter()
            .all(|c| c.word != "cd"));
        assert!(completions
            .iter()
            .any(|c| c.word == "ab" && c.direction == Direction::Horizontal));
    }
}
