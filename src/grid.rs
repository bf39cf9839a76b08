//! `grid` — the N×N cell matrix shared by the query engine, the editor and
//! the file formats.
//!
//! Cells are bytes: 0 for an empty cell, otherwise a lowercase letter. The
//! text form is N lines of N characters with `_` marking empty cells.

use std::fmt;

use crate::errors::GridError;
use crate::square::Square;

/// Reserved empty-cell value. Alphabet id 0 maps to it and is never
/// assigned to a real letter.
pub const EMPTY: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<u8>,
    size: usize,
}

impl Grid {
    /// An all-empty grid.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![EMPTY; size * size],
            size,
        }
    }

    /// Parse the `_`-text form. The line count fixes N; every line must
    /// hold exactly N cells.
    ///
    /// # Errors
    ///
    /// `Empty` for no lines, `BadRowLength` for a ragged row, `InvalidCell`
    /// for anything outside lowercase a-z and `_`.
    pub fn from_text(text: &str) -> Result<Self, GridError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Err(GridError::Empty);
        }
        let size = lines.len();
        let mut grid = Self::new(size);
        for (i, line) in lines.iter().enumerate() {
            if line.len() != size {
                return Err(GridError::BadRowLength {
                    row: i,
                    expected: size,
                    got: line.len(),
                });
            }
            for (j, c) in line.chars().enumerate() {
                match c {
                    '_' => {}
                    'a'..='z' => grid.set(i, j, c as u8),
                    other => return Err(GridError::InvalidCell(other)),
                }
            }
        }
        Ok(grid)
    }

    /// Render a solved square: row i is the word `square.word(i)` names.
    #[must_use]
    pub fn from_square(words: &[String], square: &Square) -> Self {
        let size = square.len();
        let mut grid = Self::new(size);
        for i in 0..size {
            let row = words[square.word(i) as usize].as_bytes();
            for (j, &b) in row.iter().enumerate() {
                grid.set(i, j, b);
            }
        }
        grid
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: u8) {
        self.cells[row * self.size + col] = cell;
    }

    #[must_use]
    pub fn is_all_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == EMPTY)
    }

    /// Iterate `(row, col, cell)` over filled cells only.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, &c)| {
            (c != EMPTY).then_some((i / self.size, i % self.size, c))
        })
    }

    /// True when every filled cell of `self` matches `candidate` pointwise.
    /// This is the second query stage: the column keys only encode
    /// presence, so intersection alone over-approximates.
    #[must_use]
    pub fn matches(&self, candidate: &Grid) -> bool {
        self.size == candidate.size
            && self
                .filled_cells()
                .all(|(i, j, c)| candidate.get(i, j) == c)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            for j in 0..self.size {
                let c = self.get(i, j);
                if c == EMPTY {
                    write!(f, "_")?;
                } else {
                    write!(f, "{}", c as char)?;
                }
            }
            if i + 1 < self.size {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        let text = "a_c\n___\n_z_";
        let grid = Grid::from_text(text).unwrap();
        assert_eq!(grid.get(0, 0), b'a');
        assert_eq!(grid.get(0, 1), EMPTY);
        assert_eq!(grid.get(2, 1), b'z');
        assert_eq!(grid.to_string(), text);
    }

    #[test]
    fn test_from_text_rejects_ragged_rows() {
        assert_eq!(
            Grid::from_text("ab\na"),
            Err(GridError::BadRowLength {
                row: 1,
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_from_text_rejects_bad_cells() {
        assert_eq!(Grid::from_text("a?\n__"), Err(GridError::InvalidCell('?')));
        assert_eq!(Grid::from_text(""), Err(GridError::Empty));
    }

    #[test]
    fn test_from_square_renders_rows() {
        let words = vec!["ab".to_string(), "ba".to_string()];
        let grid = Grid::from_square(&words, &Square::from_words(vec![1, 0]));
        assert_eq!(grid.to_string(), "ba\nab");
    }

    #[test]
    fn test_matches_is_pointwise_on_filled_cells() {
        let query = Grid::from_text("_b_\n___\n___").unwrap();
        let yes = Grid::from_text("abc\nxyz\nqrs").unwrap();
        let no = Grid::from_text("bac\nxyz\nqrs").unwrap();
        assert!(query.matches(&yes));
        assert!(!query.matches(&no));
        assert!(Grid::new(3).matches(&yes));
    }
}
