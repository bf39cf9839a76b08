//! `catalog` — durable records linking offline enumeration to online query.
//!
//! Two record kinds share one structured-text format (the shape of the
//! original pipeline's `solutions.textpb`):
//!
//! ```text
//! dictionary {
//!   word: "aaa"
//!   word: "aab"
//! }
//! solutions {
//!   word: 0
//!   word: 1
//! }
//! ```
//!
//! A [`SolutionSet`] holds the dictionary and every solved square as row
//! word-id tuples; a [`Checkpoint`] additionally captures an enumerator's
//! progress and partition bounds. Emission preserves field order so files
//! re-emit byte-identically; parsing accepts fields in any order and `#`
//! comments.

use std::io::{self, Write};
use std::path::Path;

use crate::errors::CatalogError;
use crate::grid::Grid;
use crate::square::Square;

/// The full solution corpus over one dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionSet {
    /// Word list in file order; solution entries index into it.
    pub dictionary: Vec<String>,
    /// Solved squares as row tuples.
    pub solutions: Vec<Square>,
}

impl SolutionSet {
    /// Render solution `index` as a letter grid.
    #[must_use]
    pub fn grid(&self, index: usize) -> Grid {
        Grid::from_square(&self.dictionary, &self.solutions[index])
    }

    /// Parse the structured-text form.
    ///
    /// # Errors
    ///
    /// `Syntax` / `UnknownField` on malformed input, `BadWordId` when a
    /// solution references a word the dictionary does not hold.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut scanner = Scanner::new(text);
        let mut dictionary = Vec::new();
        let mut solutions = Vec::new();
        loop {
            match scanner.next_token()? {
                Token::Eof => break,
                Token::Ident(name) => match name.as_str() {
                    "dictionary" => dictionary = parse_string_block(&mut scanner)?,
                    "solutions" => {
                        solutions.push(Square::from_words(parse_int_block(&mut scanner)?));
                    }
                    other => return Err(CatalogError::UnknownField(other.to_string())),
                },
                tok => return Err(scanner.unexpected(&tok)),
            }
        }
        for (i, square) in solutions.iter().enumerate() {
            for &word in square.words() {
                if word as usize >= dictionary.len() {
                    return Err(CatalogError::BadWordId {
                        solution: i,
                        word,
                        dictionary_len: dictionary.len(),
                    });
                }
            }
        }
        Ok(Self {
            dictionary,
            solutions,
        })
    }

    /// Emit the structured-text form, field order preserved.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn emit<W: Write>(&self, out: &mut W) -> io::Result<()> {
        emit_string_block(out, "dictionary", &self.dictionary)?;
        for square in &self.solutions {
            emit_int_block(out, "solutions", square.words())?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Io` with the path on read failure, otherwise as [`SolutionSet::parse`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        Self::parse(&read_file(path.as_ref())?)
    }

    /// # Errors
    ///
    /// `Io` with the path on write failure.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        write_file(path.as_ref(), |w| self.emit(w))
    }
}

/// A restorable snapshot of one enumerator partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub dictionary: Vec<String>,
    /// Row tuple in progress; entries beyond `current_row` are 0.
    pub current: Square,
    /// Index of the last assigned row, −1 when no row is placed.
    pub current_row: i32,
    /// Inclusive lower bound of the partition's tuple range.
    pub start: Square,
    /// Exclusive upper bound; the top digit may be one past the dictionary.
    pub end: Square,
}

impl Checkpoint {
    /// # Errors
    ///
    /// `Syntax` / `UnknownField` on malformed input.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut scanner = Scanner::new(text);
        let mut dictionary = Vec::new();
        let mut current = None;
        let mut current_row = None;
        let mut start = None;
        let mut end = None;
        loop {
            match scanner.next_token()? {
                Token::Eof => break,
                Token::Ident(name) => match name.as_str() {
                    "dictionary" => dictionary = parse_string_block(&mut scanner)?,
                    "current" => {
                        current = Some(Square::from_words(parse_int_block(&mut scanner)?));
                    }
                    "current_row" => {
                        scanner.expect_colon()?;
                        current_row = Some(scanner.expect_int()? as i32);
                    }
                    "start" => start = Some(Square::from_words(parse_int_block(&mut scanner)?)),
                    "end" => end = Some(Square::from_words(parse_int_block(&mut scanner)?)),
                    other => return Err(CatalogError::UnknownField(other.to_string())),
                },
                tok => return Err(scanner.unexpected(&tok)),
            }
        }
        let size = dictionary.first().map(String::len).unwrap_or(0);
        Ok(Self {
            dictionary,
            current: current.unwrap_or_else(|| Square::zeroed(size)),
            current_row: current_row.unwrap_or(-1),
            start: start.unwrap_or_else(|| Square::zeroed(size)),
            end: end.unwrap_or_else(|| Square::zeroed(size)),
        })
    }

    /// Emit the structured-text form, field order preserved.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn emit<W: Write>(&self, out: &mut W) -> io::Result<()> {
        emit_string_block(out, "dictionary", &self.dictionary)?;
        emit_int_block(out, "current", self.current.words())?;
        writeln!(out, "current_row: {}", self.current_row)?;
        emit_int_block(out, "start", self.start.words())?;
        emit_int_block(out, "end", self.end.words())?;
        Ok(())
    }

    /// # Errors
    ///
    /// `Io` with the path on read failure, otherwise as [`Checkpoint::parse`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        Self::parse(&read_file(path.as_ref())?)
    }

    /// # Errors
    ///
    /// `Io` with the path on write failure.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        write_file(path.as_ref(), |w| self.emit(w))
    }
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write_file<F>(path: &Path, emit: F) -> Result<(), CatalogError>
where
    F: FnOnce(&mut io::BufWriter<std::fs::File>) -> io::Result<()>,
{
    let io_err = |source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = io::BufWriter::new(file);
    emit(&mut writer).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

fn emit_string_block<W: Write>(out: &mut W, name: &str, words: &[String]) -> io::Result<()> {
    writeln!(out, "{name} {{")?;
    for word in words {
        writeln!(out, "  word: \"{word}\"")?;
    }
    writeln!(out, "}}")
}

fn emit_int_block<W: Write>(out: &mut W, name: &str, words: &[u32]) -> io::Result<()> {
    writeln!(out, "{name} {{")?;
    for word in words {
        writeln!(out, "  word: {word}")?;
    }
    writeln!(out, "}}")
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LBrace,
    RBrace,
    Colon,
    Eof,
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn syntax(&self, message: impl Into<String>) -> CatalogError {
        CatalogError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn unexpected(&self, token: &Token) -> CatalogError {
        self.syntax(format!("unexpected token {token:?}"))
    }

    fn next_token(&mut self) -> Result<Token, CatalogError> {
        loop {
            match self.chars.peek() {
                None => return Ok(Token::Eof),
                Some('\n') => {
                    self.line += 1;
                    self.chars.next();
                }
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('#') => {
                    // comment to end of line
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                Some('{') => {
                    self.chars.next();
                    return Ok(Token::LBrace);
                }
                Some('}') => {
                    self.chars.next();
                    return Ok(Token::RBrace);
                }
                Some(':') => {
                    self.chars.next();
                    return Ok(Token::Colon);
                }
                Some('"') => {
                    self.chars.next();
                    let mut s = String::new();
                    loop {
                        match self.chars.next() {
                            None => return Err(self.syntax("unterminated string")),
                            Some('"') => break,
                            Some('\\') => match self.chars.next() {
                                Some(e @ ('"' | '\\')) => s.push(e),
                                _ => return Err(self.syntax("unsupported escape")),
                            },
                            Some(c) => s.push(c),
                        }
                    }
                    return Ok(Token::Str(s));
                }
                Some(&c) if c.is_ascii_digit() || c == '-' => {
                    let mut s = String::new();
                    s.push(c);
                    self.chars.next();
                    while let Some(&d) = self.chars.peek() {
                        if d.is_ascii_digit() {
                            s.push(d);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    let v = s
                        .parse::<i64>()
                        .map_err(|e| self.syntax(format!("bad integer \"{s}\": {e}")))?;
                    return Ok(Token::Int(v));
                }
                Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut s = String::new();
                    while let Some(&d) = self.chars.peek() {
                        if d.is_ascii_alphanumeric() || d == '_' {
                            s.push(d);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    return Ok(Token::Ident(s));
                }
                Some(&c) => return Err(self.syntax(format!("unexpected character '{c}'"))),
            }
        }
    }

    fn expect_colon(&mut self) -> Result<(), CatalogError> {
        match self.next_token()? {
            Token::Colon => Ok(()),
            tok => Err(self.unexpected(&tok)),
        }
    }

    fn expect_int(&mut self) -> Result<i64, CatalogError> {
        match self.next_token()? {
            Token::Int(v) => Ok(v),
            tok => Err(self.unexpected(&tok)),
        }
    }
}

/// Parse `{ word: "…" word: "…" }` after the block's field name.
fn parse_string_block(scanner: &mut Scanner) -> Result<Vec<String>, CatalogError> {
    match scanner.next_token()? {
        Token::LBrace => {}
        tok => return Err(scanner.unexpected(&tok)),
    }
    let mut words = Vec::new();
    loop {
        match scanner.next_token()? {
            Token::RBrace => return Ok(words),
            Token::Ident(name) if name == "word" => {
                scanner.expect_colon()?;
                match scanner.next_token()? {
                    Token::Str(s) => words.push(s),
                    tok => return Err(scanner.unexpected(&tok)),
                }
            }
            Token::Ident(other) => return Err(CatalogError::UnknownField(other)),
            tok => return Err(scanner.unexpected(&tok)),
        }
    }
}

/// Parse `{ word: 0 word: 1 }` after the block's field name.
fn parse_int_block(scanner: &mut Scanner) -> Result<Vec<u32>, CatalogError> {
    match scanner.next_token()? {
        Token::LBrace => {}
        tok => return Err(scanner.unexpected(&tok)),
    }
    let mut words = Vec::new();
    loop {
        match scanner.next_token()? {
            Token::RBrace => return Ok(words),
            Token::Ident(name) if name == "word" => {
                scanner.expect_colon()?;
                let v = scanner.expect_int()?;
                if v < 0 || v > i64::from(u32::MAX) {
                    return Err(scanner.syntax(format!("word id {v} out of range")));
                }
                words.push(v as u32);
            }
            Token::Ident(other) => return Err(CatalogError::UnknownField(other)),
            tok => return Err(scanner.unexpected(&tok)),
        }
    }
}
