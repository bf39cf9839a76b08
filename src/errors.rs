use std::io;

/// Errors raised while building a [`Dictionary`](crate::dictionary::Dictionary).
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("no valid words provided")]
    NoWords,

    #[error("word lengths should be equal: expected {expected}, got {got} for \"{word}\"")]
    InconsistentWordLengths {
        expected: usize,
        got: usize,
        word: String,
    },

    #[error("word length should be between 1 and 10, got {0}")]
    WordTooLong(usize),

    #[error("invalid character '{invalid_char}' in \"{word}\" (only lowercase a-z allowed)")]
    InvalidChar { invalid_char: char, word: String },
}

/// Errors raised by trie insertion and wildcard search.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("word length should be between 1 and 10, got {0}")]
    LengthOutOfRange(usize),

    #[error("word length should be {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid character '{0}'")]
    InvalidChar(char),
}

/// Errors raised while constructing or partitioning an enumerator.
#[derive(Debug, thiserror::Error)]
pub enum EnumeratorError {
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Trie(#[from] TrieError),

    #[error("cannot partition into {partitions} partitions, space size is {range_size}")]
    RangeTooSmall {
        partitions: usize,
        range_size: String,
    },

    #[error("checkpoint row {row} replays word {word} but column {column} has no viable words")]
    ReplayFailed { row: usize, word: u32, column: usize },

    #[error("checkpoint current_row {current_row} out of range for size {size}")]
    CurrentRowOutOfRange { current_row: i32, size: usize },

    #[error("checkpoint square holds word id {id} but the dictionary has {dictionary_len} words")]
    WordIdOutOfRange { id: u32, dictionary_len: usize },

    #[error("checkpoint square has {got} entries, expected {expected}")]
    SquareSizeMismatch { expected: usize, got: usize },
}

/// Errors raised while reading or writing catalog and checkpoint files.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("parse error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("solution {solution} references word {word}, but the dictionary has {dictionary_len} words")]
    BadWordId {
        solution: usize,
        word: u32,
        dictionary_len: usize,
    },
}

/// Errors raised while parsing a grid from its text form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,

    #[error("grid row {row} has {got} cells, expected {expected}")]
    BadRowLength {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid cell '{0}' (only lowercase a-z or '_' allowed)")]
    InvalidCell(char),
}

/// Errors raised by the query engine.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no indexed solutions for key: {0}")]
    MissingKey(String),

    #[error("query grid is {got}x{got}, the catalog holds {expected}x{expected} squares")]
    SizeMismatch { expected: usize, got: usize },
}

/// Errors raised by the interactive grid editor.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid starting position {index}, game is size {size}")]
    OutOfBounds { index: usize, size: usize },

    #[error("invalid word: \"{0}\"")]
    UnknownWord(String),

    #[error("collision detected at ({row}, {col})")]
    Collision { row: usize, col: usize },
}

/// Errors raised by the streaming request handler.
///
/// Carries the status code an HTTP layer in front of the handler should map
/// the failure to; the handler itself stays transport-agnostic.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("solutions are still being loaded")]
    NotReady,

    #[error("invalid board: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("error writing response: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Status code for the boundary layer to return (400 / 503 / 500).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            WireError::NotReady => 503,
            WireError::BadRequest(_) => 400,
            WireError::Query(_) | WireError::Io(_) => 500,
        }
    }
}

impl From<DictionaryError> for io::Error {
    fn from(e: DictionaryError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e.to_string())
    }
}
