//! `wire` — the streaming request handler the HTTP layer wraps.
//!
//! Transport-agnostic by design: it validates a board document, binds the
//! query deadline, drives the search engine and writes one JSON record per
//! line to any `io::Write`, flushing after each record. The HTTP layer in
//! front of it only routes, maps [`WireError::status_code`] and serves
//! static assets.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::WireError;
use crate::grid::{Grid, EMPTY};
use crate::search::{Cancellation, Searcher};

/// Hard deadline on a single query.
pub const QUERY_DEADLINE: Duration = Duration::from_secs(2);

/// Upper bound on records emitted per request.
pub const RECORD_LIMIT: usize = 10_000;

/// `POST /solutions` body.
#[derive(Debug, Deserialize)]
pub struct BoardRequest {
    pub board: Vec<Vec<String>>,
}

/// One streamed match.
#[derive(Debug, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub id: usize,
    pub grid: Vec<Vec<String>>,
}

/// `GET /status` document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions_count: Option<usize>,
}

/// Report readiness; `None` means the index is still being built.
#[must_use]
pub fn status(searcher: Option<&Arc<Searcher>>) -> Status {
    match searcher {
        Some(s) => Status {
            ready: true,
            solutions_count: Some(s.solutions_count()),
        },
        None => Status {
            ready: false,
            solutions_count: None,
        },
    }
}

/// Decode a request body.
///
/// # Errors
///
/// `BadRequest` on malformed JSON.
pub fn parse_request(body: &str) -> Result<BoardRequest, WireError> {
    serde_json::from_str(body).map_err(|e| WireError::BadRequest(e.to_string()))
}

/// Validate a board document against the catalog's grid size.
///
/// # Errors
///
/// `BadRequest` on wrong dimensions or a cell that is neither a single
/// lowercase letter nor an empty marker (`"_"` or `""`).
pub fn board_to_grid(board: &[Vec<String>], expected: usize) -> Result<Grid, WireError> {
    let wrong_dims = || WireError::BadRequest(format!("board must be {expected}x{expected}"));
    if board.len() != expected {
        return Err(wrong_dims());
    }
    let mut grid = Grid::new(expected);
    for (i, row) in board.iter().enumerate() {
        if row.len() != expected {
            return Err(wrong_dims());
        }
        for (j, cell) in row.iter().enumerate() {
            match cell.as_str() {
                "" | "_" => {}
                s if s.len() == 1 && s.as_bytes()[0].is_ascii_lowercase() => {
                    grid.set(i, j, s.as_bytes()[0]);
                }
                other => {
                    return Err(WireError::BadRequest(format!(
                        "invalid cell \"{other}\" at ({i}, {j})"
                    )))
                }
            }
        }
    }
    Ok(grid)
}

fn grid_to_board(grid: &Grid) -> Vec<Vec<String>> {
    (0..grid.size())
        .map(|i| {
            (0..grid.size())
                .map(|j| {
                    let cell = grid.get(i, j);
                    if cell == EMPTY {
                        "_".to_string()
                    } else {
                        (cell as char).to_string()
                    }
                })
                .collect()
        })
        .collect()
}

/// Stream every solution extending `query` as newline-framed JSON records,
/// flushed one by one, under the 2-second deadline. The stream is cancelled
/// when the limit is reached, the deadline fires, or the writer fails
/// (client disconnect). Returns the number of records emitted.
///
/// # Errors
///
/// Query failures (missing key, wrong size) before any record is written;
/// writer failures mid-stream.
pub fn stream_solutions<W: Write>(
    searcher: &Arc<Searcher>,
    query: &Grid,
    limit: usize,
    out: &mut W,
) -> Result<usize, WireError> {
    let cancel = Cancellation::with_deadline(QUERY_DEADLINE);
    let matches = searcher.stream_matches(query, &cancel)?;
    let mut emitted = 0;
    for index in matches {
        let record = SolutionRecord {
            id: emitted + 1,
            grid: grid_to_board(&searcher.solution_set().grid(index as usize)),
        };
        if let Err(e) = serde_json::to_writer(&mut *out, &record)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush())
        {
            cancel.cancel();
            return Err(WireError::Io(e));
        }
        emitted += 1;
        if emitted >= limit {
            cancel.cancel();
            break;
        }
    }
    Ok(emitted)
}

/// The single request handler: accept a board document, stream matches.
///
/// # Errors
///
/// `NotReady` while the index is absent, `BadRequest` for a malformed
/// body, plus everything [`stream_solutions`] surfaces.
pub fn handle_request<W: Write>(
    searcher: Option<&Arc<Searcher>>,
    body: &str,
    out: &mut W,
) -> Result<usize, WireError> {
    let searcher = searcher.ok_or(WireError::NotReady)?;
    let request = parse_request(body)?;
    let query = board_to_grid(&request.board, searcher.size())?;
    stream_solutions(searcher, &query, RECORD_LIMIT, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SolutionSet;
    use crate::square::Square;

    /// The S2 corpus: [aa, bb] has exactly the two uniform squares.
    fn s2_searcher() -> Arc<Searcher> {
        Arc::new(Searcher::new(SolutionSet {
            dictionary: vec!["aa".to_string(), "bb".to_string()],
            solutions: vec![
                Square::from_words(vec![0, 0]),
                Square::from_words(vec![1, 1]),
            ],
        }))
    }

    fn records(bytes: &[u8]) -> Vec<SolutionRecord> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_board_streams_catalog_with_incrementing_ids() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let body = r#"{"board": [["_", "_"], ["_", "_"]]}"#;
        let emitted = handle_request(Some(&searcher), body, &mut out).unwrap();
        assert_eq!(emitted, 2);
        let records = records(&out);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        let grids: Vec<_> = records.iter().map(|r| r.grid.clone()).collect();
        assert!(grids.contains(&vec![
            vec!["a".to_string(), "a".to_string()],
            vec!["a".to_string(), "a".to_string()],
        ]));
    }

    #[test]
    fn test_filled_cell_filters_records() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let body = r#"{"board": [["b", "_"], ["_", "_"]]}"#;
        let emitted = handle_request(Some(&searcher), body, &mut out).unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(records(&out)[0].grid[0][0], "b");
    }

    #[test]
    fn test_record_limit_cancels_stream() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let emitted = stream_solutions(&searcher, &Grid::new(2), 1, &mut out).unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(records(&out).len(), 1);
    }

    #[test]
    fn test_not_ready_maps_to_503() {
        let mut out = Vec::new();
        let err = handle_request(None, "{}", &mut out).unwrap_err();
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_malformed_body_maps_to_400() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let err = handle_request(Some(&searcher), "not json", &mut out).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_wrong_dimensions_map_to_400() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let body = r#"{"board": [["_"]]}"#;
        let err = handle_request(Some(&searcher), body, &mut out).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("2x2"));
    }

    #[test]
    fn test_invalid_cell_maps_to_400() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        let body = r#"{"board": [["ab", "_"], ["_", "_"]]}"#;
        let err = handle_request(Some(&searcher), body, &mut out).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_missing_key_maps_to_500() {
        let searcher = s2_searcher();
        let mut out = Vec::new();
        // 'z' is not in the alphabet, so its key has no posting list
        let body = r#"{"board": [["z", "_"], ["_", "_"]]}"#;
        let err = handle_request(Some(&searcher), body, &mut out).unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(out.is_empty());
    }

    #[test]
    fn test_status_document_shape() {
        let searcher = s2_searcher();
        let ready = serde_json::to_string(&status(Some(&searcher))).unwrap();
        assert_eq!(ready, r#"{"ready":true,"solutions_count":2}"#);
        let building = serde_json::to_string(&status(None)).unwrap();
        assert_eq!(building, r#"{"ready":false}"#);
    }

    #[test]
    fn test_empty_string_cell_counts_as_empty() {
        let board = vec![
            vec!["".to_string(), "_".to_string()],
            vec!["a".to_string(), "".to_string()],
        ];
        let grid = board_to_grid(&board, 2).unwrap();
        assert_eq!(grid.get(1, 0), b'a');
        assert_eq!(grid.get(0, 0), EMPTY);
    }
}
