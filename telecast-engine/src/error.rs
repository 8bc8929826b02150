use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading indices or evaluating a query.
///
/// Empty (non-error) results are never represented here: an atom that
/// legitimately matches nothing, or a [`crate::search::SearchContext`]
/// conjunction that contradicts itself, is `None`, not an `Err`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed parameter: {0}")]
    InvalidUsage(String),

    #[error("video {0} not found")]
    VideoNotInDatabase(String),

    #[error("person {0:?} not in database")]
    PersonNotInDatabase(String),

    #[error("tag {0:?} not in database")]
    TagNotInDatabase(String),

    #[error("could not parse transcript query {0:?}")]
    InvalidTranscriptSearch(String),

    #[error("query too expensive: {0}")]
    QueryTooExpensive(String),

    #[error("failed to open index {path}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed index file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("internal invariant violated: {0}")]
    Unreachable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
