//! X Rank scraper
//!
//! Walks the paginated X Ranking leaderboards for every region and mode,
//! pulls the X Battle rotation schedule, and appends both to a SQLite store
//! with conflict-skip semantics so a re-run never duplicates rows.

pub mod model;
pub mod pagination;
pub mod parser;
pub mod scraper;
pub mod store;

pub use model::{Mode, PlayerRecord, RankedPlayer, Region, ScheduleRecord, StagePair};
pub use scraper::XRankScraper;
pub use store::{SqliteStore, StoreCounts, XRankStore};

use splatnet_query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("query failed: {0}")]
    Transport(QueryError),

    #[error("upstream schema changed, {path} is missing")]
    PathNotFound { path: String },

    #[error("malformed timestamp {value:?}, expected YYYY-MM-DDTHH:MM:SSZ")]
    MalformedTimestamp { value: String },

    #[error("malformed player id {value:?}")]
    MalformedId { value: String },

    #[error("unknown mode {name:?}")]
    UnknownMode { name: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl From<QueryError> for ScrapeError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::PathNotFound { path } => ScrapeError::PathNotFound { path },
            // A leaf of the wrong type is the same schema drift as a missing one.
            QueryError::UnexpectedType { path, expected } => ScrapeError::PathNotFound {
                path: format!("{path} ({expected})"),
            },
            other => ScrapeError::Transport(other),
        }
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
