//! TVMaze catalog client.
//!
//! # Architecture
//!
//! - [`ShowCatalog`] is the seam the favorites service and routes depend on,
//!   so tests can swap in an in-memory catalog
//! - [`TvMazeClient`] implements it over the public REST API with `reqwest`
//! - TVMaze is the source of truth; nothing is cached or retried here
//!
//! Not-found is a value (`Ok(None)` or an empty list), never an error.

mod client;
pub mod types;

pub use client::TvMazeClient;
pub use types::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tvguide_core::ShowId;

/// Default country for the web schedule.
pub const DEFAULT_SCHEDULE_COUNTRY: &str = "GB";

/// Errors that can occur when talking to TVMaze.
#[derive(Debug, Error)]
pub enum TvMazeError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 404.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by TVMaze.
    #[error("Rate limited")]
    RateLimited,

    /// Response body was not the expected JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Base URL cannot carry path segments.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Lookup did not finish within the allotted time.
    #[error("Timed out")]
    Timeout,
}

/// Read-only access to the show catalog.
#[async_trait]
pub trait ShowCatalog: Send + Sync {
    /// Ranked search by show name.
    async fn search_shows(&self, query: &str) -> Result<Vec<SearchResult>, TvMazeError>;

    /// A single show, or `None` if the ID does not exist.
    async fn show_details(&self, id: ShowId) -> Result<Option<Show>, TvMazeError>;

    /// One page of the full show index (250 per page, starting at 0).
    ///
    /// An empty list signals the end of the index.
    async fn shows_by_page(&self, page: u32) -> Result<Vec<Show>, TvMazeError>;

    /// Web/streaming episodes airing on `date` in `country` (ISO 3166-1 alpha-2).
    async fn web_schedule(
        &self,
        date: NaiveDate,
        country: &str,
    ) -> Result<Vec<ScheduleItem>, TvMazeError>;

    /// A show with its episodes and cast embedded, or `None` if not found.
    async fn show_with_episodes_and_cast(&self, id: ShowId) -> Result<Option<Show>, TvMazeError>;
}
