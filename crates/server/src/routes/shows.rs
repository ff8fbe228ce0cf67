//! Read-only catalog pass-through for the mini-app.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;
use tvguide_core::ShowId;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::tvmaze::{DEFAULT_SCHEDULE_COUNTRY, ScheduleItem, SearchResult, Show};

/// Query parameters for the show index.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
}

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Query parameters for show details.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    /// `full` embeds episodes and cast.
    #[serde(default)]
    pub embed: Option<String>,
}

/// Query parameters for the web schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    #[serde(default)]
    pub date: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    #[serde(default)]
    pub country: Option<String>,
}

/// One page of the show index. Pages past the end are empty.
///
/// # Errors
///
/// 502 if TVMaze fails.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Show>>> {
    Ok(Json(state.catalog().shows_by_page(query.page).await?))
}

/// Search shows by name.
///
/// # Errors
///
/// 400 on an empty query, 502 if TVMaze fails.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::BadRequest("q is required".to_string()));
    }

    Ok(Json(state.catalog().search_shows(q).await?))
}

/// A single show, optionally with episodes and cast.
///
/// # Errors
///
/// 404 if the show does not exist, 502 if TVMaze fails.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ShowId>,
    Query(query): Query<ShowQuery>,
) -> Result<Json<Show>> {
    let show = if query.embed.as_deref() == Some("full") {
        state.catalog().show_with_episodes_and_cast(id).await?
    } else {
        state.catalog().show_details(id).await?
    };

    show.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("show {id}")))
}

/// Web and streaming episodes airing on a day.
///
/// # Errors
///
/// 400 on a malformed date or country, 502 if TVMaze fails.
#[instrument(skip(state))]
pub async fn web_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleItem>>> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("invalid date: {raw}")))?,
        None => Utc::now().date_naive(),
    };

    let country = match query.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            code.to_ascii_uppercase()
        }
        Some(code) => return Err(AppError::BadRequest(format!("invalid country: {code}"))),
        None => DEFAULT_SCHEDULE_COUNTRY.to_string(),
    };

    Ok(Json(state.catalog().web_schedule(date, &country).await?))
}
