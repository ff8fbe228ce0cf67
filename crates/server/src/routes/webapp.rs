//! Mini-app favorites API.
//!
//! Every request carries the raw `initData` string Telegram gave the
//! mini-app. The caller's identity comes only from that payload once its
//! signature checks out.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tvguide_core::ShowId;

use crate::error::{AppError, Result};
use crate::services::FavoritesError;
use crate::state::AppState;
use crate::tvmaze::Show;

/// Body of the listing endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesRequest {
    #[serde(default)]
    pub init_data: Option<String>,
}

/// Body of the toggle, add and remove endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRequest {
    #[serde(default)]
    pub init_data: Option<String>,
    #[serde(default)]
    pub show_id: Option<ShowId>,
}

/// Toggle result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub is_favorite: bool,
}

/// The caller's favorite shows with catalog details.
///
/// # Errors
///
/// 400 without `initData`, 401 if it does not verify, 500 without a bot token.
pub async fn list_shows(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FavoritesRequest>, JsonRejection>,
) -> Result<Json<Vec<Show>>> {
    ensure_configured(&state)?;
    let init_data = required_init_data(payload?.0.init_data)?;

    let shows = state.favorites().list_favorite_shows(&init_data).await?;
    Ok(Json(shows))
}

/// The caller's favorite show IDs.
///
/// # Errors
///
/// 400 without `initData`, 401 if it does not verify, 500 without a bot token.
pub async fn list_ids(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FavoritesRequest>, JsonRejection>,
) -> Result<Json<Vec<ShowId>>> {
    ensure_configured(&state)?;
    let init_data = required_init_data(payload?.0.init_data)?;

    let ids = state.favorites().list_favorite_ids(&init_data).await?;
    Ok(Json(ids))
}

/// Flip a show's favorite status.
///
/// # Errors
///
/// 400 without `initData` or a numeric `showId`, 401 if `initData` does not
/// verify, 500 without a bot token or if the update had no effect.
pub async fn toggle(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShowRequest>, JsonRejection>,
) -> Result<Json<ToggleResponse>> {
    ensure_configured(&state)?;
    let (init_data, show_id) = show_request(payload?.0)?;

    let outcome = state.favorites().toggle_favorite(&init_data, show_id).await?;
    Ok(Json(ToggleResponse {
        success: true,
        is_favorite: outcome.is_favorite,
    }))
}

/// Result of an explicit add or remove.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    pub success: bool,
    /// Whether the call altered the stored favorites.
    pub changed: bool,
    pub is_favorite: bool,
}

/// Mark a show as a favorite. Adding an existing favorite succeeds with
/// `changed: false`.
///
/// # Errors
///
/// 400 without `initData` or a numeric `showId`, 401 if `initData` does not
/// verify, 500 without a bot token or if the file cannot be written.
pub async fn add(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShowRequest>, JsonRejection>,
) -> Result<Json<ChangeResponse>> {
    ensure_configured(&state)?;
    let (init_data, show_id) = show_request(payload?.0)?;

    let changed = state.favorites().add_favorite(&init_data, show_id).await?;
    Ok(Json(ChangeResponse {
        success: true,
        changed,
        is_favorite: true,
    }))
}

/// Unmark a show. Removing a show that is not a favorite succeeds with
/// `changed: false`.
///
/// # Errors
///
/// 400 without `initData` or a numeric `showId`, 401 if `initData` does not
/// verify, 500 without a bot token or if the file cannot be written.
pub async fn remove(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShowRequest>, JsonRejection>,
) -> Result<Json<ChangeResponse>> {
    ensure_configured(&state)?;
    let (init_data, show_id) = show_request(payload?.0)?;

    let changed = state.favorites().remove_favorite(&init_data, show_id).await?;
    Ok(Json(ChangeResponse {
        success: true,
        changed,
        is_favorite: false,
    }))
}

/// A missing bot token is reported before the body is looked at.
fn ensure_configured(state: &AppState) -> Result<()> {
    if state.verifier().is_none() {
        return Err(FavoritesError::Configuration.into());
    }
    Ok(())
}

fn required_init_data(init_data: Option<String>) -> Result<String> {
    init_data
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::BadRequest("initData is required".to_string()))
}

fn show_request(body: ShowRequest) -> Result<(String, ShowId)> {
    let init_data = required_init_data(body.init_data)?;
    let show_id = body
        .show_id
        .ok_or_else(|| AppError::BadRequest("showId (number) is required".to_string()))?;
    Ok((init_data, show_id))
}
