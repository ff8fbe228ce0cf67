//! Authenticated favorites operations for the mini-app.
//!
//! Every operation verifies the caller's `initData` before touching the store
//! or the catalog. The user ID always comes from the verified payload, never
//! from the request body.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{Span, debug, instrument, warn};
use tvguide_core::{ShowId, UserId};

use crate::db::{FavoritesStore, StoreError};
use crate::error::set_sentry_user;
use crate::telegram::{InitDataError, InitDataVerifier};
use crate::tvmaze::{Show, ShowCatalog, TvMazeError};

/// Maximum catalog lookups in flight while expanding a favorites list.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Errors from favorites operations.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// No bot token is configured, so nothing can be verified.
    #[error("Bot token not configured")]
    Configuration,

    /// The `initData` payload failed verification.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] InitDataError),

    /// A toggle mutation reported no change.
    #[error("Favorite update had no effect")]
    OperationFailed,

    /// The favorites file could not be written.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the show is a favorite after the toggle.
    pub is_favorite: bool,
}

/// Favorites operations over borrowed application resources.
pub struct FavoritesService<'a> {
    verifier: Option<&'a InitDataVerifier>,
    store: &'a FavoritesStore,
    catalog: &'a dyn ShowCatalog,
    lookup_timeout: Duration,
}

impl<'a> FavoritesService<'a> {
    /// Create a new favorites service.
    ///
    /// `verifier` is `None` when no bot token is configured; every operation
    /// then fails with [`FavoritesError::Configuration`].
    #[must_use]
    pub fn new(
        verifier: Option<&'a InitDataVerifier>,
        store: &'a FavoritesStore,
        catalog: &'a dyn ShowCatalog,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            store,
            catalog,
            lookup_timeout,
        }
    }

    /// The caller's favorite shows, expanded from the catalog.
    ///
    /// Shows that are missing, fail to load, or time out are left out; the
    /// rest keep stored order.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `Unauthorized` if the caller cannot be
    /// verified.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn list_favorite_shows(&self, init_data: &str) -> Result<Vec<Show>, FavoritesError> {
        let user_id = self.authenticate(init_data)?;
        let ids = self.store.list(user_id).await;
        let requested = ids.len();

        let catalog = self.catalog;
        let lookup_timeout = self.lookup_timeout;

        let shows: Vec<Show> = stream::iter(ids)
            .map(|show_id| async move {
                match lookup(catalog, show_id, lookup_timeout).await {
                    Ok(Some(show)) => Some(show),
                    Ok(None) => {
                        debug!(show_id = %show_id, "Favorite show no longer in catalog");
                        None
                    }
                    Err(e) => {
                        warn!(show_id = %show_id, error = %e, "Failed to fetch favorite show");
                        None
                    }
                }
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .filter_map(std::future::ready)
            .collect()
            .await;

        debug!(requested, returned = shows.len(), "Favorites expanded");
        Ok(shows)
    }

    /// The caller's favorite show IDs, without catalog lookups.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `Unauthorized` if the caller cannot be
    /// verified.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn list_favorite_ids(&self, init_data: &str) -> Result<Vec<ShowId>, FavoritesError> {
        let user_id = self.authenticate(init_data)?;
        Ok(self.store.list(user_id).await.into_iter().collect())
    }

    /// Flip a show's favorite status for the caller.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `Unauthorized` if the caller cannot be
    /// verified, `OperationFailed` if the mutation changed nothing, and
    /// `Store` if the file cannot be written.
    #[instrument(skip(self, init_data), fields(user_id = tracing::field::Empty, show_id = %show_id))]
    pub async fn toggle_favorite(
        &self,
        init_data: &str,
        show_id: ShowId,
    ) -> Result<ToggleOutcome, FavoritesError> {
        let user_id = self.authenticate(init_data)?;

        let was_favorite = self.store.contains(user_id, show_id).await;
        let changed = if was_favorite {
            self.store.remove(user_id, show_id).await?
        } else {
            self.store.add(user_id, show_id).await?
        };

        // A concurrent toggle for the same pair got there first.
        if !changed {
            warn!("Toggle raced with another update");
            return Err(FavoritesError::OperationFailed);
        }

        debug!(is_favorite = !was_favorite, "Favorite toggled");
        Ok(ToggleOutcome {
            is_favorite: !was_favorite,
        })
    }

    /// Add a show for the caller. Returns `true` if it was not already a
    /// favorite.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `Unauthorized` if the caller cannot be
    /// verified, and `Store` if the file cannot be written.
    #[instrument(skip(self, init_data), fields(user_id = tracing::field::Empty, show_id = %show_id))]
    pub async fn add_favorite(&self, init_data: &str, show_id: ShowId) -> Result<bool, FavoritesError> {
        let user_id = self.authenticate(init_data)?;
        Ok(self.store.add(user_id, show_id).await?)
    }

    /// Remove a show for the caller. Returns `true` if it was a favorite.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `Unauthorized` if the caller cannot be
    /// verified, and `Store` if the file cannot be written.
    #[instrument(skip(self, init_data), fields(user_id = tracing::field::Empty, show_id = %show_id))]
    pub async fn remove_favorite(
        &self,
        init_data: &str,
        show_id: ShowId,
    ) -> Result<bool, FavoritesError> {
        let user_id = self.authenticate(init_data)?;
        Ok(self.store.remove(user_id, show_id).await?)
    }

    fn authenticate(&self, init_data: &str) -> Result<UserId, FavoritesError> {
        let verifier = self.verifier.ok_or(FavoritesError::Configuration)?;

        let user = verifier.verify(init_data).map_err(|e| {
            warn!(reason = %e, "Rejected initData");
            FavoritesError::Unauthorized(e)
        })?;

        Span::current().record("user_id", user.id.as_i64());
        set_sentry_user(&user.id);
        Ok(user.id)
    }
}

/// Fetch one show, giving up after `timeout`.
async fn lookup(
    catalog: &dyn ShowCatalog,
    show_id: ShowId,
    timeout: Duration,
) -> Result<Option<Show>, TvMazeError> {
    tokio::time::timeout(timeout, catalog.show_details(show_id))
        .await
        .unwrap_or(Err(TvMazeError::Timeout))
}
