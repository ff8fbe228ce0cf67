//! Favorites file maintenance.
//!
//! Goes through the same store as the server, so edits made while the server
//! is running follow the same write-then-rename discipline. Edits are not
//! serialized against the server's in-process lock.

use std::path::PathBuf;

use tracing::info;
use tvguide_core::{ShowId, UserId};
use tvguide_server::db::{FavoritesStore, StoreError};

/// Summary of a favorites file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub users: usize,
    pub favorites: usize,
}

/// Open the store at `path`.
pub fn open(path: PathBuf) -> FavoritesStore {
    info!("Using favorites file {}", path.display());
    FavoritesStore::new(path)
}

/// A user's favorites, ascending.
pub async fn list(store: &FavoritesStore, user: UserId) -> Vec<ShowId> {
    store.list(user).await.into_iter().collect()
}

/// Add a favorite. Returns `true` if it was new.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn add(store: &FavoritesStore, user: UserId, show: ShowId) -> Result<bool, StoreError> {
    store.add(user, show).await
}

/// Remove a favorite. Returns `true` if it was present.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn remove(
    store: &FavoritesStore,
    user: UserId,
    show: ShowId,
) -> Result<bool, StoreError> {
    store.remove(user, show).await
}

/// Count users and favorites.
pub async fn stats(store: &FavoritesStore) -> Stats {
    let favorites = store.load().await;
    Stats {
        users: favorites.user_count(),
        favorites: favorites.favorite_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_edit_and_summarize() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path().join("favorites.json"));

        assert!(add(&store, UserId::new(1), ShowId::new(169)).await.unwrap());
        assert!(add(&store, UserId::new(1), ShowId::new(82)).await.unwrap());
        assert!(add(&store, UserId::new(2), ShowId::new(169)).await.unwrap());
        assert!(!add(&store, UserId::new(2), ShowId::new(169)).await.unwrap());

        assert_eq!(
            list(&store, UserId::new(1)).await,
            vec![ShowId::new(82), ShowId::new(169)]
        );
        assert_eq!(stats(&store).await, Stats { users: 2, favorites: 3 });

        assert!(remove(&store, UserId::new(2), ShowId::new(169)).await.unwrap());
        assert_eq!(stats(&store).await, Stats { users: 1, favorites: 2 });
    }

    #[tokio::test]
    async fn test_stats_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path().join("absent.json"));
        assert_eq!(stats(&store).await, Stats { users: 0, favorites: 0 });
    }
}
