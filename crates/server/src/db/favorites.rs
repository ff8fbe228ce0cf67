//! File-backed favorites store.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};
use tvguide_core::{Favorites, ShowId, UserId};

use super::StoreError;

/// Favorites persisted as one JSON file.
///
/// Every mutation is a load-modify-save cycle under an in-process lock, so
/// concurrent mutations through the same store never lose updates. Writes go
/// to `<file>.tmp` and are renamed over the target, so readers see either the
/// old or the new document and can skip the lock.
///
/// A file that fails to parse reads as empty. The next mutation moves it
/// aside to `<file>.corrupt` before writing.
#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FavoritesStore {
    /// Create a store for the file at `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole favorites document.
    ///
    /// Never fails: a missing file is empty, and a corrupt or unreadable file
    /// is logged and treated as empty. Reads never touch the file; a corrupt
    /// file is moved aside by the next mutation.
    pub async fn load(&self) -> Favorites {
        match self.read().await {
            Document::Parsed(favorites) => favorites,
            Document::Unreadable(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read favorites file");
                Favorites::new()
            }
            Document::Corrupt(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Favorites file is corrupt, reading as empty"
                );
                Favorites::new()
            }
        }
    }

    /// Load for a mutation. Caller must hold `write_lock`.
    ///
    /// A corrupt file is renamed to `<file>.corrupt` before the first write
    /// replaces it. An unreadable file fails the mutation rather than being
    /// overwritten.
    async fn load_locked(&self) -> Result<Favorites, StoreError> {
        match self.read().await {
            Document::Parsed(favorites) => Ok(favorites),
            Document::Unreadable(e) => Err(e.into()),
            Document::Corrupt(e) => {
                let backup = sibling(&self.path, ".corrupt");
                error!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Favorites file is corrupt, starting empty"
                );
                if let Err(rename_err) = tokio::fs::rename(&self.path, &backup).await {
                    warn!(error = %rename_err, "Failed to back up corrupt favorites file");
                }
                Ok(Favorites::new())
            }
        }
    }

    async fn read(&self) -> Document {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Document::Parsed(Favorites::new()),
            Err(e) => return Document::Unreadable(e),
        };

        match serde_json::from_slice::<Favorites>(&bytes) {
            Ok(favorites) => Document::Parsed(favorites),
            Err(e) => Document::Corrupt(e),
        }
    }

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be serialized or the file
    /// cannot be written.
    pub async fn save(&self, favorites: &Favorites) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(favorites)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = sibling(&self.path, ".tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(
            path = %self.path.display(),
            users = favorites.user_count(),
            "Favorites saved"
        );
        Ok(())
    }

    /// Add a show to a user's favorites.
    ///
    /// Returns `true` if the show was newly added. Adding an existing favorite
    /// leaves the file untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the updated document cannot be saved.
    #[instrument(skip(self), fields(user_id = %user, show_id = %show))]
    pub async fn add(&self, user: UserId, show: ShowId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut favorites = self.load_locked().await?;
        if !favorites.add(user, show) {
            return Ok(false);
        }

        self.save(&favorites).await?;
        Ok(true)
    }

    /// Remove a show from a user's favorites.
    ///
    /// Returns `true` if the show was present. A user left with no favorites
    /// is dropped from the document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the updated document cannot be saved.
    #[instrument(skip(self), fields(user_id = %user, show_id = %show))]
    pub async fn remove(&self, user: UserId, show: ShowId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut favorites = self.load_locked().await?;
        if !favorites.remove(user, show) {
            return Ok(false);
        }

        self.save(&favorites).await?;
        Ok(true)
    }

    /// A user's favorite show IDs, ascending. Empty for unknown users.
    pub async fn list(&self, user: UserId) -> BTreeSet<ShowId> {
        self.load().await.list(user)
    }

    /// Whether `show` is among the user's favorites.
    pub async fn contains(&self, user: UserId, show: ShowId) -> bool {
        self.load().await.contains(user, show)
    }

    /// Whether the store can persist: the parent directory exists and the
    /// target, if present, is a regular file.
    pub async fn is_ready(&self) -> bool {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let parent_ok = tokio::fs::metadata(parent)
            .await
            .is_ok_and(|m| m.is_dir());
        if !parent_ok {
            return false;
        }

        match tokio::fs::metadata(&self.path).await {
            Ok(m) => m.is_file(),
            Err(e) => e.kind() == ErrorKind::NotFound,
        }
    }
}

enum Document {
    Parsed(Favorites),
    Unreadable(std::io::Error),
    Corrupt(serde_json::Error),
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FavoritesStore {
        FavoritesStore::new(dir.path().join("favorites.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load().await.is_empty());
        assert!(store.list(UserId::new(42)).await.is_empty());
        assert!(!store.contains(UserId::new(42), ShowId::new(1)).await);
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.add(UserId::new(42), ShowId::new(169)).await.unwrap());
        assert!(store.add(UserId::new(42), ShowId::new(82)).await.unwrap());

        let shows: Vec<_> = store.list(UserId::new(42)).await.into_iter().collect();
        assert_eq!(shows, vec![ShowId::new(82), ShowId::new(169)]);
        assert!(store.contains(UserId::new(42), ShowId::new(169)).await);
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        // Compact JSON; any rewrite would pretty-print it.
        tokio::fs::write(store.path(), br#"{"42":[7]}"#).await.unwrap();

        assert!(!store.add(UserId::new(42), ShowId::new(7)).await.unwrap());
        let after = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(after, r#"{"42":[7]}"#);
        assert_eq!(store.list(UserId::new(42)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(!store.remove(UserId::new(42), ShowId::new(7)).await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_remove_last_show_drops_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(UserId::new(42), ShowId::new(7)).await.unwrap();
        store.add(UserId::new(43), ShowId::new(8)).await.unwrap();
        assert!(store.remove(UserId::new(42), ShowId::new(7)).await.unwrap());

        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(store.path()).await.unwrap()).unwrap();
        assert!(raw.get("42").is_none());
        assert_eq!(raw["43"], serde_json::json!([8]));
    }

    #[tokio::test]
    async fn test_round_trip_through_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("favorites.json");

        let store = FavoritesStore::new(&path);
        store.add(UserId::new(1), ShowId::new(10)).await.unwrap();
        store.add(UserId::new(2), ShowId::new(20)).await.unwrap();
        let expected = store.load().await;

        let reopened = FavoritesStore::new(&path);
        assert_eq!(reopened.load().await, expected);
        assert!(!sibling(&path, ".tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_backed_up_and_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        // Reads leave the file alone.
        assert!(store.load().await.is_empty());
        assert!(store.list(UserId::new(42)).await.is_empty());
        let backup = sibling(store.path(), ".corrupt");
        assert!(!backup.exists());

        // The first write moves it aside.
        assert!(store.add(UserId::new(42), ShowId::new(1)).await.unwrap());
        assert_eq!(tokio::fs::read(&backup).await.unwrap(), b"{not json");
        assert!(store.contains(UserId::new(42), ShowId::new(1)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_reads_during_corrupt_recovery_keep_the_write() {
        for _ in 0..100 {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(store_in(&dir));
            tokio::fs::write(store.path(), b"{not json").await.unwrap();

            let mut readers = Vec::new();
            for _ in 0..4 {
                let store = Arc::clone(&store);
                readers.push(tokio::spawn(async move { store.list(UserId::new(1)).await }));
            }
            let writer = {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add(UserId::new(1), ShowId::new(1)).await })
            };

            assert!(writer.await.unwrap().unwrap());
            for reader in readers {
                reader.await.unwrap();
            }

            assert!(store.contains(UserId::new(1), ShowId::new(1)).await);
            assert_eq!(
                tokio::fs::read(sibling(store.path(), ".corrupt")).await.unwrap(),
                b"{not json"
            );
        }
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        tokio::fs::write(store.path(), br#"{"42":"not a list"}"#).await.unwrap();

        assert!(store.load().await.is_empty());
        assert!(!store.remove(UserId::new(42), ShowId::new(1)).await.unwrap());
        assert!(sibling(store.path(), ".corrupt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_adds_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for user in 1..=5_i64 {
            for show in 1..=10_i64 {
                let store = Arc::clone(&store);
                handles.push(tokio::spawn(async move {
                    store.add(UserId::new(user), ShowId::new(show)).await.unwrap()
                }));
            }
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let favorites = store.load().await;
        assert_eq!(favorites.user_count(), 5);
        assert_eq!(favorites.favorite_count(), 50);
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_mutations() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file cannot be read as one.
        let store = FavoritesStore::new(dir.path());

        assert!(store.load().await.is_empty());
        assert!(matches!(
            store.add(UserId::new(1), ShowId::new(1)).await,
            Err(StoreError::Io(_))
        ));
        assert!(dir.path().is_dir());
    }

    #[tokio::test]
    async fn test_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).is_ready().await);

        let missing_parent = FavoritesStore::new(dir.path().join("nope").join("favorites.json"));
        assert!(!missing_parent.is_ready().await);

        let dir_target = FavoritesStore::new(dir.path());
        assert!(!dir_target.is_ready().await);
    }

    #[test]
    fn test_sibling_appends_suffix() {
        assert_eq!(
            sibling(Path::new("/data/favorites.json"), ".tmp"),
            PathBuf::from("/data/favorites.json.tmp")
        );
    }
}
