//! In-memory favorites aggregate.
//!
//! Maps each Telegram user to the set of TVMaze show IDs they starred. The
//! aggregate never holds an empty set: a user's entry is created on the first
//! add and dropped as soon as the last show is removed.
//!
//! Persistence lives in the server crate; this type only owns the set
//! semantics and the JSON shape (`{"<user id>": [<show id>, ...]}`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::id::{ShowId, UserId};

type FavoritesMap = BTreeMap<UserId, BTreeSet<ShowId>>;

/// Favorites for every user, keyed by user ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FavoritesMap")]
pub struct Favorites(FavoritesMap);

impl Favorites {
    /// Create an empty aggregate.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a show to a user's favorites.
    ///
    /// Returns `true` if the show was newly added, `false` if it was already
    /// present.
    pub fn add(&mut self, user_id: UserId, show_id: ShowId) -> bool {
        self.0.entry(user_id).or_default().insert(show_id)
    }

    /// Remove a show from a user's favorites.
    ///
    /// Returns `true` if the show was present. The user's entry is dropped
    /// when its set becomes empty.
    pub fn remove(&mut self, user_id: UserId, show_id: ShowId) -> bool {
        let Some(shows) = self.0.get_mut(&user_id) else {
            return false;
        };

        let removed = shows.remove(&show_id);
        if shows.is_empty() {
            self.0.remove(&user_id);
        }
        removed
    }

    /// Get a user's favorite show IDs (empty if the user has none).
    #[must_use]
    pub fn list(&self, user_id: UserId) -> BTreeSet<ShowId> {
        self.0.get(&user_id).cloned().unwrap_or_default()
    }

    /// Check whether a show is one of a user's favorites.
    #[must_use]
    pub fn contains(&self, user_id: UserId, show_id: ShowId) -> bool {
        self.0
            .get(&user_id)
            .is_some_and(|shows| shows.contains(&show_id))
    }

    /// Number of users with at least one favorite.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of favorites across all users.
    #[must_use]
    pub fn favorite_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Whether no user has any favorites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<FavoritesMap> for Favorites {
    fn from(mut map: FavoritesMap) -> Self {
        map.retain(|_, shows| !shows.is_empty());
        Self(map)
    }
}
