//! Persistence for the TV guide.
//!
//! # Storage: `favorites.json`
//!
//! A single JSON document owned exclusively by [`FavoritesStore`]:
//!
//! ```json
//! { "123456789": [169, 82] }
//! ```
//!
//! Keys are Telegram user IDs as strings, values are TVMaze show IDs. Users
//! with no favorites are never written.
//!
//! The catalog itself is not stored; TVMaze is the source of truth.

pub mod favorites;

pub use favorites::FavoritesStore;

use thiserror::Error;

/// Errors from persisting favorites.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing, or renaming the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Favorites could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
