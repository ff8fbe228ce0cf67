//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Favorites storage usable
//!
//! # Mini-app favorites (initData in body)
//! POST /api/webapp/favorites          - Favorite shows with details
//! POST /api/webapp/favorites/ids      - Favorite show IDs
//! POST /api/webapp/favorites/toggle   - Flip one show
//! POST /api/webapp/favorites/add      - Mark one show
//! POST /api/webapp/favorites/remove   - Unmark one show
//!
//! # Catalog
//! GET  /api/shows?page=N              - Show index page
//! GET  /api/shows/search?q=...        - Search by name
//! GET  /api/shows/{id}[?embed=full]   - Show details
//! GET  /api/schedule/web?date&country - Streaming schedule
//!
//! # Bot
//! POST /api/telegram                  - Webhook updates
//! ```

pub mod shows;
pub mod telegram;
pub mod webapp;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Mini-app favorites
        .route("/api/webapp/favorites", post(webapp::list_shows))
        .route("/api/webapp/favorites/ids", post(webapp::list_ids))
        .route("/api/webapp/favorites/toggle", post(webapp::toggle))
        .route("/api/webapp/favorites/add", post(webapp::add))
        .route("/api/webapp/favorites/remove", post(webapp::remove))
        // Catalog
        .route("/api/shows", get(shows::index))
        .route("/api/shows/search", get(shows::search))
        .route("/api/shows/{id}", get(shows::show))
        .route("/api/schedule/web", get(shows::web_schedule))
        // Bot
        .route("/api/telegram", post(telegram::webhook))
}
