//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{BotError, FavoritesError};
use crate::telegram::TelegramError;
use crate::tvmaze::TvMazeError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required secret or client is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Favorites operation failed.
    #[error("Favorites error: {0}")]
    Favorites(#[from] FavoritesError),

    /// TVMaze request failed.
    #[error("TVMaze error: {0}")]
    TvMaze(#[from] TvMazeError),

    /// Bot update handling failed.
    #[error("Bot error: {0}")]
    Bot(#[from] BotError),

    /// Webhook request was not from Telegram.
    #[error("Webhook rejected: {0}")]
    Webhook(#[from] TelegramError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::Bot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Favorites(err) => match err {
                FavoritesError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                FavoritesError::Configuration
                | FavoritesError::OperationFailed
                | FavoritesError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::TvMaze(_) => StatusCode::BAD_GATEWAY,
            Self::Webhook(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Configuration(_) => "Configuration error".to_string(),
            Self::Favorites(err) => match err {
                FavoritesError::Configuration => "Configuration error".to_string(),
                FavoritesError::Unauthorized(_) => "Unauthorized".to_string(),
                FavoritesError::OperationFailed => "Failed to update favorite status".to_string(),
                FavoritesError::Store(_) => "Internal server error".to_string(),
            },
            Self::Bot(_) => "Internal server error".to_string(),
            Self::TvMaze(_) => "External service error".to_string(),
            Self::Webhook(_) => "Unauthorized".to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        // Don't expose internal error details to clients
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a verified Telegram user ID.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
