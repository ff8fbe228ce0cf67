//! Telegram webhook endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::{error, instrument};

use crate::error::{AppError, Result};
use crate::services::bot::APOLOGY_TEXT;
use crate::state::AppState;
use crate::telegram::{SendMessage, Update};

/// Header Telegram sets to the secret given in `setWebhook`.
const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Handle a webhook update.
///
/// # Errors
///
/// 401 if the secret token header does not match, 400 on an unparseable
/// update, 500 if the bot is not configured or a reply fails.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<Update>, JsonRejection>,
) -> Result<Json<Value>> {
    let Some(bot) = state.bot() else {
        return Err(AppError::Configuration(
            "Telegram bot not configured".to_string(),
        ));
    };

    if let Some(client) = state.telegram() {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        client.verify_webhook_secret(provided)?;
    }

    let Json(update) = payload?;

    if let Err(err) = bot.handle_update(&update).await {
        if let (Some(chat_id), Some(sender)) = (err.chat_id, state.sender())
            && let Err(send_err) = sender.send(SendMessage::text(chat_id, APOLOGY_TEXT)).await
        {
            error!(chat_id = %chat_id, error = %send_err, "Failed to send apology");
        }
        return Err(err.into());
    }

    Ok(Json(json!({ "status": "ok" })))
}
