//! Local `initData` signing.
//!
//! Telegram only hands out `initData` inside a real mini-app session. This
//! command produces an equivalent payload with the bot token so the favorites
//! API can be called with `curl` during development.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN` - Bot token the server verifies against

use chrono::Utc;
use secrecy::SecretString;
use serde_json::json;
use thiserror::Error;
use tvguide_core::UserId;
use tvguide_server::telegram::{InitDataError, InitDataVerifier};

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SignError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Sign(#[from] InitDataError),
}

/// Sign with the token from `TELEGRAM_BOT_TOKEN`, stamped with the current time.
///
/// # Errors
///
/// Returns an error if the token is not set or signing fails.
pub fn from_env(
    user_id: UserId,
    first_name: Option<&str>,
    username: Option<&str>,
) -> Result<String, SignError> {
    dotenvy::dotenv().ok();

    let token = std::env::var("TELEGRAM_BOT_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
        .ok_or(SignError::MissingEnvVar("TELEGRAM_BOT_TOKEN"))?;

    sign(
        &InitDataVerifier::new(token),
        user_id,
        first_name,
        username,
        Utc::now().timestamp(),
    )
}

/// Build and sign an `initData` payload for `user_id`.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn sign(
    verifier: &InitDataVerifier,
    user_id: UserId,
    first_name: Option<&str>,
    username: Option<&str>,
    auth_date: i64,
) -> Result<String, SignError> {
    let mut user = json!({ "id": user_id });
    if let Some(name) = first_name {
        user["first_name"] = json!(name);
    }
    if let Some(name) = username {
        user["username"] = json!(name);
    }

    let user = user.to_string();
    let auth_date = auth_date.to_string();

    Ok(verifier.sign(&[("auth_date", auth_date.as_str()), ("user", user.as_str())])?)
}
