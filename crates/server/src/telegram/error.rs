//! Telegram-related errors.

use thiserror::Error;

/// Errors that can occur when calling the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// HTTP request failed.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Telegram response error: {0}")]
    Response(String),

    /// Bot API returned `ok: false`.
    #[error("Telegram API error: {0}")]
    Api(String),

    /// Webhook secret token header missing or wrong.
    #[error("Invalid webhook secret token")]
    InvalidSecretToken,
}

/// Reasons a mini-app `initData` payload is rejected.
///
/// The variants exist for logging and tests only. Callers must collapse all of
/// them into a single "unauthorized" answer so a client cannot learn which
/// check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitDataError {
    /// Payload was empty.
    #[error("initData is empty")]
    Empty,

    /// No `hash` field.
    #[error("initData has no hash")]
    MissingHash,

    /// Computed signature differs from the provided `hash`.
    #[error("initData signature mismatch")]
    SignatureMismatch,

    /// Signature valid but no `user` field.
    #[error("initData has no user")]
    MissingUser,

    /// `user` field is not a valid user object.
    #[error("initData user is invalid: {0}")]
    InvalidUser(String),

    /// Freshness check enabled but `auth_date` is absent or unparseable.
    #[error("initData has no valid auth_date")]
    MissingAuthDate,

    /// `auth_date` is older than the configured maximum age.
    #[error("initData expired")]
    Expired,

    /// HMAC key setup failed.
    #[error("initData key error: {0}")]
    Key(String),
}
