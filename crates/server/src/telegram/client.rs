//! Telegram Bot API client.
//!
//! Provides `sendMessage` and webhook secret-token verification. Constructed
//! once at startup and handed to request handlers through `AppState`.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use super::error::TelegramError;
use super::init_data::constant_time_compare;
use super::types::{ApiResponse, SendMessage, SentMessage};

/// Telegram Bot API base URL.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bound on a single Bot API call, so a stalled reply cannot hold the
/// webhook request open.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    /// HTTP client.
    client: Client,
    /// Bot API base URL without a trailing slash.
    api_base: String,
    /// Bot token, part of every request URL.
    bot_token: SecretString,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header value.
    webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("bot_token", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a client for the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        bot_token: SecretString,
        webhook_secret: Option<SecretString>,
    ) -> Result<Self, TelegramError> {
        Self::with_api_base(
            TELEGRAM_API_BASE,
            bot_token,
            webhook_secret,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Create a client for a Bot API at `api_base` (e.g. a local Bot API
    /// server), with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_base(
        api_base: &str,
        bot_token: SecretString,
        webhook_secret: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelegramError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            webhook_secret,
        })
    }

    /// Send a message.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns `ok: false`.
    #[instrument(skip(self, message), fields(chat_id = %message.chat_id))]
    pub async fn send_message(&self, message: &SendMessage) -> Result<SentMessage, TelegramError> {
        // The token is part of the path; never log this URL.
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );

        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        let result: ApiResponse<SentMessage> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        if !result.ok {
            error!(error = ?result.description, "Telegram API error sending message");
            return Err(TelegramError::Api(
                result
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let sent = result
            .result
            .ok_or_else(|| TelegramError::Response("Missing result".to_string()))?;

        debug!(message_id = sent.message_id, "Message sent to Telegram");

        Ok(sent)
    }

    /// Verify the webhook secret token header.
    ///
    /// Passes when no secret is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::InvalidSecretToken`] if a secret is configured
    /// and the header is missing or differs.
    pub fn verify_webhook_secret(&self, header: Option<&str>) -> Result<(), TelegramError> {
        let Some(expected) = &self.webhook_secret else {
            return Ok(());
        };

        let provided = header.ok_or(TelegramError::InvalidSecretToken)?;
        if !constant_time_compare(expected.expose_secret(), provided) {
            return Err(TelegramError::InvalidSecretToken);
        }

        Ok(())
    }
}
