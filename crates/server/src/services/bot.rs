//! Chat command handling for the Telegram bot.
//!
//! # Commands
//!
//! - `/start`, `/guide` - button that opens the mini-app
//! - `/search <name>` - top five matches as plain text
//! - anything else - help text
//!
//! Replies go through [`MessageSender`] so the handler can run against a
//! recording sender in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use tvguide_core::ChatId;

use crate::telegram::{InlineKeyboardMarkup, Message, SendMessage, TelegramClient, TelegramError, Update};
use crate::tvmaze::{Show, ShowCatalog};

/// Search replies are capped at this many shows.
const MAX_SEARCH_RESULTS: usize = 5;

/// Pause between consecutive search result messages.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(200);

/// Generic apology sent when handling an update fails.
pub const APOLOGY_TEXT: &str = "Sorry, an error occurred. Please try again later.";

const OPEN_BUTTON_TEXT: &str = "Open TV Guide 📺";
const OPEN_PROMPT_TEXT: &str = "Click the button below to open the TV Guide:";
const NOT_CONFIGURED_TEXT: &str = "Sorry, the TV Guide app is not configured correctly.";
const SEARCH_USAGE_TEXT: &str = "Usage: /search <show name>";
const SEARCH_FAILED_TEXT: &str = "Sorry, an error occurred during the search.";
const HELP_TEXT: &str = "Unknown command. Use /start or /guide to open the TV Guide app, \
                         or /search <query> to find shows.";

/// Delivers bot replies.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one message.
    async fn send(&self, message: SendMessage) -> Result<(), TelegramError>;
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send(&self, message: SendMessage) -> Result<(), TelegramError> {
        self.send_message(&message).await.map(|_| ())
    }
}

/// Failure while handling an update.
///
/// `chat_id` is set when the failure happened inside a known chat, so the
/// caller can still apologise there.
#[derive(Debug, Error)]
#[error("Failed to handle update: {source}")]
pub struct BotError {
    pub chat_id: Option<ChatId>,
    #[source]
    pub source: TelegramError,
}

impl BotError {
    fn in_chat(chat_id: ChatId) -> impl FnOnce(TelegramError) -> Self {
        move |source| Self {
            chat_id: Some(chat_id),
            source,
        }
    }
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/guide`.
    OpenGuide,
    /// `/search` with the trimmed query, possibly empty.
    Search(String),
    /// Anything else, including messages without text.
    Unknown,
}

impl Command {
    /// Parse message text into a command.
    #[must_use]
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim) else {
            return Self::Unknown;
        };

        let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        // Group chats address commands as `/search@SomeBot`.
        let command = head.split_once('@').map_or(head, |(c, _)| c);

        match command {
            "/start" | "/guide" => Self::OpenGuide,
            "/search" => Self::Search(rest.trim().to_string()),
            _ => Self::Unknown,
        }
    }
}

/// Handles webhook updates.
pub struct BotService<'a> {
    catalog: &'a dyn ShowCatalog,
    sender: &'a dyn MessageSender,
    web_app_url: Option<&'a str>,
    reply_delay: Duration,
}

impl<'a> BotService<'a> {
    /// Create a new bot service.
    #[must_use]
    pub fn new(
        catalog: &'a dyn ShowCatalog,
        sender: &'a dyn MessageSender,
        web_app_url: Option<&'a str>,
    ) -> Self {
        Self {
            catalog,
            sender,
            web_app_url,
            reply_delay: DEFAULT_REPLY_DELAY,
        }
    }

    /// Override the pause between search result messages.
    #[must_use]
    pub const fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Handle one update. Non-message updates are ignored.
    ///
    /// # Errors
    ///
    /// Returns `BotError` if a reply cannot be delivered.
    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: &Update) -> Result<(), BotError> {
        let Some(message) = &update.message else {
            debug!("Ignoring non-message update");
            return Ok(());
        };

        self.handle_message(message).await
    }

    async fn handle_message(&self, message: &Message) -> Result<(), BotError> {
        let chat_id = message.chat.id;
        if message.from.is_none() {
            debug!(chat_id = %chat_id, "Message without sender");
        }

        match Command::parse(message.text.as_deref()) {
            Command::OpenGuide => self.open_guide(chat_id).await,
            Command::Search(query) => self.search(chat_id, &query).await,
            Command::Unknown => self.reply(SendMessage::text(chat_id, HELP_TEXT)).await,
        }
    }

    async fn open_guide(&self, chat_id: ChatId) -> Result<(), BotError> {
        let Some(url) = self.web_app_url else {
            warn!("Web app URL not configured");
            return self.reply(SendMessage::text(chat_id, NOT_CONFIGURED_TEXT)).await;
        };

        let message = SendMessage::text(chat_id, OPEN_PROMPT_TEXT)
            .with_keyboard(InlineKeyboardMarkup::web_app_button(OPEN_BUTTON_TEXT, url));
        self.reply(message).await
    }

    async fn search(&self, chat_id: ChatId, query: &str) -> Result<(), BotError> {
        if query.is_empty() {
            return self.reply(SendMessage::text(chat_id, SEARCH_USAGE_TEXT)).await;
        }

        self.reply(SendMessage::text(chat_id, format!("Searching for \"{query}\"...")))
            .await?;

        let results = match self.catalog.search_shows(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Search failed");
                return self.reply(SendMessage::text(chat_id, SEARCH_FAILED_TEXT)).await;
            }
        };

        if results.is_empty() {
            return self
                .reply(SendMessage::text(
                    chat_id,
                    format!("No shows found matching \"{query}\"."),
                ))
                .await;
        }

        info!(count = results.len(), "Search results found");
        self.reply(SendMessage::text(
            chat_id,
            format!("Found {} shows (top {MAX_SEARCH_RESULTS}):", results.len()),
        ))
        .await?;

        for (i, result) in results.iter().take(MAX_SEARCH_RESULTS).enumerate() {
            if i > 0 && !self.reply_delay.is_zero() {
                tokio::time::sleep(self.reply_delay).await;
            }
            let message = SendMessage::text(chat_id, format_show(&result.show)).without_link_preview();
            self.reply(message).await?;
        }

        Ok(())
    }

    async fn reply(&self, message: SendMessage) -> Result<(), BotError> {
        let chat_id = message.chat_id;
        self.sender.send(message).await.map_err(BotError::in_chat(chat_id))
    }
}

/// Plain-text show summary for chat replies.
#[must_use]
pub fn format_show(show: &Show) -> String {
    let mut lines = vec![format!("{} (ID: {})", show.name, show.id)];

    if !show.genres.is_empty() {
        lines.push(format!("Genres: {}", show.genres.join(", ")));
    }
    if let Some(network) = &show.network {
        lines.push(format!("Network: {}", network.name));
    }
    if let Some(channel) = &show.web_channel {
        lines.push(format!("Web Channel: {}", channel.name));
    }
    if let Some(status) = &show.status {
        lines.push(format!("Status: {status}"));
    }
    if let Some(premiered) = &show.premiered {
        lines.push(format!("Premiered: {premiered}"));
    }
    if let Some(average) = show.rating.as_ref().and_then(|r| r.average) {
        lines.push(format!("Rating: {average}"));
    }
    if let Some(summary) = show.summary.as_deref().map(strip_html)
        && !summary.trim().is_empty()
    {
        lines.push(String::new());
        lines.push(summary.trim().to_string());
    }
    if let Some(site) = &show.official_site {
        lines.push(format!("Official site: {site}"));
    }

    lines.join("\n")
}

/// Remove HTML tags. An unterminated tag runs to the end of the input.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, _) => out.push(c),
            (true, _) => {}
        }
    }

    out
}
