//! Telegram Bot API types.
//!
//! Only the subset the bot reads or sends is modelled; unknown fields are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};
use tvguide_core::{ChatId, UserId};

/// Incoming webhook update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat a message belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

/// Message author.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// `sendMessage` request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
}

impl SendMessage {
    /// Plain text message without markup.
    #[must_use]
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_markup: None,
            link_preview_options: None,
        }
    }

    /// Attach an inline keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }

    /// Suppress link previews.
    #[must_use]
    pub fn without_link_preview(mut self) -> Self {
        self.link_preview_options = Some(LinkPreviewOptions { is_disabled: true });
        self
    }
}

/// Link preview settings.
#[derive(Debug, Clone, Serialize)]
pub struct LinkPreviewOptions {
    pub is_disabled: bool,
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// Single button that opens the mini-app.
    #[must_use]
    pub fn web_app_button(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: text.into(),
                web_app: Some(WebAppInfo { url: url.into() }),
            }]],
        }
    }
}

/// Inline keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

/// Mini-app launch target.
#[derive(Debug, Clone, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Sent message as returned by `sendMessage`.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}
