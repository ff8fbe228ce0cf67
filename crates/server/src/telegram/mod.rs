//! Telegram integration for the bot and the mini-app.
//!
//! This module provides:
//! - [`InitDataVerifier`] for authenticating mini-app requests
//! - [`TelegramClient`] for sending bot replies
//! - Bot API types for webhook updates and outgoing messages
//!
//! # Flow
//!
//! 1. The mini-app receives a signed `initData` string from Telegram
//! 2. It posts that string with every favorites request
//! 3. The server verifies the signature with the bot token before reading
//!    any field, then uses the embedded user ID

mod client;
mod error;
mod init_data;
mod types;

pub use client::TelegramClient;
pub use error::{InitDataError, TelegramError};
pub use init_data::{AuthenticatedUser, InitDataVerifier};
pub use types::{
    ApiResponse, Chat, InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions, Message,
    SendMessage, SentMessage, Update, User, WebAppInfo,
};
