//! Business logic services for the TV guide.
//!
//! # Services
//!
//! - `favorites` - authenticated favorites operations for the mini-app
//! - `bot` - chat command handling for the Telegram webhook
//!
//! Services borrow their collaborators from `AppState` for the duration of a
//! request and hold no state of their own.

pub mod bot;
pub mod favorites;

pub use bot::{BotError, BotService, MessageSender};
pub use favorites::{FavoritesError, FavoritesService, ToggleOutcome};
