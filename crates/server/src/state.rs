//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::db::FavoritesStore;
use crate::services::{BotService, FavoritesService, MessageSender};
use crate::telegram::{InitDataVerifier, TelegramClient, TelegramError};
use crate::tvmaze::{ShowCatalog, TvMazeClient, TvMazeError};

/// Errors building application state.
#[derive(Debug, Error)]
pub enum StateError {
    /// TVMaze client could not be built.
    #[error("TVMaze client: {0}")]
    TvMaze(#[from] TvMazeError),

    /// Telegram client could not be built.
    #[error("Telegram client: {0}")]
    Telegram(#[from] TelegramError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Clients are built once here
/// and borrowed by the per-request services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    web_app_url: Option<String>,
    verifier: Option<InitDataVerifier>,
    telegram: Option<TelegramClient>,
    sender: Option<Arc<dyn MessageSender>>,
    store: FavoritesStore,
    catalog: Arc<dyn ShowCatalog>,
}

impl AppState {
    /// Create application state with the live TVMaze and Telegram clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the TVMaze or Telegram client cannot be built.
    pub fn new(config: ServerConfig) -> Result<Self, StateError> {
        let catalog = Arc::new(TvMazeClient::new(&config.tvmaze)?);
        Self::with_catalog(config, catalog, None).map_err(StateError::from)
    }

    /// Create application state around an existing catalog.
    ///
    /// `sender` replaces the Telegram client for bot replies; when `None`,
    /// replies go through the Bot API if a token is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the Telegram client cannot be built.
    pub fn with_catalog(
        config: ServerConfig,
        catalog: Arc<dyn ShowCatalog>,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Result<Self, TelegramError> {
        let verifier = config.telegram.bot_token.clone().map(|token| {
            let verifier = InitDataVerifier::new(token);
            match config.telegram.init_data_max_age {
                Some(max_age) => verifier.with_max_age(max_age),
                None => verifier,
            }
        });

        let telegram = config
            .telegram
            .bot_token
            .clone()
            .map(|token| TelegramClient::new(token, config.telegram.webhook_secret.clone()))
            .transpose()?;

        let sender = sender.or_else(|| {
            telegram
                .clone()
                .map(|client| Arc::new(client) as Arc<dyn MessageSender>)
        });

        let store = FavoritesStore::new(config.favorites_path.clone());
        let web_app_url = config.web_app_url();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                web_app_url,
                verifier,
                telegram,
                sender,
                store,
                catalog,
            }),
        })
    }

    /// Get the `initData` verifier, if a bot token is configured.
    #[must_use]
    pub fn verifier(&self) -> Option<&InitDataVerifier> {
        self.inner.verifier.as_ref()
    }

    /// Get the Telegram client, if a bot token is configured.
    #[must_use]
    pub fn telegram(&self) -> Option<&TelegramClient> {
        self.inner.telegram.as_ref()
    }

    /// Get the favorites store.
    #[must_use]
    pub fn store(&self) -> &FavoritesStore {
        &self.inner.store
    }

    /// Get the show catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ShowCatalog {
        self.inner.catalog.as_ref()
    }

    /// Full mini-app URL, if a public URL is configured.
    #[must_use]
    pub fn web_app_url(&self) -> Option<&str> {
        self.inner.web_app_url.as_deref()
    }

    /// Favorites service for one request.
    #[must_use]
    pub fn favorites(&self) -> FavoritesService<'_> {
        FavoritesService::new(
            self.verifier(),
            self.store(),
            self.catalog(),
            self.inner.config.tvmaze.timeout,
        )
    }

    /// Bot service for one update, if replies can be sent.
    #[must_use]
    pub fn bot(&self) -> Option<BotService<'_>> {
        let sender = self.inner.sender.as_deref()?;
        Some(BotService::new(self.catalog(), sender, self.web_app_url()))
    }

    /// Sender for bot replies, if one is available.
    #[must_use]
    pub fn sender(&self) -> Option<&dyn MessageSender> {
        self.inner.sender.as_deref()
    }
}
