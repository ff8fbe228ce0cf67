//! Integration test harness for the TV Guide server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tvguide-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `webapp_favorites` - mini-app favorites API
//! - `shows_api` - catalog pass-through routes
//! - `telegram_webhook` - bot webhook
//!
//! [`TestApp`] builds the real router around a [`FakeCatalog`] and a
//! [`RecordingSender`], with the favorites file in a temporary directory.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use tvguide_core::ShowId;
use tvguide_server::{
    config::{DEFAULT_TVMAZE_BASE_URL, ServerConfig, TelegramConfig, TvMazeConfig},
    services::MessageSender,
    state::AppState,
    telegram::{InitDataVerifier, SendMessage, TelegramError},
    tvmaze::{ScheduleItem, SearchResult, Show, ShowCatalog, TvMazeError},
};
use url::Url;

/// Bot token shared by the server under test and [`TestApp::init_data`].
pub const BOT_TOKEN: &str = "7312095864:AAGk2Vq9xRbT1mZcWp4LsYd8NhJf3Ue6OiQ";

/// Public URL configured for the server under test.
pub const PUBLIC_URL: &str = "https://tv.example.com";

/// Catalog fixture: shows 1, 2 and 3.
pub fn fixture_show(id: i64) -> Show {
    let name = match id {
        1 => "Breaking Bad",
        2 => "Better Call Saul",
        3 => "The Wire",
        _ => "Unknown",
    };
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "genres": ["Drama"],
        "summary": format!("<p>{name} summary.</p>")
    }))
    .unwrap()
}

/// In-memory catalog that counts calls.
#[derive(Default)]
pub struct FakeCatalog {
    shows: HashMap<ShowId, Show>,
    calls: AtomicUsize,
    failing: AtomicBool,
    last_schedule: Mutex<Option<(NaiveDate, String)>>,
}

impl FakeCatalog {
    /// Catalog holding shows 1, 2 and 3.
    #[must_use]
    pub fn with_fixtures() -> Self {
        Self {
            shows: (1..=3).map(|id| (ShowId::new(id), fixture_show(id))).collect(),
            ..Self::default()
        }
    }

    /// Number of catalog calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail as an upstream error.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Date and country of the last schedule request.
    pub fn last_schedule(&self) -> Option<(NaiveDate, String)> {
        self.last_schedule.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<(), TvMazeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TvMazeError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn sorted_shows(&self) -> Vec<Show> {
        let mut shows: Vec<Show> = self.shows.values().cloned().collect();
        shows.sort_by_key(|s| s.id);
        shows
    }
}

#[async_trait]
impl ShowCatalog for FakeCatalog {
    async fn search_shows(&self, query: &str) -> Result<Vec<SearchResult>, TvMazeError> {
        self.enter()?;
        let needle = query.to_lowercase();
        Ok(self
            .sorted_shows()
            .into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .map(|show| SearchResult { score: 1.0, show })
            .collect())
    }

    async fn show_details(&self, id: ShowId) -> Result<Option<Show>, TvMazeError> {
        self.enter()?;
        Ok(self.shows.get(&id).cloned())
    }

    async fn shows_by_page(&self, page: u32) -> Result<Vec<Show>, TvMazeError> {
        self.enter()?;
        Ok(if page == 0 { self.sorted_shows() } else { Vec::new() })
    }

    async fn web_schedule(
        &self,
        date: NaiveDate,
        country: &str,
    ) -> Result<Vec<ScheduleItem>, TvMazeError> {
        self.enter()?;
        *self.last_schedule.lock().unwrap() = Some((date, country.to_string()));

        let item: ScheduleItem = serde_json::from_value(json!({
            "id": 9001,
            "name": "Chapter One",
            "season": 1,
            "number": 1,
            "airdate": date.format("%Y-%m-%d").to_string(),
            "_embedded": { "show": serde_json::to_value(fixture_show(3)).unwrap() }
        }))
        .unwrap();
        Ok(vec![item])
    }

    async fn show_with_episodes_and_cast(&self, id: ShowId) -> Result<Option<Show>, TvMazeError> {
        self.enter()?;
        Ok(self.shows.get(&id).cloned().map(|mut show| {
            show.embedded = Some(
                serde_json::from_value(json!({
                    "episodes": [{ "id": 100, "name": "Pilot", "season": 1, "number": 1 }],
                    "cast": []
                }))
                .unwrap(),
            );
            show
        }))
    }
}

/// Sender that records bot replies instead of calling Telegram.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SendMessage>>,
    fail_next: AtomicBool,
}

impl RecordingSender {
    /// Make the next send fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<SendMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: SendMessage) -> Result<(), TelegramError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TelegramError::Api("Bad Request: chat not found".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Options for [`TestApp`].
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub bot_token: bool,
    pub webhook_secret: Option<&'static str>,
    pub public_url: bool,
    pub recording_sender: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            bot_token: true,
            webhook_secret: None,
            public_url: true,
            recording_sender: true,
        }
    }
}

/// The server router with fakes and a temporary favorites file.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub catalog: Arc<FakeCatalog>,
    pub sender: Arc<RecordingSender>,
    verifier: InitDataVerifier,
    _dir: TempDir,
}

impl TestApp {
    /// Fully configured app.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(TestOptions::default())
    }

    /// App configured from `options`.
    #[must_use]
    pub fn with_options(options: TestOptions) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let config = ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            public_url: options.public_url.then(|| PUBLIC_URL.to_string()),
            favorites_path: dir.path().join("favorites.json"),
            telegram: TelegramConfig {
                bot_token: options.bot_token.then(|| SecretString::from(BOT_TOKEN)),
                webhook_secret: options.webhook_secret.map(SecretString::from),
                init_data_max_age: None,
            },
            tvmaze: TvMazeConfig {
                base_url: Url::parse(DEFAULT_TVMAZE_BASE_URL).unwrap(),
                timeout: Duration::from_secs(2),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let catalog = Arc::new(FakeCatalog::with_fixtures());
        let sender = Arc::new(RecordingSender::default());
        let sender_override = options
            .recording_sender
            .then(|| Arc::clone(&sender) as Arc<dyn MessageSender>);

        let state = AppState::with_catalog(
            config,
            Arc::clone(&catalog) as Arc<dyn ShowCatalog>,
            sender_override,
        )
        .unwrap();

        Self {
            router: tvguide_server::app(state.clone()),
            state,
            catalog,
            sender,
            verifier: InitDataVerifier::new(SecretString::from(BOT_TOKEN)),
            _dir: dir,
        }
    }

    /// A valid `initData` string for `user_id`.
    #[must_use]
    pub fn init_data(&self, user_id: i64) -> String {
        let user = format!(r#"{{"id":{user_id},"first_name":"Test","username":"tester"}}"#);
        self.verifier
            .sign(&[
                ("auth_date", "1700000000"),
                ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
                ("user", user.as_str()),
            ])
            .unwrap()
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET `path`, returning status and JSON body (`Value::Null` if not JSON).
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        into_json(self.request(request).await).await
    }

    /// POST `body` as JSON to `path`.
    pub async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        into_json(self.request(request).await).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a response into status and parsed JSON body.
pub async fn into_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
