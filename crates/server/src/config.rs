//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TVGUIDE_HOST` - Bind address (default: 127.0.0.1)
//! - `TVGUIDE_PORT` - Listen port (default: 3000)
//! - `TELEGRAM_BOT_TOKEN` - Bot token; also the shared secret for mini-app
//!   `initData` signatures. Without it every authenticated request fails with
//!   a configuration error and the bot webhook is disabled.
//! - `TELEGRAM_WEBHOOK_SECRET` - Expected `X-Telegram-Bot-Api-Secret-Token` header
//! - `TELEGRAM_INIT_DATA_MAX_AGE_SECS` - Reject `initData` older than this
//! - `PUBLIC_URL` - Public base URL of the mini-app (falls back to `VERCEL_URL`)
//! - `FAVORITES_PATH` - Favorites JSON file (default: favorites.json)
//! - `TVMAZE_BASE_URL` - Catalog API base (default: <https://api.tvmaze.com>)
//! - `TVMAZE_TIMEOUT_SECS` - Catalog request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Path of the mini-app page, relative to the public URL.
pub const WEB_APP_PATH: &str = "/tvguide";

/// Default TVMaze API base URL.
pub const DEFAULT_TVMAZE_BASE_URL: &str = "https://api.tvmaze.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_bot",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL where the mini-app is served
    pub public_url: Option<String>,
    /// Favorites JSON file
    pub favorites_path: PathBuf,
    /// Telegram bot configuration
    pub telegram: TelegramConfig,
    /// TVMaze catalog configuration
    pub tvmaze: TvMazeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// Telegram bot configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone, Default)]
pub struct TelegramConfig {
    /// Bot token, used both for the Bot API and as the `initData` signing secret
    pub bot_token: Option<SecretString>,
    /// Secret token Telegram echoes back on every webhook call
    pub webhook_secret: Option<SecretString>,
    /// Maximum accepted age of a mini-app `initData` payload
    pub init_data_max_age: Option<Duration>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("init_data_max_age", &self.init_data_max_age)
            .finish()
    }
}

/// TVMaze catalog API configuration.
#[derive(Debug, Clone)]
pub struct TvMazeConfig {
    /// API base URL
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if a
    /// secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TVGUIDE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TVGUIDE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TVGUIDE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TVGUIDE_PORT".to_string(), e.to_string()))?;
        let public_url = get_optional_env("PUBLIC_URL").or_else(|| get_optional_env("VERCEL_URL"));
        let favorites_path = PathBuf::from(get_env_or_default("FAVORITES_PATH", "favorites.json"));

        let telegram = TelegramConfig::from_env()?;
        let tvmaze = TvMazeConfig::from_env()?;

        Ok(Self {
            host,
            port,
            public_url,
            favorites_path,
            telegram,
            tvmaze,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Full URL of the mini-app, if a public URL is configured.
    ///
    /// Bare hosts (as provided by `VERCEL_URL`) are assumed to be HTTPS.
    #[must_use]
    pub fn web_app_url(&self) -> Option<String> {
        let base = self.public_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() {
            return None;
        }

        if base.starts_with("http") {
            Some(format!("{base}{WEB_APP_PATH}"))
        } else {
            Some(format!("https://{base}{WEB_APP_PATH}"))
        }
    }
}

impl TelegramConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bot_token = get_optional_env("TELEGRAM_BOT_TOKEN")
            .map(|token| validated_secret(token, "TELEGRAM_BOT_TOKEN"))
            .transpose()?;
        let webhook_secret = get_optional_env("TELEGRAM_WEBHOOK_SECRET")
            .map(|secret| validated_secret(secret, "TELEGRAM_WEBHOOK_SECRET"))
            .transpose()?;
        let init_data_max_age = get_optional_env("TELEGRAM_INIT_DATA_MAX_AGE_SECS")
            .map(|raw| parse_secs("TELEGRAM_INIT_DATA_MAX_AGE_SECS", &raw))
            .transpose()?;

        Ok(Self {
            bot_token,
            webhook_secret,
            init_data_max_age,
        })
    }
}

impl TvMazeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_env_or_default("TVMAZE_BASE_URL", DEFAULT_TVMAZE_BASE_URL);
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("TVMAZE_BASE_URL".to_string(), e.to_string()))?;
        let timeout = parse_secs(
            "TVMAZE_TIMEOUT_SECS",
            &get_env_or_default("TVMAZE_TIMEOUT_SECS", "10"),
        )?;

        Ok(Self { base_url, timeout })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a positive number of seconds.
fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Bot tokens and webhook secrets are randomly generated
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Validate a secret read from the environment.
fn validated_secret(value: String, key: &str) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config_with_public_url(public_url: Option<&str>) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            public_url: public_url.map(String::from),
            favorites_path: PathBuf::from("favorites.json"),
            telegram: TelegramConfig::default(),
            tvmaze: TvMazeConfig {
                base_url: Url::parse(DEFAULT_TVMAZE_BASE_URL).unwrap(),
                timeout: Duration::from_secs(10),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-bot-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("1111111111:aaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_bot_token_shape() {
        let result = validate_secret_strength(
            "7312095864:AAGk2Vq9xRbT1mZcWp4LsYd8NhJf3Ue6OiQ",
            "TEST_VAR",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("X", "15").unwrap(), Duration::from_secs(15));
        assert!(parse_secs("X", "0").is_err());
        assert!(parse_secs("X", "soon").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = config_with_public_url(None);
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_web_app_url() {
        assert_eq!(config_with_public_url(None).web_app_url(), None);
        assert_eq!(
            config_with_public_url(Some("https://tv.example.org/")).web_app_url(),
            Some("https://tv.example.org/tvguide".to_string())
        );
        assert_eq!(
            config_with_public_url(Some("tvguide.vercel.app")).web_app_url(),
            Some("https://tvguide.vercel.app/tvguide".to_string())
        );
    }

    #[test]
    fn test_telegram_config_debug_redacts_secrets() {
        let config = TelegramConfig {
            bot_token: Some(SecretString::from("super_secret_bot_token")),
            webhook_secret: Some(SecretString::from("super_secret_webhook")),
            init_data_max_age: Some(Duration::from_secs(86_400)),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("86400"));
        assert!(!debug_output.contains("super_secret_bot_token"));
        assert!(!debug_output.contains("super_secret_webhook"));
    }
}
