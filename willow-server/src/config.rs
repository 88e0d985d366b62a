//! Server configuration
//!
//! Loaded once from the environment (after `.env`) and handed to the
//! components that need it. Nothing reads `std::env` after startup.

use http::HeaderValue;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CORS_ORIGIN: &str = "https://raz-ar.github.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set in {environment} environment")]
    Missing { name: &'static str, environment: String },
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("{0}")]
    Forbidden(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP listen port
    pub http_port: u16,
    /// PostgreSQL connection URL; in-memory store when unset (development only)
    pub database_url: Option<String>,
    /// Telegram bot token (init data signing secret and Bot API credential)
    pub bot_token: String,
    /// Chat that receives order cards and overdue alerts
    pub admin_channel_id: Option<String>,
    /// Static bearer secret for admin endpoints
    pub admin_bearer: String,
    /// `secret_token` registered with `setWebhook`
    pub webhook_secret: String,
    /// Published CSV export of the menu sheet
    pub sheets_csv_url: String,
    /// Card registration sink (optional)
    pub sheets_cards_webhook_url: Option<String>,
    /// Mini app URL for the `/start` button
    pub webapp_url: String,
    /// The single origin allowed by CORS
    pub cors_origin: HeaderValue,
    pub menu_cache_ttl: Duration,
    pub menu_fetch_timeout: Duration,
    /// In-process overdue sweep period; `None` leaves sweeping to an
    /// external scheduler
    pub sweep_interval: Option<Duration>,
    /// Accept the literal `test` init data as the fixed test user
    pub auth_test_mode: bool,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for Config {
    /// Development defaults
    fn default() -> Self {
        Self {
            environment: "development".into(),
            http_port: 3000,
            database_url: None,
            bot_token: "dev-BOT_TOKEN-not-for-production".into(),
            admin_channel_id: None,
            admin_bearer: "dev-ADMIN_BEARER-not-for-production".into(),
            webhook_secret: "dev-WEBHOOK_SECRET-not-for-production".into(),
            sheets_csv_url: String::new(),
            sheets_cards_webhook_url: None,
            webapp_url: "https://raz-ar.github.io/willow".into(),
            cors_origin: HeaderValue::from_static(DEFAULT_CORS_ORIGIN),
            menu_cache_ttl: Duration::from_secs(60),
            menu_fetch_timeout: Duration::from_secs(10),
            sweep_interval: Some(Duration::from_secs(60)),
            auth_test_mode: false,
            log_json: true,
        }
    }
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &'static str, environment: &str) -> Result<String, ConfigError> {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Ok(v),
            _ if environment != "development" => Err(ConfigError::Missing {
                name,
                environment: environment.to_string(),
            }),
            _ => Ok(format!("dev-{name}-not-for-production")),
        }
    }

    fn optional(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.is_empty())
    }

    fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
        match Self::optional(name) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn flag(name: &'static str) -> Result<bool, ConfigError> {
        match Self::optional(name).as_deref() {
            None | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(other) => Err(ConfigError::Invalid {
                name,
                value: other.to_string(),
            }),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = Self::default();

        let cors_origin = match Self::optional("CORS_ORIGIN") {
            None => defaults.cors_origin,
            Some(value) => HeaderValue::from_str(&value)
                .map_err(|_| ConfigError::Invalid { name: "CORS_ORIGIN", value })?,
        };

        let sweep_secs: u64 = Self::parse_or("SWEEP_INTERVAL_SECS", 60)?;

        let config = Self {
            http_port: Self::parse_or("HTTP_PORT", defaults.http_port)?,
            database_url: Self::optional("DATABASE_URL"),
            bot_token: Self::require_secret("BOT_TOKEN", &environment)?,
            admin_channel_id: Self::optional("ADMIN_CHANNEL_ID"),
            admin_bearer: Self::require_secret("ADMIN_BEARER", &environment)?,
            webhook_secret: Self::require_secret("WEBHOOK_SECRET", &environment)?,
            sheets_csv_url: Self::optional("SHEETS_CSV_URL").unwrap_or_default(),
            sheets_cards_webhook_url: Self::optional("SHEETS_CARDS_WEBHOOK_URL"),
            webapp_url: Self::optional("WEBAPP_URL").unwrap_or(defaults.webapp_url),
            cors_origin,
            menu_cache_ttl: Duration::from_secs(Self::parse_or("MENU_CACHE_TTL_SECS", 60)?),
            menu_fetch_timeout: Duration::from_secs(Self::parse_or("MENU_FETCH_TIMEOUT_SECS", 10)?),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            auth_test_mode: Self::flag("AUTH_TEST_MODE")?,
            log_json: Self::optional("LOG_FORMAT").is_none_or(|f| f == "json"),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_none() && !self.is_development() {
            return Err(ConfigError::Missing {
                name: "DATABASE_URL",
                environment: self.environment.clone(),
            });
        }
        if self.auth_test_mode && self.is_production() {
            return Err(ConfigError::Forbidden(
                "AUTH_TEST_MODE cannot be enabled in production".into(),
            ));
        }
        if self.sheets_csv_url.is_empty() && !self.is_development() {
            return Err(ConfigError::Missing {
                name: "SHEETS_CSV_URL",
                environment: self.environment.clone(),
            });
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
