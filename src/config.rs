use std::env;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub notifier: NotifierConfig,
    pub practice: PracticeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    /// Upper bound for a single HTTP request, including all store calls it makes.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long SQLite waits on a locked database before reporting `SQLITE_BUSY`.
    pub busy_timeout_ms: u64,
    /// How long a handler waits for a free pool connection.
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HS256 secret of the external token issuer.
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds after which one request of the per-IP quota for
    /// `POST /api/bookings` is replenished.
    pub bookings_per_second: u32,
    /// Requests a single IP may make in a burst before being limited.
    pub bookings_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Mail relay endpoint. Without it every email send fails (bookings still succeed).
    pub webhook_url: Option<String>,
    /// HMAC-SHA256 key used to sign relay payloads.
    pub signing_secret: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PracticeConfig {
    pub name: String,
    pub site_url: String,
    /// Language of outgoing emails ("de" or "en").
    pub email_lang: String,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Parse a boolean-ish flag ("1"/"true"/"yes", "0"/"false"/"no").
fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Read an optional variable, treating an empty value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let email_lang = env::var("EMAIL_LANG")
            .map(|l| crate::i18n::normalize_language(&l))
            .ok()
            .filter(|l| crate::i18n::is_supported_language(l))
            .unwrap_or_else(|| crate::i18n::DEFAULT_LANG.to_string());

        // A relay that answers on plain http is only accepted when explicitly allowed.
        let webhook_url = non_empty_var("NOTIFIER_WEBHOOK_URL");
        if let Some(ref raw) = webhook_url {
            let parsed = url::Url::parse(raw)
                .map_err(|_| ConfigError::InvalidValue("NOTIFIER_WEBHOOK_URL".to_string()))?;
            let allow_http = env::var("NOTIFIER_ALLOW_HTTP")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false);
            if parsed.scheme() != "https" && !(allow_http && parsed.scheme() == "http") {
                return Err(ConfigError::InvalidValue("NOTIFIER_WEBHOOK_URL".to_string()));
            }
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/booking.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                busy_timeout_ms: env::var("DATABASE_BUSY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .unwrap_or(5000),
                acquire_timeout_seconds: env::var("DATABASE_ACQUIRE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
            },
            rate_limit: RateLimitConfig {
                bookings_per_second: env::var("RATE_LIMIT_BOOKINGS_PER_SECOND")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
                bookings_burst: env::var("RATE_LIMIT_BOOKINGS_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            notifier: NotifierConfig {
                webhook_url,
                signing_secret: non_empty_var("NOTIFIER_SIGNING_SECRET"),
                timeout_seconds: env::var("NOTIFIER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            practice: PracticeConfig {
                name: env::var("PRACTICE_NAME").unwrap_or_else(|_| "Praxis".to_string()),
                site_url: env::var("SITE_URL")
                    .unwrap_or_else(|_| "https://example.com".to_string()),
                email_lang,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
                request_timeout_seconds: 15,
            },
            database: DatabaseConfig {
                url: "sqlite://data/booking.db".to_string(),
                max_connections: 5,
                busy_timeout_ms: 5000,
                acquire_timeout_seconds: 10,
            },
            jwt: JwtConfig {
                secret: String::new(),
            },
            rate_limit: RateLimitConfig {
                bookings_per_second: 2,
                bookings_burst: 10,
            },
            notifier: NotifierConfig {
                webhook_url: None,
                signing_secret: None,
                timeout_seconds: 10,
            },
            practice: PracticeConfig {
                name: "Praxis".to_string(),
                site_url: "https://example.com".to_string(),
                email_lang: crate::i18n::DEFAULT_LANG.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn default_durations() {
        let config = Config::default();
        assert_eq!(config.server.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.database.busy_timeout(), Duration::from_millis(5000));
        assert_eq!(config.notifier.timeout(), Duration::from_secs(10));
        assert_eq!(config.practice.email_lang, "de");
    }
}
