//! Initialization helpers for the application:
//! - database connection + migrations
//! - notifier selection
//!
//! This module centralizes bits that would otherwise live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::{DatabaseConfig, NotifierConfig};
use crate::services::notifications::{DisabledNotifier, Notifier, WebhookNotifier};

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// File path part of a `sqlite://` URL.
fn sqlite_path(db_url: &str) -> &str {
    db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))
        .unwrap_or(db_url)
}

/// Open the SQLite pool and run migrations.
///
/// Creates the parent directory of the database file if needed. Connections use
/// WAL, enforce foreign keys and wait up to `busy_timeout` on a locked database,
/// so concurrent booking inserts queue up instead of failing.
pub async fn init_db(config: &DatabaseConfig) -> Result<SqlitePool> {
    tracing::info!("Connecting to database: {}", redact_db_url(&config.url));

    let db_path = sqlite_path(&config.url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let existed = db_file_path.exists();

    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(connect_options)
        .await?;

    if existed {
        tracing::info!("Connected to database file: {}", db_file_path.display());
    } else {
        tracing::info!("Database file created: {}", db_file_path.display());
    }

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Pick the mail transport. Without a relay URL every email send fails, which
/// bookings tolerate.
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config.webhook_url {
        Some(ref url) => {
            if config.signing_secret.is_none() {
                tracing::warn!("NOTIFIER_SIGNING_SECRET not set; relay requests are unsigned");
            }
            let notifier =
                WebhookNotifier::new(url.clone(), config.signing_secret.clone(), config.timeout())
                    .map_err(|e| anyhow::anyhow!("Failed to build mail relay client: {}", e))?;
            tracing::info!("Emails are delivered via relay {}", redact_db_url(url));
            Ok(Arc::new(notifier))
        }
        None => {
            tracing::warn!("NOTIFIER_WEBHOOK_URL not set; emails will not be sent");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact_db_url("postgres://user:pw@db.example:5432/app"),
            "postgres://db.example:5432/app"
        );
        assert_eq!(redact_db_url("not a url user:pw@host"), "(redacted)host");
    }

    #[test]
    fn strips_sqlite_scheme() {
        assert_eq!(sqlite_path("sqlite://data/booking.db"), "data/booking.db");
        assert_eq!(sqlite_path("sqlite:booking.db"), "booking.db");
        assert_eq!(sqlite_path("booking.db"), "booking.db");
    }
}
