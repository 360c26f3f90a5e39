//! Shared fixtures for in-crate tests: a throw-away SQLite database, an
//! `AppState` with a pinned clock and a notifier that records what it sends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{Config, DatabaseConfig};
use crate::db::models::{DayConfig, Frequency, RuleDraft};
use crate::error::{AppError, AppResult};
use crate::services::auth::{AdminClaims, ADMIN_ROLE};
use crate::services::clock::FixedClock;
use crate::services::init;
use crate::services::notifications::{EmailMessage, Notifier};
use crate::services::schedule::ScheduleService;
use crate::AppState;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// Notifier that keeps every message and can be switched to failing.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Notifier("relay down".to_string()));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Fresh file-backed database with migrations applied.
///
/// A file (not `:memory:`) so that every pool connection sees the same data
/// and concurrent writers contend on a real lock.
pub async fn test_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!("booking-engine-test-{}.db", Uuid::new_v4()));
    let config = DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 8,
        busy_timeout_ms: 10_000,
        acquire_timeout_seconds: 10,
    };
    init::init_db(&config).await.unwrap()
}

pub async fn test_state(today: NaiveDate) -> (Arc<AppState>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = Config::default();
    config.jwt.secret = TEST_JWT_SECRET.to_string();

    let state = Arc::new(AppState {
        db: test_pool().await,
        config,
        clock: Arc::new(FixedClock(today)),
        notifier: notifier.clone(),
    });
    (state, notifier)
}

/// Weekly Monday rule at 10:00 for 50 minutes, starting 2026-03-02.
pub async fn seed_monday_rule(pool: &SqlitePool) -> String {
    let draft = RuleDraft {
        label: Some("Montag".to_string()),
        time: "10:00".to_string(),
        duration_minutes: Some(50),
        days: vec![DayConfig {
            day_of_week: 1,
            frequency: Frequency::Weekly,
        }],
        start_date: "2026-03-02".to_string(),
        end_date: None,
    };
    ScheduleService::create_rule(pool, &draft).await.unwrap()
}

pub fn admin_token(state: &AppState) -> String {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: "admin".to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: Some(now.timestamp() as usize),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
    )
    .unwrap()
}

/// The application router without the rate limiter.
pub fn test_app(state: Arc<AppState>) -> Router {
    crate::routes::api_router(crate::routes::bookings::router()).with_state(state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: &serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Drive one request through the router and decode the JSON response body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
