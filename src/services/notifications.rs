//! Outgoing client emails.
//!
//! The service does not speak SMTP itself: messages are handed to a mail relay
//! over HTTPS. Everything that sends mail goes through the [`Notifier`] trait so
//! tests (and deployments without a relay) can swap the transport.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use sha2::Sha256;

use crate::config::PracticeConfig;
use crate::db::models::{format_clock_time, Booking};
use crate::error::{AppError, AppResult};
use crate::i18n;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Which template an email is rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Confirmation,
    Intro,
    Reminder,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Confirmation => "confirmation",
            EmailKind::Intro => "intro",
            EmailKind::Reminder => "reminder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Render one of the client emails for `booking` in the configured language.
pub fn render_email(kind: EmailKind, booking: &Booking, practice: &PracticeConfig) -> EmailMessage {
    let date = booking.date.format("%d.%m.%Y").to_string();
    let time = format_clock_time(&booking.time);
    let duration = booking.duration_minutes.to_string();
    let params = [
        ("name", booking.client_name.as_str()),
        ("date", date.as_str()),
        ("time", time.as_str()),
        ("duration", duration.as_str()),
        ("practice", practice.name.as_str()),
        ("site", practice.site_url.as_str()),
    ];
    let lang = Some(practice.email_lang.as_str());

    EmailMessage {
        to: booking.client_email.clone(),
        subject: i18n::tr(
            lang,
            &format!("email.{}.subject", kind.as_str()),
            Some(&params),
        ),
        body: i18n::tr(lang, &format!("email.{}.body", kind.as_str()), Some(&params)),
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Compute the `sha256=<hex>` signature of a relay payload.
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to create HMAC")))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Posts each message as JSON to an HTTP mail relay.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    signing_secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, signing_secret: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            signing_secret,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let body = serde_json::to_vec(message).map_err(|e| AppError::Internal(e.into()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(ref secret) = self.signing_secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Notifier(format!("relay unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Notifier(format!(
                "relay answered {}: {}",
                status, text
            )));
        }

        tracing::debug!("Email '{}' handed to relay", message.subject);
        Ok(())
    }
}

/// Stand-in when no relay is configured. Every send fails.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _message: &EmailMessage) -> AppResult<()> {
        Err(AppError::Notifier("mail relay not configured".to_string()))
    }
}
