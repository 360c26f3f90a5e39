use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod i18n;
mod middleware;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use config::Config;
use error::AppError;
use services::clock::{Clock, SystemClock};
use services::init;
use services::notifications::Notifier;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "booking_engine=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Render governor rejections in the same envelope as `AppError`.
fn rate_limit_response(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = AppError::RateLimited
                .with_details(serde_json::json!({ "retry_after_seconds": wait_time }))
                .into_response();

            // Include any headers provided by the governor (e.g., X-RateLimit-* if enabled)
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => {
            AppError::BadRequest("Unable to determine client IP for rate limiting".to_string())
                .into_response()
        }
        GovernorError::Other { code, msg, headers } => {
            let body = msg.unwrap_or_else(|| "Rate limiting error".to_string());
            let mut resp = Response::new(Body::from(body));
            *resp.status_mut() =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to bind SIGTERM: {}", e);
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting booking engine");

    let pool = init::init_db(&config.database).await?;
    let notifier = init::build_notifier(&config.notifier)?;

    let app_state = Arc::new(AppState {
        db: pool.clone(),
        config: config.clone(),
        clock: Arc::new(SystemClock),
        notifier,
    });

    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Per-IP limiter for the public booking endpoint.
    let mut bookings_builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    bookings_builder
        .per_second(config.rate_limit.bookings_per_second.into())
        .burst_size(config.rate_limit.bookings_burst)
        .error_handler(rate_limit_response);
    let bookings_gov_conf = Arc::new(
        bookings_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build bookings governor config"))?,
    );

    // Background cleanup for limiter storage
    let bookings_cleaner = {
        let limiter = bookings_gov_conf.limiter().clone();
        let interval = Duration::from_secs(60);
        let flag = thread_shutdown.clone();
        std::thread::spawn(move || {
            // Use smaller sleep granularity to allow quick shutdown.
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..interval.as_secs() {
                    if flag.load(Ordering::SeqCst) {
                        tracing::info!("Bookings rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("bookings rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let bookings_rate_layer = GovernorLayer {
        config: bookings_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|_| AppError::Config(format!("Invalid FRONTEND_URL: {}", config.server.frontend_url)))?;

    let app = routes::api_router(routes::bookings::router().layer(bookings_rate_layer))
        .with_state(app_state.clone())
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                    http::Method::PATCH,
                ])
                .allow_headers([
                    http::header::CONTENT_TYPE,
                    http::header::AUTHORIZATION,
                    http::header::ACCEPT,
                ])
                .allow_credentials(true),
        );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
    }

    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = bookings_cleaner.join() {
        tracing::warn!("Bookings cleanup thread join failed: {:?}", e);
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
