use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::api::api_router;
use super::response::ApiError;
use crate::auth::{SessionManager, generate_signing_key};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::integrations::{self, BotClient, Mailer, NewsFeed, PaypalVerifier, Suggester};
use crate::rate_limit::{RateLimitConfig, RateLimiter, client_ip};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: ServerConfig,
    pub sessions: SessionManager,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Mailer,
    pub bot: BotClient,
    pub news: NewsFeed,
    pub suggester: Suggester,
    pub paypal: PaypalVerifier,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Result<Self> {
        let http = integrations::http_client()?;

        let secret = match &config.admin_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "ADMIN_SECRET is not set; using a random session key. \
                     Sessions will not survive a restart."
                );
                generate_signing_key()
            }
        };

        Ok(Self {
            sessions: SessionManager::new(secret.as_bytes(), config.cookie_secure),
            rate_limiter: Arc::new(RateLimiter::new()),
            mailer: Mailer::new(&config.mail, http.clone()),
            bot: BotClient::new(&config.bot_api_url, http.clone()),
            news: NewsFeed::new(&config.news_rss_url, http.clone()),
            suggester: Suggester::new(config.gemini_api_key.clone(), http.clone()),
            paypal: PaypalVerifier::new(&config.paypal, http),
            store,
            config,
        })
    }

    /// Counts the request against `endpoint` for the calling client.
    pub fn check_rate_limit(
        &self,
        headers: &HeaderMap,
        endpoint: &str,
        limit: RateLimitConfig,
    ) -> std::result::Result<(), ApiError> {
        let ip = client_ip(headers);
        match ApiError::rate_limited(self.rate_limiter.check(endpoint, &ip, limit)) {
            Some(err) => {
                tracing::warn!(endpoint, ip = %ip, "Rate limit exceeded");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
