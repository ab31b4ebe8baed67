//! Clients for the outbound HTTP services the backend talks to.

pub mod bot;
pub mod mailer;
pub mod news;
pub mod paypal;
pub mod suggest;

use std::time::Duration;

pub use bot::{BotClient, BotError};
pub use mailer::{Email, Mailer};
pub use news::{NewsFeed, NewsItem};
pub use paypal::{PaypalVerifier, WebhookHeaders};
pub use suggest::{SuggestionRequest, Suggester};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client for all integrations.
pub fn http_client() -> crate::error::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("fpsos/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
