//! Control plane of the Discord bot.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum BotError {
    /// The bot answered with a non-success status.
    #[error("bot returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("bot unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Serialize)]
struct DiagnosticRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TicketRequest<'a> {
    username: &'a str,
    reason: &'a str,
}

#[derive(Debug, Clone)]
pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
}

impl BotClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn trigger_diagnostic(
        &self,
        user_id: Option<&str>,
        channel_id: Option<&str>,
    ) -> Result<Value, BotError> {
        let request = self
            .http
            .post(self.url("/trigger-diagnostic"))
            .json(&DiagnosticRequest {
                user_id,
                channel_id,
            });
        self.execute(request).await
    }

    pub async fn status(&self) -> Result<Value, BotError> {
        self.execute(self.http.get(self.url("/status"))).await
    }

    pub async fn create_ticket(&self, username: &str, reason: &str) -> Result<Value, BotError> {
        let request = self
            .http
            .post(self.url("/create-ticket"))
            .json(&TicketRequest { username, reason });
        self.execute(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, BotError> {
        let response = request.send().await.map_err(|e| {
            warn!("Bot API request failed: {e}");
            BotError::Unreachable(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, "Bot API returned an error");
            return Err(BotError::Status { status, body });
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
