use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::auth::RequireSession;
use crate::integrations::BotError;
use crate::server::AppState;
use crate::server::dto::{BotControlRequest, TicketRequest};
use crate::server::response::ApiError;
use crate::server::validation::JsonBody;

fn passthrough(status: reqwest::StatusCode, body: String) -> ApiError {
    ApiError::new(status, format!("Bot Error: {}", status.as_u16())).with_details(body)
}

/// Admin-only relay to the bot's control API.
pub async fn control(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<BotControlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = match req.action.as_deref() {
        Some("trigger_diagnostic") => {
            state
                .bot
                .trigger_diagnostic(req.user_id.as_deref(), req.channel_id.as_deref())
                .await
        }
        Some("status") => state.bot.status().await,
        _ => return Err(ApiError::bad_request("Invalid action")),
    };

    match result {
        Ok(body) => Ok(Json(body)),
        Err(BotError::Status { status, body }) => Err(passthrough(status, body)),
        Err(BotError::Unreachable(_)) => Err(ApiError::unavailable("Bot Unreachable")
            .with_details("Ensure the bot control API is running")),
    }
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<TicketRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(
        &headers,
        "support-ticket",
        state.config.rate_limits.general_api,
    )?;

    let JsonBody(req) = body?;
    let (Some(username), Some(reason)) = (
        req.username.filter(|u| !u.trim().is_empty()),
        req.reason.filter(|r| !r.trim().is_empty()),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    match state.bot.create_ticket(&username, &reason).await {
        Ok(body) => {
            tracing::info!(username = %username, "Support ticket forwarded to bot");
            Ok(Json(body))
        }
        Err(BotError::Status { status, body }) => Err(passthrough(status, body)),
        Err(BotError::Unreachable(_)) => {
            Err(ApiError::unavailable("Bot offline or unreachable"))
        }
    }
}
