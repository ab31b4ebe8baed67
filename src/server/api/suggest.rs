use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::integrations::SuggestionRequest;
use crate::server::AppState;
use crate::server::dto::SuggestionResponse;
use crate::server::response::ApiError;
use crate::server::validation::JsonBody;

pub async fn suggest_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<SuggestionRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(&headers, "ai-suggest", state.config.rate_limits.general_api)?;

    let JsonBody(req) = body?;
    if req.package_name.trim().is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    Ok(Json(SuggestionResponse {
        suggestion: state.suggester.suggest(&req).await,
    }))
}
