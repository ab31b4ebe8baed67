use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::NewsResponse;
use crate::server::response::ApiError;

pub async fn latest_news(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(&headers, "news-fetch", state.config.rate_limits.news_fetch)?;

    Ok(Json(NewsResponse {
        news: state.news.latest().await,
    }))
}
