use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{SubmitScoreRequest, SuccessResponse};
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::{JsonBody, Validator};
use crate::types::NewScore;

const LEADERBOARD_SIZE: i64 = 10;
const MAX_SCORE: f64 = 10_000.0;

pub async fn top_scores(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let scores = state
        .store
        .top_scores(LEADERBOARD_SIZE)
        .api_err("Failed to fetch leaderboard")?;

    Ok(Json(scores))
}

fn validate_score(req: &SubmitScoreRequest) -> Result<(), ApiError> {
    let mut v = Validator::new();

    v.required(
        "username",
        req.username.as_deref(),
        2,
        50,
        "Username must be at least 2 characters",
    );
    v.max_length("discord_id", req.discord_id.as_deref(), 50);
    match req.score {
        None => v.error("score", "Required"),
        Some(score) if !score.is_finite() || score <= 0.0 => {
            v.error("score", "Score must be positive")
        }
        Some(score) if score > MAX_SCORE => v.error("score", "Score seems too high"),
        Some(_) => {}
    }
    v.max_length("rank", req.rank.as_deref(), 50);
    v.required(
        "pin",
        req.pin.as_deref(),
        4,
        20,
        "PIN must be at least 4 characters",
    );

    v.finish()
}

pub async fn submit_score(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<SubmitScoreRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(
        &headers,
        "leaderboard-submit",
        state.config.rate_limits.leaderboard_submit,
    )?;

    let JsonBody(req) = body?;
    validate_score(&req)?;

    let score = NewScore {
        username: req.username.unwrap_or_default(),
        discord_id: req.discord_id.filter(|d| !d.is_empty()),
        score: req.score.unwrap_or_default(),
        rank: req.rank.filter(|r| !r.is_empty()),
        pin: req.pin.unwrap_or_default(),
    };

    let id = state
        .store
        .create_score(&score)
        .api_err("Failed to submit score")?;

    tracing::info!(score_id = id, username = %score.username, score = score.score, "Score submitted");
    Ok(Json(SuccessResponse::ok()))
}
