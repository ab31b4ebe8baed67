use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::CookieJar;
use subtle::ConstantTimeEq;

use crate::auth::{
    ADMIN_SESSION_TTL_SECS, RequireSession, SessionSubject, USER_SESSION_TTL_SECS,
    verify_password,
};
use crate::server::AppState;
use crate::server::dto::{AdminLoginRequest, LoginRequest, LoginResponse, SuccessResponse};
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::JsonBody;

fn invalid_credentials() -> ApiError {
    ApiError::new(axum::http::StatusCode::UNAUTHORIZED, "Invalid credentials")
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(invalid_credentials());
    };

    let user = state
        .store
        .get_user_by_email(&email)
        .api_err("Failed to look up user")?
        .ok_or_else(invalid_credentials)?;

    let valid = verify_password(&password, &user.password_hash).unwrap_or_else(|e| {
        tracing::error!(user_id = user.id, "Stored password hash unreadable: {e}");
        false
    });
    if !valid {
        return Err(invalid_credentials());
    }

    let token = state
        .sessions
        .issue(
            SessionSubject {
                sub: user.id.to_string(),
                email: Some(user.email.clone()),
                name: Some(user.name.clone()),
                username: user.username.clone(),
            },
            USER_SESSION_TTL_SECS,
        )
        .api_err("Failed to create session")?;

    tracing::info!(user_id = user.id, "Admin user logged in");

    let jar = jar.add(state.sessions.cookie(token, USER_SESSION_TTL_SECS));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: Some(user.into()),
        }),
    ))
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(req): JsonBody<AdminLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(expected) = state
        .config
        .admin_password
        .as_deref()
        .filter(|p| !p.is_empty())
    else {
        tracing::error!("ADMIN_PASSWORD is not configured");
        return Err(ApiError::internal("Server configuration error"));
    };

    let supplied = req.password.unwrap_or_default();
    if !bool::from(supplied.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Rejected admin password login");
        return Err(invalid_credentials());
    }

    let token = state
        .sessions
        .issue(
            SessionSubject {
                sub: "admin".to_string(),
                ..Default::default()
            },
            ADMIN_SESSION_TTL_SECS,
        )
        .api_err("Failed to create session")?;

    let jar = jar.add(state.sessions.cookie(token, ADMIN_SESSION_TTL_SECS));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: None,
        }),
    ))
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(state.sessions.removal_cookie()),
        Json(SuccessResponse::ok()),
    )
}

pub async fn session(RequireSession(claims): RequireSession) -> impl IntoResponse {
    Json(claims)
}
