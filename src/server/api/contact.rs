use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::{ContactRequest, ContactResponse};
use crate::server::response::ApiError;
use crate::server::validation::{JsonBody, Validator};

const SERVICE_TYPES: [&str; 4] = ["quick-fix", "full-tune", "extreme", "diagnosis"];

fn validate_contact(req: &ContactRequest) -> Result<(), ApiError> {
    let mut v = Validator::new();

    v.required(
        "name",
        req.name.as_deref(),
        2,
        100,
        "Name must be at least 2 characters",
    );
    match req.email.as_deref() {
        Some(email) => v.email("email", email),
        None => v.error("email", "Invalid email address"),
    }
    v.max_length("discord", req.discord.as_deref(), 100);
    v.max_length("phone", req.phone.as_deref(), 20);
    v.one_of("service_type", req.service_type.as_deref(), &SERVICE_TYPES);
    v.required(
        "system_info",
        req.system_info.as_deref(),
        10,
        2000,
        "Please provide more system details",
    );
    v.required(
        "issues",
        req.issues.as_deref(),
        10,
        2000,
        "Please describe your issues",
    );
    v.max_length("budget", req.budget.as_deref(), 100);

    v.finish()
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<ContactRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(
        &headers,
        "contact-form",
        state.config.rate_limits.contact_form,
    )?;

    let JsonBody(req) = body?;
    validate_contact(&req)?;

    let reference = format!("FPSOS-{}", chrono::Utc::now().timestamp_millis());

    tracing::info!(
        reference = %reference,
        name = req.name.as_deref().unwrap_or_default(),
        service_type = req.service_type.as_deref().unwrap_or_default(),
        "Contact request received"
    );

    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    let fields = [
        ("Name", field(&req.name)),
        ("Email", field(&req.email)),
        ("Discord", field(&req.discord)),
        ("Phone", field(&req.phone)),
        ("Service", field(&req.service_type)),
        ("Budget", field(&req.budget)),
        ("System Info", field(&req.system_info)),
        ("Issues", field(&req.issues)),
    ];
    let fields: Vec<(&str, &str)> = fields
        .iter()
        .map(|(label, value)| (*label, value.as_str()))
        .collect();
    state
        .mailer
        .send_in_background(state.mailer.contact_alert(&reference, &fields));

    Ok(Json(ContactResponse {
        success: true,
        message: "Booking request received. We will contact you within 24 hours.",
        id: reference,
    }))
}
