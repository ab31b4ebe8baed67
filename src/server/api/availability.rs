use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Local;

use crate::auth::RequireSession;
use crate::availability::{self, parse_date, parse_time};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    AvailabilityActionRequest, AvailabilityQuery, SeedResponse, SlotQuery, SuccessResponse,
};
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::JsonBody;

pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ApiError::bad_request("Start and end date required"));
    };

    let start = parse_date(&start).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let end = parse_date(&end).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let slots = availability::available_slots(
        state.store.as_ref(),
        &state.config.business,
        start,
        end,
    )
    .map_err(|e| match e {
        Error::BadRequest(message) => ApiError::bad_request(message),
        e => {
            tracing::error!("Availability fetch error: {e}");
            ApiError::internal("Failed to fetch availability")
        }
    })?;

    Ok(Json(slots))
}

fn check_slot_formats(dates: &[String], times: &[String]) -> Result<(), ApiError> {
    for date in dates {
        parse_date(date).map_err(|_| ApiError::bad_request("Date must be in format: YYYY-MM-DD"))?;
    }
    for time in times {
        parse_time(time).map_err(|_| ApiError::bad_request("Time must be in format: HH:MM"))?;
    }
    Ok(())
}

pub async fn update_availability(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<AvailabilityActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let action = req.action.as_deref().unwrap_or_default();

    match action {
        "add" | "remove" => {
            let date = req
                .date
                .ok_or_else(|| ApiError::bad_request("Date is required"))?;
            check_slot_formats(std::slice::from_ref(&date), &req.times)?;

            for time in &req.times {
                if action == "add" {
                    state
                        .store
                        .add_slot(&date, time)
                        .api_err("Failed to update availability")?;
                } else {
                    state
                        .store
                        .block_slot(&date, time)
                        .api_err("Failed to update availability")?;
                }
            }
            tracing::info!(action, date = %date, count = req.times.len(), "Availability updated");
        }
        "bulk_add" => {
            check_slot_formats(&req.dates, &req.times)?;

            let mut added = 0;
            for date in &req.dates {
                for time in &req.times {
                    if state
                        .store
                        .add_slot(date, time)
                        .api_err("Failed to update availability")?
                    {
                        added += 1;
                    }
                }
            }
            tracing::info!(added, "Bulk availability added");
        }
        _ => {
            return Err(ApiError::bad_request(
                "Action must be one of: add, remove, bulk_add",
            ));
        }
    }

    Ok(Json(SuccessResponse::ok()))
}

pub async fn delete_availability(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(date), Some(time)) = (
        query.date.filter(|d| !d.is_empty()),
        query.time.filter(|t| !t.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Date and time required"));
    };

    state
        .store
        .delete_slot(&date, &time)
        .api_err("Failed to delete slot")?;

    Ok(Json(SuccessResponse::ok()))
}

pub async fn seed_availability(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let added = availability::seed_slots(state.store.as_ref(), Local::now().date_naive())
        .api_err("Failed to seed availability")?;

    tracing::info!(added, "Seeded availability");
    Ok(Json(SeedResponse {
        success: true,
        added,
    }))
}
