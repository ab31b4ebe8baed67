use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::auth::{AuthError, RequireSession, generate_booking_token};
use crate::availability;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    BookingLookupQuery, CreateBookingRequest, CreateBookingResponse, SuccessResponse,
    UpdateBookingRequest,
};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{JsonBody, Validator};
use crate::store::{BookingChanges, HistoryEntry};
use crate::types::{Booking, BookingStatus, BookingWithHistory, NewBooking, PaymentStatus};

const MAX_CUSTOMER_NOTES_LEN: usize = 1000;
const MAX_ADMIN_NOTES_LEN: usize = 2000;

fn validate_create(req: &CreateBookingRequest) -> Result<(), ApiError> {
    let mut v = Validator::new();

    v.required(
        "client_name",
        req.client_name.as_deref(),
        2,
        100,
        "Name must be at least 2 characters",
    );
    v.required(
        "discord_id",
        req.discord_id.as_deref(),
        2,
        100,
        "Discord ID is required",
    );
    if let Some(email) = req.email.as_deref() {
        v.email("email", email);
    }
    v.required(
        "package_id",
        req.package_id.as_deref(),
        1,
        usize::MAX,
        "Package ID is required",
    );
    v.required(
        "package_name",
        req.package_name.as_deref(),
        1,
        usize::MAX,
        "Package name is required",
    );
    v.required(
        "amount",
        req.amount.as_deref(),
        1,
        usize::MAX,
        "Amount is required",
    );
    v.date_time("date_time", req.date_time.as_deref());
    v.max_length(
        "customer_notes",
        req.customer_notes.as_deref(),
        MAX_CUSTOMER_NOTES_LEN,
    );

    v.finish()
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<CreateBookingRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit(
        &headers,
        "booking-create",
        state.config.rate_limits.booking_create,
    )?;

    let JsonBody(req) = body?;
    validate_create(&req)?;

    let date_time = req.date_time.unwrap_or_default();
    let Some((date, time)) = date_time.split_once(' ') else {
        return Err(ApiError::bad_request("Invalid date/time"));
    };

    availability::check_slot_open(state.store.as_ref(), date, time).map_err(|e| match e {
        Error::Conflict(message) => ApiError::conflict(message),
        e => {
            tracing::error!("Failed to check slot: {e}");
            ApiError::internal("Failed to check slot")
        }
    })?;
    state
        .store
        .add_slot(date, time)
        .api_err("Failed to reserve slot")?;

    let mut new_booking = NewBooking {
        client_name: req.client_name.unwrap_or_default(),
        discord_id: req.discord_id.unwrap_or_default(),
        email: req.email,
        package_id: req.package_id.unwrap_or_default(),
        package_name: req.package_name.unwrap_or_default(),
        amount: req.amount.unwrap_or_default(),
        date_time: date_time.clone(),
        add_ons: req.add_ons.unwrap_or_default(),
        customer_notes: Some(req.customer_notes.unwrap_or_default()),
        booking_token: String::new(),
    };

    const MAX_RETRIES: u32 = 3;
    let mut created = None;
    for _ in 0..MAX_RETRIES {
        new_booking.booking_token = generate_booking_token();
        match state.store.create_booking(&new_booking) {
            Ok(booking) => {
                created = Some(booking);
                break;
            }
            Err(Error::AlreadyExists) => continue,
            Err(e) => {
                tracing::error!("Failed to create booking: {e}");
                return Err(ApiError::internal("Database Error"));
            }
        }
    }
    let booking =
        created.ok_or_else(|| ApiError::internal("Failed to generate unique booking token"))?;

    if let Err(e) = state.store.append_history(&HistoryEntry {
        booking_id: booking.id,
        old_status: "",
        new_status: BookingStatus::Pending,
        changed_by: "customer",
        notes: Some("Booking created"),
    }) {
        tracing::error!(booking_id = booking.id, "Booking history insert failed: {e}");
    }

    tracing::info!(
        booking_id = booking.id,
        package = %booking.package_name,
        date_time = %booking.date_time,
        "Booking created"
    );

    state
        .mailer
        .send_in_background(state.mailer.booking_received(&booking));
    state
        .mailer
        .send_in_background(state.mailer.new_order_alert(&booking));

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            id: booking.id,
            booking_token: booking.booking_token,
        }),
    ))
}

pub async fn list_bookings(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state
        .store
        .list_bookings()
        .api_err("Failed to list bookings")?;

    Ok(Json(bookings))
}

fn with_history(state: &AppState, booking: Booking) -> Result<BookingWithHistory, ApiError> {
    let history = state
        .store
        .list_history(booking.id)
        .api_err("Failed to fetch booking history")?;
    Ok(BookingWithHistory { booking, history })
}

fn load_booking(state: &AppState, id: &str) -> Result<Booking, ApiError> {
    let Ok(id) = id.parse::<i64>() else {
        return Err(ApiError::not_found("Booking not found"));
    };
    state
        .store
        .get_booking(id)
        .api_err("Failed to fetch booking")?
        .or_not_found("Booking not found")
}

/// With `?token=` the customer looks up their own booking; otherwise an
/// admin session is required.
pub async fn get_booking(
    session: Result<RequireSession, AuthError>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<BookingLookupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = match query.token.filter(|t| !t.is_empty()) {
        Some(token) => state
            .store
            .get_booking_by_token(&token)
            .api_err("Failed to fetch booking")?
            .or_not_found("Booking not found")?,
        None => {
            if session.is_err() {
                return Err(ApiError::unauthorized());
            }
            load_booking(&state, &id)?
        }
    };

    Ok(Json(with_history(&state, booking)?))
}

fn validate_update(req: &UpdateBookingRequest) -> Result<(), ApiError> {
    let mut v = Validator::new();

    if let Some(status) = req.status.as_deref() {
        if BookingStatus::parse(status).is_none() {
            let allowed: Vec<&str> = BookingStatus::ALL.iter().map(|s| s.as_str()).collect();
            v.one_of("status", Some(status), &allowed);
        }
    }
    if let Some(payment_status) = req.payment_status.as_deref() {
        if PaymentStatus::parse(payment_status).is_none() {
            let allowed: Vec<&str> = PaymentStatus::ALL.iter().map(|s| s.as_str()).collect();
            v.one_of("payment_status", Some(payment_status), &allowed);
        }
    }
    v.max_length("admin_notes", req.admin_notes.as_deref(), MAX_ADMIN_NOTES_LEN);

    v.finish()
}

pub async fn update_booking(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_update(&req)?;

    let current = load_booking(&state, &id)?;

    let new_status = req
        .status
        .as_deref()
        .and_then(BookingStatus::parse)
        .filter(|s| *s != current.status);

    let changes = BookingChanges {
        status: new_status,
        admin_notes: req.admin_notes.clone(),
        payment_status: req
            .payment_status
            .as_deref()
            .and_then(PaymentStatus::parse)
            .filter(|p| *p != current.payment_status),
        payment_id: req.payment_id.filter(|p| !p.is_empty()),
        payment_method: None,
    };

    if !changes.is_empty() {
        state
            .store
            .update_booking(current.id, &changes)
            .api_err("Failed to update booking")?;
    }

    if let Some(status) = new_status {
        let default_note = format!("Status changed to {status}");
        let note = req
            .admin_notes
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&default_note);
        state
            .store
            .append_history(&HistoryEntry {
                booking_id: current.id,
                old_status: current.status.as_str(),
                new_status: status,
                changed_by: "admin",
                notes: Some(note),
            })
            .api_err("Failed to record status change")?;

        tracing::info!(
            booking_id = current.id,
            from = %current.status,
            to = %status,
            "Booking status changed"
        );
    }

    let updated = state
        .store
        .get_booking(current.id)
        .api_err("Failed to fetch booking")?
        .or_not_found("Booking not found")?;

    if let Some(status) = new_status {
        state
            .mailer
            .send_in_background(state.mailer.status_changed(&updated, status));
    }

    Ok(Json(updated))
}

pub async fn cancel_booking(
    _session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let current = load_booking(&state, &id)?;

    if current.status != BookingStatus::Cancelled {
        state
            .store
            .update_booking(
                current.id,
                &BookingChanges {
                    status: Some(BookingStatus::Cancelled),
                    ..Default::default()
                },
            )
            .api_err("Failed to cancel booking")?;

        state
            .store
            .append_history(&HistoryEntry {
                booking_id: current.id,
                old_status: current.status.as_str(),
                new_status: BookingStatus::Cancelled,
                changed_by: "admin",
                notes: Some("Booking cancelled by admin"),
            })
            .api_err("Failed to record cancellation")?;

        tracing::info!(booking_id = current.id, "Booking cancelled");
    }

    Ok(Json(SuccessResponse::with_message("Booking cancelled")))
}
