use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::Value;

use crate::integrations::WebhookHeaders;
use crate::integrations::paypal::{
    EVENT_CAPTURE_COMPLETED, EVENT_CAPTURE_REFUNDED, EVENT_ORDER_APPROVED, PaymentDetails,
    parse_amount,
};
use crate::server::AppState;
use crate::server::dto::SuccessResponse;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::JsonBody;
use crate::store::{BookingChanges, HistoryEntry};
use crate::types::{BookingStatus, PaymentStatus};

pub async fn paypal_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<JsonBody<Value>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if state.paypal.webhook_id().is_none() {
        tracing::error!("PAYPAL_WEBHOOK_ID is not configured");
        return Err(ApiError::internal("Webhook not configured"));
    }

    let Some(transmission) = WebhookHeaders::from_headers(&headers) else {
        tracing::warn!("PayPal webhook missing transmission headers");
        return Err(ApiError::unauthorized());
    };
    let JsonBody(event) = body?;

    match state.paypal.verify(&transmission, &event).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(transmission_id = %transmission.transmission_id, "PayPal webhook signature rejected");
            return Err(ApiError::unauthorized());
        }
        Err(e) => {
            tracing::warn!("PayPal webhook verification failed: {e}");
            return Err(ApiError::unauthorized());
        }
    }

    let event_type = event
        .get("event_type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    tracing::info!(event_type, "PayPal webhook received");

    match event_type {
        EVENT_CAPTURE_COMPLETED | EVENT_ORDER_APPROVED => confirm_payment(&state, &event)?,
        EVENT_CAPTURE_REFUNDED => refund_payment(&state, &event)?,
        _ => {}
    }

    Ok(Json(SuccessResponse::with_message("Webhook processed")))
}

fn no_match() -> ApiError {
    ApiError::not_found("No matching booking found")
}

fn confirm_payment(state: &AppState, event: &Value) -> Result<(), ApiError> {
    let details = PaymentDetails::from_event(event).ok_or_else(no_match)?;
    let (Some(email), Some(amount)) = (
        details.payer_email.as_deref(),
        details.amount.as_deref().and_then(parse_amount),
    ) else {
        return Err(no_match());
    };

    let booking = state
        .store
        .find_unpaid_booking_for_payment(email, amount)
        .api_err("Failed to match payment")?
        .ok_or_else(|| {
            tracing::warn!(payment_id = %details.payment_id, "No booking matches PayPal payment");
            no_match()
        })?;

    state
        .store
        .update_booking(
            booking.id,
            &BookingChanges {
                status: Some(BookingStatus::Confirmed),
                payment_status: Some(PaymentStatus::Paid),
                payment_id: Some(details.payment_id.clone()),
                payment_method: Some("paypal".to_string()),
                admin_notes: None,
            },
        )
        .api_err("Failed to record payment")?;

    let note = format!("PayPal payment verified: {}", details.payment_id);
    state
        .store
        .append_history(&HistoryEntry {
            booking_id: booking.id,
            old_status: booking.status.as_str(),
            new_status: BookingStatus::Confirmed,
            changed_by: "system",
            notes: Some(&note),
        })
        .api_err("Failed to record payment history")?;

    tracing::info!(
        booking_id = booking.id,
        payment_id = %details.payment_id,
        "Booking paid and confirmed"
    );

    let updated = state
        .store
        .get_booking(booking.id)
        .api_err("Failed to fetch booking")?
        .or_not_found("Booking not found")?;

    state
        .mailer
        .send_in_background(state.mailer.payment_confirmed(&updated, &details.payment_id));
    state
        .mailer
        .send_in_background(state.mailer.payment_alert(&updated, &details.payment_id));

    Ok(())
}

fn refund_payment(state: &AppState, event: &Value) -> Result<(), ApiError> {
    let Some(details) = PaymentDetails::from_event(event) else {
        return Ok(());
    };

    let bookings = state
        .store
        .list_bookings_by_payment_id(&details.payment_id)
        .api_err("Failed to look up refunded bookings")?;

    for booking in bookings {
        state
            .store
            .update_booking(
                booking.id,
                &BookingChanges {
                    status: Some(BookingStatus::Cancelled),
                    payment_status: Some(PaymentStatus::Refunded),
                    ..Default::default()
                },
            )
            .api_err("Failed to record refund")?;

        state
            .store
            .append_history(&HistoryEntry {
                booking_id: booking.id,
                old_status: booking.status.as_str(),
                new_status: BookingStatus::Cancelled,
                changed_by: "system",
                notes: Some("PayPal payment refunded"),
            })
            .api_err("Failed to record refund history")?;

        tracing::info!(booking_id = booking.id, payment_id = %details.payment_id, "Booking refunded");
    }

    Ok(())
}
