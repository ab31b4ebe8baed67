mod auth;
mod availability;
mod bookings;
mod bot;
mod contact;
mod leaderboard;
mod news;
mod suggest;
mod webhooks;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session routes
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        .route("/admin/login", post(auth::admin_login))
        .route(
            "/admin/seed-availability",
            post(availability::seed_availability),
        )
        // Availability routes
        .route(
            "/availability",
            get(availability::list_availability)
                .post(availability::update_availability)
                .delete(availability::delete_availability),
        )
        // Booking routes
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/{id}",
            get(bookings::get_booking)
                .patch(bookings::update_booking)
                .delete(bookings::cancel_booking),
        )
        // Public utility routes
        .route(
            "/leaderboard",
            get(leaderboard::top_scores).post(leaderboard::submit_score),
        )
        .route("/contact", post(contact::submit_contact))
        .route("/support/ticket", post(bot::create_ticket))
        .route("/bot/control", post(bot::control))
        .route("/news", get(news::latest_news))
        .route("/ai/suggest", post(suggest::suggest_slot))
        // Payment provider callbacks
        .route("/webhooks/paypal", post(webhooks::paypal_webhook))
}
