use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingStatus, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub client_name: String,
    pub discord_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub package_id: String,
    pub package_name: String,
    /// Display amount as entered at checkout, e.g. "AED 199".
    pub amount: String,
    /// "YYYY-MM-DD HH:MM"
    pub date_time: String,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    pub add_ons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    pub booking_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a booking is first inserted.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_name: String,
    pub discord_id: String,
    pub email: Option<String>,
    pub package_id: String,
    pub package_name: String,
    pub amount: String,
    pub date_time: String,
    pub add_ons: Vec<String>,
    pub customer_notes: Option<String>,
    pub booking_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingHistory {
    pub id: i64,
    pub booking_id: i64,
    /// Empty for the entry written when the booking is created.
    pub old_status: String,
    pub new_status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithHistory {
    #[serde(flatten)]
    pub booking: Booking,
    pub history: Vec<BookingHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_id: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(skip)]
    pub pin: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScore {
    pub username: String,
    pub discord_id: Option<String>,
    pub score: f64,
    pub rank: Option<String>,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}
