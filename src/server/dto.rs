use serde::{Deserialize, Serialize};

use crate::integrations::NewsItem;
use crate::types::AdminUser;

// Auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<AdminUser> for UserSummary {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            username: user.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

// Bookings

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub add_ons: Option<Vec<String>>,
    #[serde(default)]
    pub customer_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub success: bool,
    pub id: i64,
    pub booking_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingLookupQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

// Availability

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub times: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
    pub added: usize,
}

// Leaderboard

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "discordId")]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

// Contact

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "serviceType")]
    pub service_type: Option<String>,
    #[serde(default, alias = "systemInfo")]
    pub system_info: Option<String>,
    #[serde(default)]
    pub issues: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: String,
}

// Bot

#[derive(Debug, Deserialize)]
pub struct BotControlRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

// News and suggestions

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}
