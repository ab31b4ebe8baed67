mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Changes applied by a single booking update. `None` leaves a column as is.
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub status: Option<BookingStatus>,
    pub admin_notes: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
}

impl BookingChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.admin_notes.is_none()
            && self.payment_status.is_none()
            && self.payment_id.is_none()
            && self.payment_method.is_none()
    }
}

/// A row appended to `booking_history`.
#[derive(Debug, Clone)]
pub struct HistoryEntry<'a> {
    pub booking_id: i64,
    pub old_status: &'a str,
    pub new_status: BookingStatus,
    pub changed_by: &'a str,
    pub notes: Option<&'a str>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Admin user operations
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        username: Option<&str>,
    ) -> Result<AdminUser>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<AdminUser>>;
    fn count_users(&self) -> Result<i64>;

    // Booking operations
    fn create_booking(&self, booking: &NewBooking) -> Result<Booking>;
    fn get_booking(&self, id: i64) -> Result<Option<Booking>>;
    fn get_booking_by_token(&self, token: &str) -> Result<Option<Booking>>;
    fn list_bookings(&self) -> Result<Vec<Booking>>;
    fn update_booking(&self, id: i64, changes: &BookingChanges) -> Result<()>;
    fn is_date_time_booked(&self, date_time: &str) -> Result<bool>;
    fn list_booked_date_times(&self, from: &str) -> Result<Vec<String>>;
    /// Newest unpaid booking for `email` whose amount, stripped of currency
    /// and separators, truncates to `amount`.
    fn find_unpaid_booking_for_payment(&self, email: &str, amount: i64)
        -> Result<Option<Booking>>;
    fn list_bookings_by_payment_id(&self, payment_id: &str) -> Result<Vec<Booking>>;

    // Booking history operations
    fn append_history(&self, entry: &HistoryEntry<'_>) -> Result<()>;
    fn list_history(&self, booking_id: i64) -> Result<Vec<BookingHistory>>;

    // Availability operations
    fn get_slot(&self, date: &str, time: &str) -> Result<Option<AvailabilitySlot>>;
    fn list_slots(&self, start_date: &str, end_date: &str) -> Result<Vec<AvailabilitySlot>>;
    /// Inserts an available slot unless (date, time) already exists.
    fn add_slot(&self, date: &str, time: &str) -> Result<bool>;
    /// Marks a slot unavailable, creating a blocked row if none exists.
    fn block_slot(&self, date: &str, time: &str) -> Result<()>;
    fn delete_slot(&self, date: &str, time: &str) -> Result<bool>;

    // Leaderboard operations
    fn create_score(&self, score: &NewScore) -> Result<i64>;
    /// Lowest scores first.
    fn top_scores(&self, limit: i64) -> Result<Vec<Score>>;
}
