use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::schema::SCHEMA;
use super::{BookingChanges, HistoryEntry, Store};
use crate::error::{Error, Result};
use crate::types::*;

const BOOKING_COLUMNS: &str = "id, client_name, discord_id, email, package_id, package_name, amount,
     date_time, status, payment_id, payment_status, payment_method, add_ons, admin_notes,
     customer_notes, booking_token, created_at, updated_at";

const SLOT_COLUMNS: &str = "id, date, time, is_available, booking_id, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// SQL list of the statuses that hold a time slot, e.g. `'pending', 'confirmed'`.
fn slot_holding_statuses() -> String {
    BookingStatus::ALL
        .into_iter()
        .filter(|status| status.holds_slot())
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_booking_status(s: &str) -> BookingStatus {
    BookingStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid booking status in database: '{}'", s);
        BookingStatus::default()
    })
}

fn parse_payment_status(s: &str) -> PaymentStatus {
    PaymentStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid payment status in database: '{}'", s);
        PaymentStatus::default()
    })
}

fn parse_add_ons(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid add_ons in database: '{}' - {}", s, e);
        Vec::new()
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        client_name: row.get(1)?,
        discord_id: row.get(2)?,
        email: row.get(3)?,
        package_id: row.get(4)?,
        package_name: row.get(5)?,
        amount: row.get(6)?,
        date_time: row.get(7)?,
        status: parse_booking_status(&row.get::<_, String>(8)?),
        payment_id: row.get(9)?,
        payment_status: parse_payment_status(&row.get::<_, String>(10)?),
        payment_method: row.get(11)?,
        add_ons: parse_add_ons(&row.get::<_, String>(12)?),
        admin_notes: row.get(13)?,
        customer_notes: row.get(14)?,
        booking_token: row.get(15)?,
        created_at: parse_datetime(&row.get::<_, String>(16)?),
        updated_at: parse_datetime(&row.get::<_, String>(17)?),
    })
}

fn row_to_slot(row: &Row<'_>) -> rusqlite::Result<AvailabilitySlot> {
    Ok(AvailabilitySlot {
        id: row.get(0)?,
        date: row.get(1)?,
        time: row.get(2)?,
        is_available: row.get(3)?,
        booking_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<AdminUser> {
    Ok(AdminUser {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        username: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Admin user operations

    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        username: Option<&str>,
    ) -> Result<AdminUser> {
        let created_at = Utc::now();
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (email, password_hash, name, username, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![email, password_hash, name, username, format_datetime(&created_at)],
        );

        match result {
            Ok(_) => Ok(AdminUser {
                id: conn.last_insert_rowid(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                name: name.to_string(),
                username: username.map(str::to_string),
                created_at,
            }),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password_hash, name, username, created_at
             FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn count_users(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(Error::from)
    }

    // Booking operations

    fn create_booking(&self, booking: &NewBooking) -> Result<Booking> {
        let now = format_datetime(&Utc::now());
        let add_ons = serde_json::to_string(&booking.add_ons)
            .map_err(|e| Error::BadRequest(format!("invalid add_ons: {e}")))?;

        let id = {
            let conn = self.conn();
            let result = conn.execute(
                "INSERT INTO bookings (client_name, discord_id, email, package_id, package_name,
                     amount, date_time, status, payment_status, add_ons, customer_notes,
                     booking_token, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                params![
                    booking.client_name,
                    booking.discord_id,
                    booking.email,
                    booking.package_id,
                    booking.package_name,
                    booking.amount,
                    booking.date_time,
                    BookingStatus::Pending.as_str(),
                    PaymentStatus::Unpaid.as_str(),
                    add_ons,
                    booking.customer_notes,
                    booking.booking_token,
                    now,
                ],
            );

            match result {
                Ok(_) => conn.last_insert_rowid(),
                Err(e) if is_constraint_violation(&e) => return Err(Error::AlreadyExists),
                Err(e) => return Err(Error::from(e)),
            }
        };

        self.get_booking(id)?.ok_or(Error::NotFound)
    }

    fn get_booking(&self, id: i64) -> Result<Option<Booking>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            row_to_booking,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_booking_by_token(&self, token: &str) -> Result<Option<Booking>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_token = ?1"),
            params![token],
            row_to_booking,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_bookings(&self) -> Result<Vec<Booking>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map([], row_to_booking)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_booking(&self, id: i64, changes: &BookingChanges) -> Result<()> {
        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = changes.status {
            columns.push("status");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(notes) = &changes.admin_notes {
            columns.push("admin_notes");
            values.push(Value::Text(notes.clone()));
        }
        if let Some(payment_status) = changes.payment_status {
            columns.push("payment_status");
            values.push(Value::Text(payment_status.as_str().to_string()));
        }
        if let Some(payment_id) = &changes.payment_id {
            columns.push("payment_id");
            values.push(Value::Text(payment_id.clone()));
        }
        if let Some(method) = &changes.payment_method {
            columns.push("payment_method");
            values.push(Value::Text(method.clone()));
        }

        columns.push("updated_at");
        values.push(Value::Text(format_datetime(&Utc::now())));

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE bookings SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len() + 1
        );
        values.push(Value::Integer(id));

        let rows = self.conn().execute(&sql, params_from_iter(values.iter()))?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn is_date_time_booked(&self, date_time: &str) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM bookings
             WHERE date_time = ?1 AND status IN ({}))",
            slot_holding_statuses()
        );
        let conn = self.conn();
        conn.query_row(
            &sql,
            params![date_time],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn list_booked_date_times(&self, from: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT date_time FROM bookings
             WHERE status IN ({}) AND date_time >= ?1",
            slot_holding_statuses()
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![from], |row| row.get::<_, String>(0))?;

        rows.map(|r| r.map(|s| s.trim().to_string()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn find_unpaid_booking_for_payment(
        &self,
        email: &str,
        amount: i64,
    ) -> Result<Option<Booking>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE email = ?1
                 AND CAST(REPLACE(REPLACE(amount, 'AED ', ''), ',', '') AS INTEGER) = ?2
                 AND payment_status = 'unpaid'
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1"
            ),
            params![email, amount],
            row_to_booking,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_bookings_by_payment_id(&self, payment_id: &str) -> Result<Vec<Booking>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![payment_id], row_to_booking)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Booking history operations

    fn append_history(&self, entry: &HistoryEntry<'_>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO booking_history (booking_id, old_status, new_status, changed_by, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.booking_id,
                entry.old_status,
                entry.new_status.as_str(),
                entry.changed_by,
                entry.notes,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn list_history(&self, booking_id: i64) -> Result<Vec<BookingHistory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, booking_id, old_status, new_status, changed_by, notes, created_at
             FROM booking_history WHERE booking_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![booking_id], |row| {
            Ok(BookingHistory {
                id: row.get(0)?,
                booking_id: row.get(1)?,
                old_status: row.get(2)?,
                new_status: parse_booking_status(&row.get::<_, String>(3)?),
                changed_by: row.get(4)?,
                notes: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Availability operations

    fn get_slot(&self, date: &str, time: &str) -> Result<Option<AvailabilitySlot>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SLOT_COLUMNS} FROM availability_slots WHERE date = ?1 AND time = ?2"),
            params![date, time],
            row_to_slot,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_slots(&self, start_date: &str, end_date: &str) -> Result<Vec<AvailabilitySlot>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots
             WHERE date BETWEEN ?1 AND ?2 ORDER BY date, time"
        ))?;

        let rows = stmt.query_map(params![start_date, end_date], row_to_slot)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn add_slot(&self, date: &str, time: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO availability_slots (date, time, is_available, created_at)
             VALUES (?1, ?2, 1, ?3)",
            params![date, time, format_datetime(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn block_slot(&self, date: &str, time: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO availability_slots (date, time, is_available, created_at)
             VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(date, time) DO UPDATE SET is_available = 0",
            params![date, time, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn delete_slot(&self, date: &str, time: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM availability_slots WHERE date = ?1 AND time = ?2",
            params![date, time],
        )?;
        Ok(rows > 0)
    }

    // Leaderboard operations

    fn create_score(&self, score: &NewScore) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO scores (username, discord_id, score, rank, pin, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                score.username,
                score.discord_id,
                score.score,
                score.rank,
                score.pin,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn top_scores(&self, limit: i64) -> Result<Vec<Score>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, discord_id, score, rank, pin, timestamp
             FROM scores ORDER BY score ASC, id ASC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(Score {
                id: row.get(0)?,
                username: row.get(1)?,
                discord_id: row.get(2)?,
                score: row.get(3)?,
                rank: row.get(4)?,
                pin: row.get(5)?,
                timestamp: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
