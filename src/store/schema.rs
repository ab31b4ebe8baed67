pub const SCHEMA: &str = r#"
-- Admin accounts; created offline via `fpsos admin create-user`
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,       -- argon2id PHC string
    name TEXT NOT NULL,
    username TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Customer bookings
CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_name TEXT NOT NULL,
    discord_id TEXT NOT NULL,
    email TEXT,
    package_id TEXT NOT NULL,
    package_name TEXT NOT NULL,
    amount TEXT NOT NULL,              -- display string, e.g. "AED 199"
    date_time TEXT NOT NULL,           -- "YYYY-MM-DD HH:MM"
    status TEXT NOT NULL DEFAULT 'pending',
    payment_id TEXT,
    payment_status TEXT NOT NULL DEFAULT 'unpaid',
    payment_method TEXT,
    add_ons TEXT NOT NULL DEFAULT '[]', -- JSON array
    admin_notes TEXT,
    customer_notes TEXT,
    booking_token TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Append-only log of status transitions
CREATE TABLE IF NOT EXISTS booking_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id INTEGER NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
    old_status TEXT NOT NULL DEFAULT '',
    new_status TEXT NOT NULL,
    changed_by TEXT,
    notes TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Manual overrides on top of generated business-hour slots
CREATE TABLE IF NOT EXISTS availability_slots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,                -- "YYYY-MM-DD"
    time TEXT NOT NULL,                -- "HH:MM"
    is_available INTEGER NOT NULL DEFAULT 1,
    booking_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(date, time)
);

-- Leaderboard; lower score is better
CREATE TABLE IF NOT EXISTS scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    discord_id TEXT,
    score REAL NOT NULL,
    rank TEXT,
    pin TEXT NOT NULL,
    timestamp TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_bookings_date_time ON bookings(date_time);
CREATE INDEX IF NOT EXISTS idx_bookings_email ON bookings(email);
CREATE INDEX IF NOT EXISTS idx_bookings_payment_id ON bookings(payment_id);
CREATE INDEX IF NOT EXISTS idx_booking_history_booking ON booking_history(booking_id);
CREATE INDEX IF NOT EXISTS idx_availability_date ON availability_slots(date);
CREATE INDEX IF NOT EXISTS idx_scores_score ON scores(score);
"#;
