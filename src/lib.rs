//! # FPSOS
//!
//! Booking and admin backend for the FPSOS PC optimization service, usable
//! both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! fpsos = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fpsos::config::ServerConfig;
//! use fpsos::server::{AppState, create_router};
//! use fpsos::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(&config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(config, Arc::new(store)).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `fpsos` binary. Disable with `default-features = false`.

pub mod auth;
pub mod availability;
pub mod config;
pub mod error;
pub mod integrations;
pub mod rate_limit;
pub mod server;
pub mod store;
pub mod types;
