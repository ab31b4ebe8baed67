//! Fixed-window request counters keyed by endpoint and client IP.
//!
//! State lives in process memory, so limits are per server instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use serde::Deserialize;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window.
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitConfig {
    #[must_use]
    pub const fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(60, 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject {
        /// Whole seconds until the window resets, at least 1.
        retry_after: u64,
        limit: u32,
        reset_at_unix: i64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Entry>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Counts a request from `ip` against `endpoint`.
    pub fn check(&self, endpoint: &str, ip: &str, config: RateLimitConfig) -> Decision {
        self.check_at(endpoint, ip, config, Instant::now())
    }

    pub fn check_at(
        &self,
        endpoint: &str,
        ip: &str,
        config: RateLimitConfig,
        now: Instant,
    ) -> Decision {
        let key = format!("{endpoint}:{ip}");
        let fresh = Entry {
            count: 0,
            reset_at: now + config.window(),
        };
        let mut entries = self.entries();

        let entry = entries
            .entry(key)
            .and_modify(|entry| {
                if entry.reset_at < now {
                    *entry = fresh;
                }
            })
            .or_insert(fresh);

        if entry.count >= config.limit {
            let remaining = entry.reset_at.saturating_duration_since(now);
            let retry_after = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            let retry_after = retry_after.max(1);
            let reset_at_unix = chrono::Utc::now().timestamp()
                + i64::try_from(retry_after).unwrap_or(i64::MAX);
            return Decision::Reject {
                retry_after,
                limit: config.limit,
                reset_at_unix,
            };
        }

        entry.count += 1;
        Decision::Admit
    }

    /// Drops entries whose window had already closed at `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at >= now);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically sweeps expired entries until the limiter is dropped.
pub fn spawn_sweeper(limiter: &Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    let weak = Arc::downgrade(limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(limiter) = weak.upgrade() else {
                break;
            };
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                tracing::debug!("Swept {removed} expired rate limit entries");
            }
        }
    })
}

/// Client address as reported by the fronting proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}
