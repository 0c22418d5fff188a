//! In-memory rate limiter for the verification endpoints
//!
//! Keys are opaque strings (client IP or normalized email). Limits are
//! fixed-window with a ban once the window is exhausted. State is per-process;
//! that is acceptable for a single-instance deployment of this service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Attempts allowed inside one window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds once the window is exhausted
    pub ban_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 900,  // 15 minutes
            ban_seconds: 3600,    // 1 hour
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited,
}

#[derive(Debug)]
struct Window {
    attempts: u32,
    started: Instant,
    banned_until: Option<Instant>,
}

/// Fixed-window rate limiter keyed by string
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and decide whether it may proceed.
    pub async fn check(&self, key: &str) -> Decision {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let window = windows.entry(key.to_string()).or_insert(Window {
            attempts: 0,
            started: now,
            banned_until: None,
        });

        if let Some(banned_until) = window.banned_until {
            if now < banned_until {
                return Decision::Limited;
            }
            // Ban elapsed; start a fresh window.
            window.attempts = 0;
            window.started = now;
            window.banned_until = None;
        }

        if now.duration_since(window.started) >= Duration::from_secs(self.config.window_seconds) {
            window.attempts = 0;
            window.started = now;
        }

        if window.attempts >= self.config.max_attempts {
            window.banned_until = Some(now + Duration::from_secs(self.config.ban_seconds));
            warn!(
                "Rate limited key {} for {} seconds",
                key, self.config.ban_seconds
            );
            return Decision::Limited;
        }

        window.attempts += 1;
        Decision::Allowed
    }
}
