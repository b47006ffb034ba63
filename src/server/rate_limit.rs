//! Per-workspace rate limiting
//!
//! Catalogue writes into a workspace are throttled to one request per
//! configured interval, keyed on the workspace segment.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::server::error::ApiError;

pub struct RateLimiter {
    enabled: bool,
    interval: Duration,
    last_request: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_secs(config.interval_seconds),
            last_request: DashMap::new(),
        }
    }

    /// Record a request for `workspace`, rejecting it when the previous one
    /// was inside the interval
    pub fn check(&self, workspace: &str) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self
            .last_request
            .entry(workspace.to_string())
            .or_insert(now - self.interval);
        let elapsed = now.duration_since(*entry);
        if elapsed < self.interval {
            let retry_after = (self.interval - elapsed).as_secs().max(1);
            return Err(ApiError::RateLimited { retry_after });
        }
        *entry = now;
        Ok(())
    }
}
