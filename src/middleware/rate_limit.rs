//! Rate limiting middleware
//!
//! Sliding-window limiter owned by whoever handles requests. Stale keys are
//! evicted so the map stays bounded.

use log::{debug, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;

pub struct RateLimiter {
    requests: HashMap<String, Vec<Instant>>,
    max_requests: usize,
    window: Duration,
    max_tracked_keys: usize,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, max_tracked_keys: usize) -> Self {
        Self {
            requests: HashMap::new(),
            max_requests,
            window,
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, settings.window(), settings.max_tracked_keys)
    }

    pub fn check(&mut self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Record a request from `key` at `now` and report whether it is allowed
    pub fn check_at(&mut self, key: &str, now: Instant) -> bool {
        if !self.requests.contains_key(key) && self.requests.len() >= self.max_tracked_keys {
            self.evict_stale_at(now);
            if self.requests.len() >= self.max_tracked_keys {
                warn!("Rate limiter full ({} keys); rejecting {key}", self.requests.len());
                return false;
            }
        }

        let window = self.window;
        let entry = self.requests.entry(key.to_string()).or_default();

        // Remove old requests
        entry.retain(|&time| now.duration_since(time) < window);

        if entry.len() < self.max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Drop keys with no requests inside the window; returns how many were dropped
    pub fn evict_stale(&mut self) -> usize {
        self.evict_stale_at(Instant::now())
    }

    pub fn evict_stale_at(&mut self, now: Instant) -> usize {
        let window = self.window;
        let before = self.requests.len();
        self.requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < window);
            !times.is_empty()
        });
        let evicted = before - self.requests.len();
        if evicted > 0 {
            debug!("Evicted {evicted} stale rate limiter keys");
        }
        evicted
    }

    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }
}
