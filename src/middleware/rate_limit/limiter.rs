use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::middleware::rate_limit::RateDecision;
use crate::utils::{Clock, SystemClock};

/// Exact sliding-window rate limiter keyed by client
///
/// Each key owns an ascending queue of admission instants. Admission prunes
/// instants older than the window and admits only while fewer than
/// `max_requests` remain. The prune-check-append sequence for a key runs
/// under that key's shard lock, so concurrent callers never over-admit.
pub struct SlidingWindowLimiter {
    records: DashMap<String, VecDeque<Instant>>,
    window: Duration,
    max_requests: u32,
    max_tracked_clients: usize,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self::with_clock(window, max_requests, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            window,
            max_requests,
            max_tracked_clients: usize::MAX,
            clock,
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.window(), config.max_requests, clock)
            .with_capacity_limit(config.max_tracked_clients)
    }

    /// Bound the number of tracked client keys
    pub fn with_capacity_limit(mut self, max_tracked_clients: usize) -> Self {
        self.max_tracked_clients = max_tracked_clients.max(1);
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of client keys currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Try to admit one request for `key`
    pub fn admit(&self, key: &str) -> RateDecision {
        let now = self.clock.now();

        if !self.records.contains_key(key) && self.records.len() >= self.max_tracked_clients {
            self.make_room(now);
        }

        let mut entry = self.records.entry(key.to_string()).or_default();
        let records = entry.value_mut();
        Self::prune(records, now, self.window);

        if records.len() >= self.max_requests as usize {
            return RateDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset: self.reset_instant(records.front().copied(), now),
            };
        }

        records.push_back(now);
        RateDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - records.len() as u32,
            reset: self.reset_instant(records.front().copied(), now),
        }
    }

    /// Remove keys whose window is empty. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        self.sweep_at(now)
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the task is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The first tick completes immediately
            timer.tick().await;
            loop {
                timer.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        tracked = limiter.tracked_clients(),
                        "Swept idle rate limit keys"
                    );
                }
            }
        })
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.records.len();
        let window = self.window;
        self.records.retain(|_, records| {
            Self::prune(records, now, window);
            !records.is_empty()
        });
        before.saturating_sub(self.records.len())
    }

    /// Free a slot for a new key: drop idle keys first, then the key whose
    /// latest request is the oldest.
    fn make_room(&self, now: Instant) {
        self.sweep_at(now);
        if self.records.len() < self.max_tracked_clients {
            return;
        }

        let victim = self
            .records
            .iter()
            .min_by_key(|entry| entry.value().back().copied())
            .map(|entry| entry.key().clone());

        if let Some(victim) = victim {
            tracing::warn!(
                evicted = %victim,
                capacity = self.max_tracked_clients,
                "Rate limiter at capacity, evicting least recently active client"
            );
            self.records.remove(&victim);
        }
    }

    fn prune(records: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = records.front() {
            if now.saturating_duration_since(*oldest) > window {
                records.pop_front();
            } else {
                break;
            }
        }
    }

    /// Unix second at which the oldest admission in the window expires
    fn reset_instant(&self, oldest: Option<Instant>, now: Instant) -> u64 {
        let until_reset = match oldest {
            Some(oldest) => (oldest + self.window).saturating_duration_since(now),
            None => self.window,
        };
        (self.clock.unix_now() + until_reset).as_secs_f64().ceil() as u64
    }
}
