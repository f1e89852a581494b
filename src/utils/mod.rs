use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Time source for the rate limiter and token validation
///
/// `now` is monotonic and drives window arithmetic; `unix_now` is wall-clock
/// time used for token expiry and for the reset instants reported to callers.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn unix_now(&self) -> Duration;
}

/// Clock backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Manually advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    unix_base: Duration,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Start at the current real time
    pub fn new() -> Self {
        Self::starting_at(SystemClock.unix_now())
    }

    /// Start at a fixed Unix time
    pub fn starting_at(unix_base: Duration) -> Self {
        Self {
            base: Instant::now(),
            unix_base,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset()
    }

    fn unix_now(&self) -> Duration {
        self.unix_base + self.offset()
    }
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Convert a duration to milliseconds
pub fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_secs() * 1000 + u64::from(duration.subsec_millis())
}
