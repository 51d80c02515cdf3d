use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A token bucket guarding the `/api/v1` routes. The bucket starts full,
/// refills back to `capacity` once `fill_interval` has elapsed since the
/// last refill, and every request consumes one token.
pub struct RateLimiter {
    capacity: u64,
    fill_interval: Duration,

    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: u64,
    last_fill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u64, fill_interval: Duration) -> Self {
        Self {
            capacity,
            fill_interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_fill: Instant::now(),
            }),
        }
    }

    /// Takes one token, returning false when the bucket is empty. A poisoned
    /// lock counts as empty.
    pub fn try_acquire(&self) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => return false,
        };

        if state.last_fill.elapsed() >= self.fill_interval {
            state.tokens = self.capacity;
            state.last_fill = Instant::now();
        }

        if state.tokens == 0 {
            return false;
        }
        state.tokens -= 1;
        true
    }
}
