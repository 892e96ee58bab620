use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: f64,
}

/// Token bucket measured in bytes.
///
/// Clones share the same budget. Time is seconds since the bucket was
/// created, either read from the wall clock or supplied by the caller.
#[derive(Clone, Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    origin: Instant,
    state: Arc<Mutex<BucketState>>,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            origin: Instant::now(),
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity,
                last_refill: 0.0,
            })),
        }
    }

    /// Bucket holding one second worth of `bytes_per_sec`.
    pub fn per_second(bytes_per_sec: f64) -> Self {
        Self::new(bytes_per_sec, bytes_per_sec)
    }

    pub fn try_acquire(&self, amount: f64) -> bool {
        self.try_acquire_at(amount, self.origin.elapsed().as_secs_f64())
    }

    /// Like [`Self::try_acquire`], with the current time given in seconds.
    ///
    /// Times earlier than the last refill add no tokens.
    pub fn try_acquire_at(&self, amount: f64, now_secs: f64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now_secs - state.last_refill;
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
            state.last_refill = now_secs;
        }

        if state.tokens >= amount {
            state.tokens -= amount;
            true
        } else {
            false
        }
    }
}
