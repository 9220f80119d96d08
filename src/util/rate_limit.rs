//! Per-socket budget for follower intents
//!
//! Followers send MOVE every rendered frame while a key is held. Anything over
//! the budget is dropped before it reaches the host queue; the socket stays open.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Default intents per second per socket, comfortably above a 60 Hz client
pub const DEFAULT_INPUT_RATE_LIMIT: u32 = 120;

/// Intent budget for one follower socket
pub struct IntentLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    dropped: u64,
}

impl IntentLimiter {
    /// A zero budget is treated as one intent per second
    pub fn new(per_second: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            dropped: 0,
        }
    }

    /// Take one intent from the budget; counts the drop when over it
    pub fn admit(&mut self) -> bool {
        let admitted = self.limiter.check().is_ok();
        if !admitted {
            self.dropped += 1;
        }
        admitted
    }

    /// Intents dropped so far on this socket
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for IntentLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_RATE_LIMIT)
    }
}
