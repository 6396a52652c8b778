//! Bounded retry policies for request recovery and bootstrap.
//!
//! Every recovery path in the engine advances an explicit [`RetryState`]
//! through a [`RetryPolicy`]. Advancing performs the backoff delay and
//! returns `None` once the attempt budget is spent, so exhaustion is a
//! value the engine handles rather than an exception it catches.
//!
//! # Available Policies
//!
//! | Policy | Delay | Use Case |
//! |--------|-------|----------|
//! | `constant_bounded_ms` | fixed | request recovery, bootstrap |
//! | `exp_rand_limit_bounded_ms` | exponential + jitter, capped | congested clusters |
//!
//! Jitter spreads concurrent retriers so they do not reconverge on the
//! same broker in lockstep.
//!
//! # Example
//!
//! ```rust,no_run
//! use kavka::retry::{RetryPolicy, RetryState};
//!
//! async fn example() {
//!     let policy = RetryPolicy::constant_bounded_ms(1000, 3);
//!     let mut state = RetryState::new();
//!     while let Some(next) = policy.await_next_state(state).await {
//!         state = next;
//!         // retry the operation
//!     }
//!     // budget exhausted
//! }
//! ```

use std::time::Duration;

use rand::Rng;

/// Opaque accumulator of completed attempts, threaded through recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    /// A fresh state: no attempts made yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed attempts so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total tries made once the budget is exhausted (the initial try
    /// plus every granted retry).
    pub fn tries(&self) -> u32 {
        self.attempt + 1
    }
}

/// A bounded backoff policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryPolicy {
    /// Fixed delay between attempts.
    ConstantBounded {
        /// Delay performed before each retry.
        delay: Duration,
        /// Total attempt budget (initial try included).
        max_attempts: u32,
    },
    /// Exponential backoff with multiplicative jitter, capped.
    ExpRandLimitBounded {
        /// First retry delay.
        base: Duration,
        /// Growth factor per attempt.
        factor: f64,
        /// Jitter fraction in `[0, 1]`; the delay is scaled by a random
        /// factor in `[1, 1 + jitter]`.
        jitter: f64,
        /// Upper bound on any single delay.
        cap: Duration,
        /// Total attempt budget (initial try included).
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// Constant delay of `delay_ms` between at most `max_attempts` tries.
    pub const fn constant_bounded_ms(delay_ms: u64, max_attempts: u32) -> Self {
        RetryPolicy::ConstantBounded {
            delay: Duration::from_millis(delay_ms),
            max_attempts,
        }
    }

    /// Exponential backoff starting at `base_ms`, growing by `factor`,
    /// jittered by up to `jitter`, capped at `cap_ms`, over at most
    /// `max_attempts` tries.
    pub const fn exp_rand_limit_bounded_ms(
        base_ms: u64,
        factor: f64,
        jitter: f64,
        cap_ms: u64,
        max_attempts: u32,
    ) -> Self {
        RetryPolicy::ExpRandLimitBounded {
            base: Duration::from_millis(base_ms),
            factor,
            jitter,
            cap: Duration::from_millis(cap_ms),
            max_attempts,
        }
    }

    /// The total attempt budget.
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::ConstantBounded { max_attempts, .. }
            | RetryPolicy::ExpRandLimitBounded { max_attempts, .. } => *max_attempts,
        }
    }

    /// Delay to perform before the retry following `attempt` completed
    /// attempts.
    fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::ConstantBounded { delay, .. } => *delay,
            RetryPolicy::ExpRandLimitBounded {
                base,
                factor,
                jitter,
                cap,
                ..
            } => {
                let exp = base.as_millis() as f64 * factor.powi(attempt as i32);
                let jittered = exp * (1.0 + jitter * rand::thread_rng().gen::<f64>());
                let capped = jittered.min(cap.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }

    /// Advance the retry state, performing the backoff delay.
    ///
    /// Returns `None` when the attempt budget is exhausted; the caller
    /// surfaces the exhaustion error. Otherwise sleeps for this attempt's
    /// delay and returns the advanced state.
    pub async fn await_next_state(&self, state: RetryState) -> Option<RetryState> {
        let next = state.attempt + 1;
        if next >= self.max_attempts() {
            return None;
        }
        tokio::time::sleep(self.delay_for(state.attempt)).await;
        Some(RetryState { attempt: next })
    }
}
