//! Bounded random delays.
//!
//! Used for jittered waiting before a caller retries, so that many clients backing off from
//! the same lock do not return in lockstep.

use rand::Rng;
use std::time::Duration;

/// Default upper bound, in seconds, for a jittered wait.
pub const DEFAULT_WAIT_MAX_SECS: i64 = 10;

/// Return a uniformly distributed value in `[0, |max|]`.
///
/// Negative bounds use their absolute value and a bound of zero always yields zero.
#[must_use]
pub fn random_up_to(max: i64) -> u64 {
    let bound = max.unsigned_abs();
    if bound == 0 {
        return 0;
    }

    rand::thread_rng().gen_range(0..=bound)
}

/// A random delay of whole seconds in `[0, |max_secs|]`.
#[must_use]
pub fn jitter(max_secs: i64) -> Duration {
    Duration::from_secs(random_up_to(max_secs))
}
