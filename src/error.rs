//! Construction-time errors.
//!
//! Misuse of an already constructed primitive, such as an unmatched unlock, is never reported
//! through [`Error`]; it blocks the offending thread instead.

use std::time::Duration;

/// Errors raised when a primitive is configured with parameters it cannot honor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The requested capacity exceeds what an admission slot can buffer.
    #[error("capacity {requested} exceeds the maximum of {max}")]
    CapacityOverflow {
        /// Requested capacity.
        requested: usize,
        /// Largest accepted capacity.
        max: usize,
    },
    /// A fixed barrier needs at least one participant.
    #[error("a barrier requires at least one participant")]
    ZeroParticipants,
    /// A limiter cannot tick at a zero interval.
    #[error("limiter interval must be non-zero, got {0:?}")]
    ZeroInterval(Duration),
    /// A limiter interval so long that its first tick cannot be represented.
    #[error("limiter interval {0:?} overflows the clock")]
    IntervalOverflow(Duration),
    /// The limiter was stopped and grants no more tokens.
    #[error("limiter has been stopped")]
    LimiterStopped,
}
