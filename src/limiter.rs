//! [`Limiter`] hands out one token per tick of a fixed interval.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::Error;

/// [`Limiter`] hands out one token per tick of a fixed interval.
///
/// Ticks fall on a grid that starts when the limiter is created or [`reset`](Self::reset), and
/// they do not accumulate: however long the limiter stays idle, at most one token is ready
/// immediately. Callers are served one at a time, and each receives a distinct tick.
///
/// # Examples
///
/// ```
/// use slotsync::Limiter;
/// use std::time::{Duration, Instant};
///
/// let limiter = Limiter::new(Duration::from_millis(5)).unwrap();
///
/// let start = Instant::now();
/// limiter.grant_next_token().unwrap();
/// limiter.grant_next_token().unwrap();
/// assert!(start.elapsed() >= Duration::from_millis(10));
///
/// limiter.stop();
/// assert!(limiter.grant_next_token().is_err());
/// ```
pub struct Limiter {
    state: Mutex<State>,
}

/// Tick schedule of a [`Limiter`].
#[derive(Debug)]
struct State {
    interval: Duration,
    /// Earliest instant at which the next token can be granted.
    next_tick: Instant,
    stopped: bool,
}

impl Limiter {
    /// Creates a [`Limiter`] whose first tick is one `interval` from now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInterval`] if `interval` is zero, or [`Error::IntervalOverflow`] if
    /// the first tick cannot be represented.
    pub fn new(interval: Duration) -> Result<Self, Error> {
        let next_tick = first_tick(interval)?;
        Ok(Self {
            state: Mutex::new(State {
                interval,
                next_tick,
                stopped: false,
            }),
        })
    }

    /// Returns the current tick interval.
    pub fn interval(&self) -> Duration {
        self.state().interval
    }

    /// Blocks until the next tick and consumes it.
    ///
    /// If the tick after this one cannot be represented, the token is still granted and the
    /// limiter stops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LimiterStopped`] if the limiter has been stopped.
    pub fn grant_next_token(&self) -> Result<(), Error> {
        let mut state = self.state();
        if state.stopped {
            return Err(Error::LimiterStopped);
        }
        let interval = state.interval;
        let now = Instant::now();
        let advance = if now < state.next_tick {
            // Waiting callers queue on the state lock, which keeps grants one tick apart.
            thread::sleep(state.next_tick - now);
            interval
        } else {
            // Missed ticks collapse into the one being granted now.
            let behind = now.duration_since(state.next_tick).as_nanos() / interval.as_nanos();
            let skip = u32::try_from(behind + 1).unwrap_or(u32::MAX);
            interval.saturating_mul(skip)
        };
        if let Some(next_tick) = state.next_tick.checked_add(advance) {
            state.next_tick = next_tick;
        } else {
            warn!(?interval, "limiter schedule overflows; stopping");
            state.stopped = true;
        }
        Ok(())
    }

    /// Changes the interval; the next tick is one new interval from now.
    ///
    /// A stopped limiter is restarted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroInterval`] if `interval` is zero, or [`Error::IntervalOverflow`] if
    /// the first tick cannot be represented. The limiter is left unchanged in both cases.
    pub fn reset(&self, interval: Duration) -> Result<(), Error> {
        let next_tick = first_tick(interval)?;
        let mut state = self.state();
        debug!(from = ?state.interval, to = ?interval, "limiter interval reset");
        state.interval = interval;
        state.next_tick = next_tick;
        state.stopped = false;
        Ok(())
    }

    /// Stops granting tokens.
    pub fn stop(&self) {
        let mut state = self.state();
        if !state.stopped {
            debug!(interval = ?state.interval, "limiter stopped");
        }
        state.stopped = true;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Limiter")
            .field("interval", &state.interval)
            .field("stopped", &state.stopped)
            .finish()
    }
}

/// Validates `interval` and returns the instant one interval from now.
fn first_tick(interval: Duration) -> Result<Instant, Error> {
    if interval.is_zero() {
        return Err(Error::ZeroInterval(interval));
    }
    Instant::now()
        .checked_add(interval)
        .ok_or(Error::IntervalOverflow(interval))
}

#[cfg(not(feature = "loom"))]
#[cfg(test)]
mod test {
    use super::Limiter;
    use crate::Error;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn rejects_zero_interval() {
        assert!(matches!(
            Limiter::new(Duration::ZERO),
            Err(Error::ZeroInterval(_))
        ));
        let limiter = Limiter::new(Duration::from_millis(1)).unwrap();
        assert!(limiter.reset(Duration::ZERO).is_err());
        assert_eq!(limiter.interval(), Duration::from_millis(1));
    }

    #[test]
    fn rejects_unrepresentable_interval() {
        assert_eq!(
            Limiter::new(Duration::MAX).err(),
            Some(Error::IntervalOverflow(Duration::MAX))
        );

        let limiter = Limiter::new(Duration::from_millis(1)).unwrap();
        limiter.stop();
        assert_eq!(
            limiter.reset(Duration::MAX),
            Err(Error::IntervalOverflow(Duration::MAX))
        );
        assert_eq!(limiter.interval(), Duration::from_millis(1));
        assert_eq!(limiter.grant_next_token(), Err(Error::LimiterStopped));
    }

    #[test]
    fn idle_ticks_do_not_accumulate() {
        let interval = Duration::from_millis(10);
        let limiter = Limiter::new(interval).unwrap();
        thread::sleep(interval * 5);

        let start = Instant::now();
        limiter.grant_next_token().unwrap();
        assert!(start.elapsed() < interval);
        limiter.grant_next_token().unwrap();
        limiter.grant_next_token().unwrap();
        assert!(start.elapsed() >= interval);
    }

    #[test]
    fn reset_restarts_stopped_limiter() {
        let limiter = Limiter::new(Duration::from_millis(50)).unwrap();
        limiter.stop();
        assert_eq!(limiter.grant_next_token(), Err(Error::LimiterStopped));

        limiter.reset(Duration::from_millis(2)).unwrap();
        let start = Instant::now();
        limiter.grant_next_token().unwrap();
        limiter.grant_next_token().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
