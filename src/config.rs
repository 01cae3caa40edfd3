//! [`Config`] defines how slot-based primitives behave before blocking.

use std::fmt;
#[cfg(not(feature = "loom"))]
use std::thread::yield_now;

#[cfg(feature = "loom")]
use loom::thread::yield_now;

/// [`Config`] defines how slot-based primitives behave before blocking.
///
/// An acquisition first probes its admission slot up to [`spin_count`](Config::spin_count) times,
/// calling [`backoff`](Config::backoff) between probes, and only then parks the thread. Spinning
/// never changes which operations block forever; it only shortens uncontended handoffs.
///
/// # Examples
///
/// ```
/// use slotsync::{Config, Mutex};
///
/// #[derive(Debug, Default)]
/// struct NoSpin;
///
/// impl Config for NoSpin {
///     fn spin_count() -> usize {
///         0
///     }
/// }
///
/// let mutex = Mutex::<NoSpin>::with_config();
/// mutex.lock();
/// mutex.unlock();
/// ```
pub trait Config: fmt::Debug + Default {
    /// Defines the number of times to probe an admission slot before blocking on it.
    #[inline]
    #[must_use]
    fn spin_count() -> usize {
        if cfg!(feature = "loom") { 0 } else { 64 }
    }

    /// Defines the backoff function to use between probes.
    #[inline]
    fn backoff(spin_count: usize) {
        if spin_count % 16 == 15 {
            yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
}

/// Default configuration for slot-based primitives.
#[derive(Debug, Default)]
pub struct DefaultConfig;

impl Config for DefaultConfig {}
