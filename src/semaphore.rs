//! [`Semaphore`] is a synchronization primitive that allows a fixed number of threads to access a
//! resource concurrently.
//!
//! [`CondvarSemaphore`] offers the same acquisition contract on top of a counter and a condition
//! variable; it differs from [`Semaphore`] in how it treats surplus releases.

use std::fmt;
use std::sync::PoisonError;
#[cfg(not(feature = "loom"))]
use std::sync::{Condvar, Mutex};
#[cfg(not(feature = "loom"))]
use std::time::Duration;

#[cfg(feature = "loom")]
use loom::sync::{Condvar, Mutex};
use tracing::warn;

use crate::Error;
use crate::config::{Config, DefaultConfig};
use crate::slot::AdmissionSlot;

/// Largest capacity accepted by [`Semaphore`]; the slot buffer is allocated up front.
const PERMIT_LIMIT: usize = 1 << 16;

/// [`Semaphore`] is a synchronization primitive that allows a fixed number of threads to access a
/// resource concurrently.
///
/// Each permit is a position in an admission slot of the semaphore's capacity.
///
/// # Fairness
///
/// Blocked [`acquire`](Self::acquire) callers are not queued ahead of
/// [`try_acquire`](Self::try_acquire) callers: a steady stream of successful
/// [`try_acquire`](Self::try_acquire) calls can keep overtaking them.
///
/// # Surplus releases
///
/// Calling [`release`](Self::release) more often than permits were acquired is a contract
/// violation that is not reported as an error. The surplus release blocks until the next
/// acquisition, then consumes that acquisition's token. From then on the semaphore holds one
/// token fewer than there are outstanding permits, and the deficit is never repaid: one extra
/// permit can be acquired, and a correctly paired [`release`](Self::release) that finds no token
/// blocks in turn until another acquisition arrives.
pub struct Semaphore<C: Config = DefaultConfig> {
    slot: AdmissionSlot<C>,
}

impl Semaphore {
    /// Maximum number of permits a [`Semaphore`] can hold.
    pub const MAX_PERMITS: usize = PERMIT_LIMIT;

    /// Creates a [`Semaphore`] with `capacity` permits.
    ///
    /// A capacity of `0` is legal: [`acquire`](Self::acquire) then never returns and
    /// [`try_acquire`](Self::try_acquire) always fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if `capacity` exceeds [`MAX_PERMITS`](Self::MAX_PERMITS).
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::{Error, Semaphore};
    ///
    /// let semaphore = Semaphore::new(4).unwrap();
    /// assert_eq!(semaphore.capacity(), 4);
    ///
    /// assert!(matches!(
    ///     Semaphore::new(usize::MAX),
    ///     Err(Error::CapacityOverflow { .. })
    /// ));
    /// ```
    #[inline]
    pub fn new(capacity: usize) -> Result<Self, Error> {
        Self::with_config(capacity)
    }
}

impl<C: Config> Semaphore<C> {
    /// Creates a [`Semaphore`] with `capacity` permits and a custom [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if `capacity` exceeds
    /// [`Semaphore::MAX_PERMITS`].
    pub fn with_config(capacity: usize) -> Result<Self, Error> {
        if capacity > PERMIT_LIMIT {
            return Err(Error::CapacityOverflow {
                requested: capacity,
                max: PERMIT_LIMIT,
            });
        }
        Ok(Self {
            slot: AdmissionSlot::new(capacity),
        })
    }

    /// Returns the number of permits the semaphore was created with.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slot.capacity()
    }

    /// Returns the number of available permits.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Semaphore;
    ///
    /// let semaphore = Semaphore::new(3).unwrap();
    /// semaphore.acquire();
    /// assert_eq!(semaphore.available_permits(), 2);
    /// ```
    #[inline]
    pub fn available_permits(&self) -> usize {
        self.slot.capacity().saturating_sub(self.slot.occupancy())
    }

    /// Gets a permit from the semaphore, blocking until one is available.
    #[inline]
    pub fn acquire(&self) {
        self.slot.acquire();
    }

    /// Tries to get a permit from the semaphore.
    ///
    /// Returns `false` if no permits are available.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Semaphore;
    ///
    /// let semaphore = Semaphore::new(1).unwrap();
    ///
    /// assert!(semaphore.try_acquire());
    /// assert!(!semaphore.try_acquire());
    /// ```
    #[inline]
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.slot.try_acquire()
    }

    /// Tries to get a permit, giving up after `timeout`.
    #[cfg(not(feature = "loom"))]
    #[inline]
    #[must_use]
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        self.slot.acquire_for(timeout)
    }

    /// Releases a permit.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Semaphore;
    ///
    /// let semaphore = Semaphore::new(1).unwrap();
    ///
    /// semaphore.acquire();
    /// semaphore.release();
    /// assert_eq!(semaphore.available_permits(), 1);
    /// ```
    #[inline]
    pub fn release(&self) {
        if self.slot.try_release() {
            return;
        }
        warn!(
            capacity = self.slot.capacity(),
            "surplus semaphore release; blocking until the next acquisition"
        );
        self.slot.release();
    }
}

impl<C: Config> fmt::Debug for Semaphore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("capacity", &self.capacity())
            .field("available_permits", &self.available_permits())
            .finish()
    }
}

/// [`CondvarSemaphore`] counts permits under a mutex and parks waiters on a condition variable.
///
/// Unlike [`Semaphore`], a surplus [`release`](Self::release) never blocks: the permit count
/// simply grows past the initial capacity.
pub struct CondvarSemaphore {
    /// Initial number of permits.
    capacity: usize,
    /// Number of available permits.
    tokens: Mutex<usize>,
    /// Signaled whenever a permit is returned.
    released: Condvar,
}

impl CondvarSemaphore {
    /// Creates a [`CondvarSemaphore`] with `capacity` permits.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::CondvarSemaphore;
    ///
    /// let semaphore = CondvarSemaphore::new(2);
    /// assert_eq!(semaphore.available_permits(), 2);
    /// ```
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tokens: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    /// Returns the number of available permits.
    pub fn available_permits(&self) -> usize {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a permit, blocking until one is available.
    pub fn acquire(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        while *tokens == 0 {
            tokens = self
                .released
                .wait(tokens)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *tokens -= 1;
    }

    /// Tries to get a permit without blocking.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if *tokens == 0 {
            return false;
        }
        *tokens -= 1;
        true
    }

    /// Returns a permit and wakes every waiter.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::CondvarSemaphore;
    ///
    /// let semaphore = CondvarSemaphore::new(1);
    ///
    /// // A surplus release grows the semaphore.
    /// semaphore.release();
    /// assert!(semaphore.try_acquire());
    /// assert!(semaphore.try_acquire());
    /// assert!(!semaphore.try_acquire());
    /// ```
    pub fn release(&self) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        *tokens += 1;
        if *tokens > self.capacity {
            warn!(
                capacity = self.capacity,
                available = *tokens,
                "surplus semaphore release; capacity grows"
            );
        }
        self.released.notify_all();
    }
}

impl fmt::Debug for CondvarSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondvarSemaphore")
            .field("capacity", &self.capacity)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}
