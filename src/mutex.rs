//! [`Mutex`] is a binary lock built on an admission slot of capacity one.

use std::fmt;
#[cfg(not(feature = "loom"))]
use std::time::Duration;

use tracing::warn;

use crate::config::{Config, DefaultConfig};
use crate::slot::AdmissionSlot;

/// [`Mutex`] is a binary lock built on an admission slot of capacity one.
///
/// [`Mutex`] does not protect any data and does not track its owner: any thread may call
/// [`unlock`](Self::unlock) as long as every [`lock`](Self::lock) is matched by exactly one
/// [`unlock`](Self::unlock) globally. Unlocking a mutex that is not locked is not reported as an
/// error; the calling thread blocks until a later [`lock`](Self::lock) supplies the token it
/// waits for.
pub struct Mutex<C: Config = DefaultConfig> {
    slot: AdmissionSlot<C>,
}

impl Mutex {
    /// Creates an unlocked [`Mutex`].
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Mutex;
    ///
    /// let mutex = Mutex::new();
    /// assert!(!mutex.is_locked());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config()
    }
}

impl<C: Config> Mutex<C> {
    /// Creates an unlocked [`Mutex`] with a custom [`Config`].
    #[inline]
    #[must_use]
    pub fn with_config() -> Self {
        Self {
            slot: AdmissionSlot::new(1),
        }
    }

    /// Returns `true` if the mutex is currently locked.
    ///
    /// The result is a snapshot intended for diagnostics.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.slot.occupancy() != 0
    }

    /// Locks the mutex, blocking until it is available.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Mutex;
    ///
    /// let mutex = Mutex::new();
    ///
    /// mutex.lock();
    /// assert!(mutex.is_locked());
    /// assert!(!mutex.try_lock());
    /// ```
    #[inline]
    pub fn lock(&self) {
        self.slot.acquire();
    }

    /// Tries to lock the mutex without blocking.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Mutex;
    ///
    /// let mutex = Mutex::new();
    ///
    /// assert!(mutex.try_lock());
    /// assert!(!mutex.try_lock());
    /// mutex.unlock();
    /// assert!(mutex.try_lock());
    /// ```
    #[inline]
    #[must_use]
    pub fn try_lock(&self) -> bool {
        self.slot.try_acquire()
    }

    /// Tries to lock the mutex, giving up after `timeout`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Mutex;
    /// use std::time::Duration;
    ///
    /// let mutex = Mutex::new();
    ///
    /// assert!(mutex.try_lock_for(Duration::from_millis(1)));
    /// assert!(!mutex.try_lock_for(Duration::from_millis(1)));
    /// ```
    #[cfg(not(feature = "loom"))]
    #[inline]
    #[must_use]
    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        self.slot.acquire_for(timeout)
    }

    /// Unlocks the mutex.
    ///
    /// If the mutex is not locked, the calling thread blocks until another thread locks it, and
    /// then unlocks it on that thread's behalf.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Mutex;
    ///
    /// let mutex = Mutex::new();
    ///
    /// mutex.lock();
    /// mutex.unlock();
    /// assert!(!mutex.is_locked());
    /// ```
    #[inline]
    pub fn unlock(&self) {
        if self.slot.try_release() {
            return;
        }
        warn!("unlocking a mutex that is not locked; blocking until it is locked");
        self.slot.release();
    }
}

impl<C: Config> fmt::Debug for Mutex<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Default for Mutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
