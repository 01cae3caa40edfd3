//! [`RwLock`] is a writer-preferring reader-writer lock built from two admission slots and an
//! atomic reader count.
//!
//! # Algorithm
//!
//! * The writer gate is a slot of capacity one. Every reader holds it for the duration of its
//!   registration, and a writer holds it for the whole exclusive section.
//! * The no-readers gate is a slot of capacity one that starts full. Its token is taken by the
//!   first reader of a generation on behalf of all readers, or by a writer, and is returned by
//!   the last reader of the generation, or by the writer on unlock.
//!
//! The reader count is only ever incremented by a thread holding the writer gate, and the
//! decision to take or return the token is made from the value returned by the atomic
//! read-modify-write, never from a separate load. Hence each `0 -> 1` transition takes the token
//! exactly once and each `1 -> 0` transition returns it exactly once, and a take always precedes
//! the return of the same generation because the last reader can only leave after the first one
//! has been admitted.
//!
//! A writer holding the writer gate stops the admission of new readers at once, so it only waits
//! for the readers that were already admitted to drain.

#![deny(unsafe_code)]

use std::fmt;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{AcqRel, Relaxed};
#[cfg(not(feature = "loom"))]
use std::time::Duration;

#[cfg(feature = "loom")]
use loom::sync::atomic::AtomicUsize;
use tracing::trace;

use crate::config::{Config, DefaultConfig};
#[cfg(not(feature = "loom"))]
use crate::slot::{deadline, remaining};
use crate::slot::AdmissionSlot;

/// [`RwLock`] is a writer-preferring reader-writer lock.
///
/// The locking semantics is similar to [`RwLock`](std::sync::RwLock), however, [`RwLock`] only
/// provides low-level locking and unlocking methods, leaving the scope of acquired locks and the
/// resources they protect to the user. Unmatched unlocks are not detected in release builds;
/// they leave the lock unusable for every future caller. Debug builds panic on an
/// [`unlock_shared`](Self::unlock_shared) without a matching shared lock.
///
/// # Examples
///
/// ```
/// use slotsync::RwLock;
/// use std::sync::Arc;
/// use std::thread;
///
/// let lock = Arc::new(RwLock::new());
///
/// lock.lock_shared();
/// let lock_clone = lock.clone();
/// let writer = thread::spawn(move || {
///     lock_clone.lock_exclusive();
///     lock_clone.unlock_exclusive();
/// });
/// lock.unlock_shared();
///
/// writer.join().unwrap();
/// assert_eq!(lock.reader_count(), 0);
/// ```
pub struct RwLock<C: Config = DefaultConfig> {
    /// Number of readers holding the lock.
    reader_count: AtomicUsize,
    /// Held transiently by registering readers and for the whole section by a writer.
    writer_gate: AdmissionSlot<C>,
    /// Holds its token iff no reader and no writer holds the lock. The slot starts full, so
    /// `release` claims the token and `acquire` gives it back.
    no_readers_gate: AdmissionSlot<C>,
}

impl RwLock {
    /// Creates an unlocked [`RwLock`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config()
    }
}

impl<C: Config> RwLock<C> {
    /// Creates an unlocked [`RwLock`] with a custom [`Config`].
    #[must_use]
    pub fn with_config() -> Self {
        Self {
            reader_count: AtomicUsize::new(0),
            writer_gate: AdmissionSlot::new(1),
            no_readers_gate: AdmissionSlot::filled(1),
        }
    }

    /// Returns the number of readers currently holding the lock.
    ///
    /// The result is a snapshot intended for diagnostics.
    #[inline]
    pub fn reader_count(&self) -> usize {
        self.reader_count.load(Relaxed)
    }

    /// Acquires a shared lock, blocking while a writer holds or waits for the lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::RwLock;
    ///
    /// let lock = RwLock::new();
    ///
    /// lock.lock_shared();
    /// lock.lock_shared();
    /// assert_eq!(lock.reader_count(), 2);
    /// assert!(!lock.try_lock_exclusive());
    /// ```
    pub fn lock_shared(&self) {
        self.writer_gate.acquire();
        if self.reader_count.fetch_add(1, AcqRel) == 0 {
            // The first reader claims the token for the whole generation. The last reader of the
            // previous generation may still be returning it.
            self.no_readers_gate.release();
        }
        self.writer_gate.release();
    }

    /// Tries to acquire a shared lock without blocking.
    ///
    /// Returns `false` if a writer holds or waits for the lock, or if another thread is
    /// registering at the same time.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::RwLock;
    ///
    /// let lock = RwLock::new();
    ///
    /// assert!(lock.try_lock_shared());
    /// lock.unlock_shared();
    ///
    /// lock.lock_exclusive();
    /// assert!(!lock.try_lock_shared());
    /// ```
    #[must_use]
    pub fn try_lock_shared(&self) -> bool {
        if !self.writer_gate.try_acquire() {
            return false;
        }
        let admitted = if self.reader_count.fetch_add(1, AcqRel) == 0 {
            if self.no_readers_gate.try_release() {
                true
            } else {
                // The previous generation has not returned the token yet. The count was zero
                // and no other reader can register, so the increment is undone without a
                // token to return.
                self.reader_count.fetch_sub(1, AcqRel);
                false
            }
        } else {
            true
        };
        self.writer_gate.release();
        admitted
    }

    /// Releases a shared lock.
    ///
    /// The last reader to leave lets waiting writers proceed.
    pub fn unlock_shared(&self) {
        let readers = self.reader_count.fetch_sub(1, AcqRel);
        debug_assert_ne!(readers, 0, "unlock_shared without a shared lock");
        if readers == 1 {
            // Give the token back.
            self.no_readers_gate.acquire();
        }
    }

    /// Acquires an exclusive lock.
    ///
    /// New readers are refused as soon as the writer gate is taken; the call then waits for the
    /// readers admitted before it to drain.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::RwLock;
    ///
    /// let lock = RwLock::new();
    ///
    /// lock.lock_exclusive();
    /// assert!(!lock.try_lock_shared());
    /// assert!(!lock.try_lock_exclusive());
    /// lock.unlock_exclusive();
    /// assert!(lock.try_lock_shared());
    /// ```
    pub fn lock_exclusive(&self) {
        self.writer_gate.acquire();
        if !self.no_readers_gate.try_release() {
            trace!(
                readers = self.reader_count.load(Relaxed),
                "writer waiting for readers to drain"
            );
            self.no_readers_gate.release();
        }
    }

    /// Tries to acquire an exclusive lock without blocking.
    #[must_use]
    pub fn try_lock_exclusive(&self) -> bool {
        if !self.writer_gate.try_acquire() {
            return false;
        }
        if self.no_readers_gate.try_release() {
            return true;
        }
        self.writer_gate.release();
        false
    }

    /// Tries to acquire an exclusive lock, giving up after `timeout`.
    ///
    /// If the writer gate is obtained but the readers do not drain in time, the gate is given
    /// back before returning, so readers that queued behind this attempt are admitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::RwLock;
    /// use std::time::Duration;
    ///
    /// let lock = RwLock::new();
    ///
    /// lock.lock_shared();
    /// assert!(!lock.try_lock_exclusive_for(Duration::from_millis(1)));
    /// assert!(lock.try_lock_shared());
    /// ```
    #[cfg(not(feature = "loom"))]
    #[must_use]
    pub fn try_lock_exclusive_for(&self, timeout: Duration) -> bool {
        let until = deadline(timeout);
        if !self.writer_gate.acquire_for(timeout) {
            return false;
        }
        let drained = match remaining(until) {
            Some(left) => self.no_readers_gate.release_for(left),
            None => self.no_readers_gate.try_release(),
        };
        if !drained {
            self.writer_gate.release();
        }
        drained
    }

    /// Releases an exclusive lock.
    pub fn unlock_exclusive(&self) {
        // Give the token back.
        self.no_readers_gate.acquire();
        self.writer_gate.release();
    }
}

impl<C: Config> fmt::Debug for RwLock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("reader_count", &self.reader_count())
            .field("writer_gate", &self.writer_gate)
            .field("no_readers_gate", &self.no_readers_gate)
            .finish()
    }
}

impl Default for RwLock {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
