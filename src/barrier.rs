//! [`Barrier`] and [`DynamicBarrier`] let a coordinating thread wait for a cohort of workers to
//! finish.

use std::fmt;
use std::sync::PoisonError;
#[cfg(not(feature = "loom"))]
use std::sync::{Condvar, Mutex};
#[cfg(not(feature = "loom"))]
use std::time::Duration;

#[cfg(feature = "loom")]
use loom::sync::{Condvar, Mutex};
use tracing::trace;

use crate::Error;
use crate::config::{Config, DefaultConfig};
#[cfg(not(feature = "loom"))]
use crate::slot::{deadline, remaining};
use crate::slot::AdmissionSlot;

/// [`Barrier`] waits for a fixed number of [`done`](Self::done) signals.
///
/// Signals are buffered in an admission slot whose capacity is the number of participants, so
/// workers never wait for the coordinator unless more signals are outstanding than there are
/// participants. A round ends when [`sync`](Self::sync) has consumed one signal per participant;
/// the barrier can be reused if exactly that many new signals arrive before the next
/// [`sync`](Self::sync).
///
/// # Examples
///
/// ```
/// use slotsync::Barrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(Barrier::new(4).unwrap());
///
/// let workers: Vec<_> = (0..4)
///     .map(|_| {
///         let barrier = barrier.clone();
///         thread::spawn(move || barrier.done())
///     })
///     .collect();
///
/// barrier.sync();
/// for worker in workers {
///     worker.join().unwrap();
/// }
/// ```
pub struct Barrier<C: Config = DefaultConfig> {
    signals: AdmissionSlot<C>,
}

impl Barrier {
    /// Creates a [`Barrier`] for `participants` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroParticipants`] if `participants` is `0`, or
    /// [`Error::CapacityOverflow`] if it exceeds [`Semaphore::MAX_PERMITS`](crate::Semaphore::MAX_PERMITS).
    #[inline]
    pub fn new(participants: usize) -> Result<Self, Error> {
        Self::with_config(participants)
    }
}

impl<C: Config> Barrier<C> {
    /// Creates a [`Barrier`] for `participants` workers with a custom [`Config`].
    ///
    /// # Errors
    ///
    /// See [`Barrier::new`].
    pub fn with_config(participants: usize) -> Result<Self, Error> {
        if participants == 0 {
            return Err(Error::ZeroParticipants);
        }
        let max = <crate::Semaphore>::MAX_PERMITS;
        if participants > max {
            return Err(Error::CapacityOverflow {
                requested: participants,
                max,
            });
        }
        Ok(Self {
            signals: AdmissionSlot::new(participants),
        })
    }

    /// Returns the number of participants per round.
    #[inline]
    pub fn participants(&self) -> usize {
        self.signals.capacity()
    }

    /// Signals that one participant has finished.
    #[inline]
    pub fn done(&self) {
        self.signals.acquire();
    }

    /// Blocks until every participant has signaled.
    ///
    /// If fewer signals than participants are ever issued, this never returns.
    pub fn sync(&self) {
        trace!(participants = self.participants(), "waiting for barrier");
        for _ in 0..self.participants() {
            self.signals.release();
        }
    }

    /// Blocks until every participant has signaled, giving up after `timeout`.
    ///
    /// Signals consumed by an attempt that times out are put back, so a later call still sees
    /// them.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::Barrier;
    /// use std::time::Duration;
    ///
    /// let barrier = Barrier::new(2).unwrap();
    ///
    /// barrier.done();
    /// assert!(!barrier.sync_for(Duration::from_millis(1)));
    ///
    /// barrier.done();
    /// assert!(barrier.sync_for(Duration::from_millis(1)));
    /// ```
    #[cfg(not(feature = "loom"))]
    #[must_use]
    pub fn sync_for(&self, timeout: Duration) -> bool {
        let until = deadline(timeout);
        let mut consumed = 0;
        while consumed < self.participants() {
            let received = match remaining(until) {
                Some(left) => self.signals.release_for(left),
                None => self.signals.try_release(),
            };
            if !received {
                for _ in 0..consumed {
                    self.signals.acquire();
                }
                return false;
            }
            consumed += 1;
        }
        true
    }
}

impl<C: Config> fmt::Debug for Barrier<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Barrier")
            .field("participants", &self.participants())
            .field("signaled", &self.signals.occupancy())
            .finish()
    }
}

/// [`DynamicBarrier`] waits for a cohort whose size is registered with [`add`](Self::add).
///
/// Every [`add`](Self::add) must precede the matching [`done`](Self::done), and all registrations
/// of a round should happen before [`sync`](Self::sync) is called for it. The barrier is reusable:
/// once the pending count drops to zero, a new round starts with the next [`add`](Self::add).
///
/// # Examples
///
/// ```
/// use slotsync::DynamicBarrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(DynamicBarrier::new());
///
/// for _round in 0..2 {
///     let workers: Vec<_> = (0..3)
///         .map(|_| {
///             barrier.add();
///             let barrier = barrier.clone();
///             thread::spawn(move || barrier.done())
///         })
///         .collect();
///
///     barrier.sync();
///     assert!(barrier.pending() <= 0);
///     for worker in workers {
///         worker.join().unwrap();
///     }
/// }
/// ```
pub struct DynamicBarrier {
    /// Registered participants that have not signaled yet.
    pending: Mutex<isize>,
    /// Broadcast when `pending` drops to zero or below.
    drained: Condvar,
}

impl DynamicBarrier {
    /// Creates a [`DynamicBarrier`] with no registered participants.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    /// Returns the number of participants that have not signaled yet.
    ///
    /// The value is negative if [`done`](Self::done) was called more often than
    /// [`add`](Self::add).
    pub fn pending(&self) -> isize {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one more participant.
    pub fn add(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    /// Signals that one participant has finished.
    ///
    /// The participant that brings the pending count to zero wakes every waiting thread.
    pub fn done(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending -= 1;
        if *pending <= 0 {
            self.drained.notify_all();
        }
    }

    /// Blocks until every registered participant has signaled.
    ///
    /// Returns at once if no participant is pending.
    pub fn sync(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if *pending > 0 {
            trace!(pending = *pending, "waiting for dynamic barrier");
        }
        while *pending > 0 {
            pending = self
                .drained
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until every registered participant has signaled, giving up after `timeout`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slotsync::DynamicBarrier;
    /// use std::time::Duration;
    ///
    /// let barrier = DynamicBarrier::new();
    ///
    /// barrier.add();
    /// assert!(!barrier.sync_for(Duration::from_millis(1)));
    /// barrier.done();
    /// assert!(barrier.sync_for(Duration::from_millis(1)));
    /// ```
    #[cfg(not(feature = "loom"))]
    #[must_use]
    pub fn sync_for(&self, timeout: Duration) -> bool {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let (pending, _) = self
            .drained
            .wait_timeout_while(pending, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *pending <= 0
    }
}

impl fmt::Debug for DynamicBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicBarrier")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for DynamicBarrier {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
