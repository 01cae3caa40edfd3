//! [`AdmissionSlot`] is the bounded handoff every slot-based primitive is built from.
//!
//! Acquiring a slot deposits a unit token into a bounded buffer and blocks while the buffer is
//! full; releasing a slot takes a token out and blocks while the buffer is empty. Occupancy is
//! the number of buffered tokens and never exceeds the capacity.

use std::fmt;
use std::marker::PhantomData;
#[cfg(not(feature = "loom"))]
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::{Config, DefaultConfig};

/// Bounded handoff of unit tokens.
pub(crate) struct AdmissionSlot<C: Config = DefaultConfig> {
    /// Maximum number of buffered tokens.
    capacity: usize,
    /// Token buffer.
    backing: Backing,
    _config: PhantomData<fn() -> C>,
}

impl<C: Config> AdmissionSlot<C> {
    /// Creates an empty slot.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            backing: Backing::new(capacity, 0),
            _config: PhantomData,
        }
    }

    /// Creates a slot whose every position is already occupied.
    pub(crate) fn filled(capacity: usize) -> Self {
        Self {
            capacity,
            backing: Backing::new(capacity, capacity),
            _config: PhantomData,
        }
    }

    /// Returns the capacity of the slot.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of buffered tokens.
    ///
    /// The value is a snapshot and may be stale as soon as it is returned.
    #[inline]
    pub(crate) fn occupancy(&self) -> usize {
        self.backing.len()
    }

    /// Deposits a token, blocking while the slot is full.
    pub(crate) fn acquire(&self) {
        for spin in 0..C::spin_count() {
            if self.backing.try_push() {
                return;
            }
            C::backoff(spin);
        }
        trace!(capacity = self.capacity, "admission slot full, blocking");
        self.backing.push();
    }

    /// Deposits a token if the slot is not full.
    #[inline]
    pub(crate) fn try_acquire(&self) -> bool {
        self.backing.try_push()
    }

    /// Deposits a token, giving up once `timeout` has elapsed.
    #[cfg(not(feature = "loom"))]
    pub(crate) fn acquire_for(&self, timeout: Duration) -> bool {
        self.backing.try_push() || self.backing.push_timeout(timeout)
    }

    /// Takes a token out, blocking while the slot is empty.
    pub(crate) fn release(&self) {
        if self.backing.try_pop() {
            return;
        }
        trace!(capacity = self.capacity, "admission slot empty, blocking");
        self.backing.pop();
    }

    /// Takes a token out if there is one.
    #[inline]
    pub(crate) fn try_release(&self) -> bool {
        self.backing.try_pop()
    }

    /// Takes a token out, giving up once `timeout` has elapsed.
    #[cfg(not(feature = "loom"))]
    pub(crate) fn release_for(&self, timeout: Duration) -> bool {
        self.backing.try_pop() || self.backing.pop_timeout(timeout)
    }
}

impl<C: Config> fmt::Debug for AdmissionSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionSlot")
            .field("capacity", &self.capacity)
            .field("occupancy", &self.occupancy())
            .finish()
    }
}

/// Converts a timeout into a deadline; `None` stands for a deadline too far to represent.
#[cfg(not(feature = "loom"))]
#[inline]
pub(crate) fn deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Returns the time left until `deadline`, or `None` if it has passed.
#[cfg(not(feature = "loom"))]
#[inline]
pub(crate) fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    let Some(deadline) = deadline else {
        return Some(Duration::MAX);
    };
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
}

/// Token buffer backed by a bounded channel.
#[cfg(not(feature = "loom"))]
struct Backing {
    sender: crossbeam_channel::Sender<()>,
    receiver: crossbeam_channel::Receiver<()>,
}

#[cfg(not(feature = "loom"))]
impl Backing {
    fn new(capacity: usize, occupied: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        for _ in 0..occupied {
            let result = sender.try_send(());
            debug_assert!(result.is_ok());
        }
        Self { sender, receiver }
    }

    #[inline]
    fn len(&self) -> usize {
        self.sender.len()
    }

    // Both ends live in `self`, so the channel can never be disconnected: the only possible send
    // and receive failures are `Full`, `Empty`, and `Timeout`.

    fn push(&self) {
        let result = self.sender.send(());
        debug_assert!(result.is_ok());
    }

    #[inline]
    fn try_push(&self) -> bool {
        self.sender.try_send(()).is_ok()
    }

    fn push_timeout(&self, timeout: Duration) -> bool {
        self.sender.send_timeout((), timeout).is_ok()
    }

    fn pop(&self) {
        let result = self.receiver.recv();
        debug_assert!(result.is_ok());
    }

    #[inline]
    fn try_pop(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    fn pop_timeout(&self, timeout: Duration) -> bool {
        self.receiver.recv_timeout(timeout).is_ok()
    }
}

/// Token buffer modeled with loom primitives.
#[cfg(feature = "loom")]
struct Backing {
    capacity: usize,
    occupancy: loom::sync::Mutex<usize>,
    changed: loom::sync::Condvar,
}

#[cfg(feature = "loom")]
impl Backing {
    fn new(capacity: usize, occupied: usize) -> Self {
        Self {
            capacity,
            occupancy: loom::sync::Mutex::new(occupied),
            changed: loom::sync::Condvar::new(),
        }
    }

    fn occupancy(&self) -> loom::sync::MutexGuard<'_, usize> {
        self.occupancy
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn len(&self) -> usize {
        *self.occupancy()
    }

    fn push(&self) {
        let mut occupancy = self.occupancy();
        while *occupancy >= self.capacity {
            occupancy = self
                .changed
                .wait(occupancy)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *occupancy += 1;
        self.changed.notify_all();
    }

    fn try_push(&self) -> bool {
        let mut occupancy = self.occupancy();
        if *occupancy >= self.capacity {
            return false;
        }
        *occupancy += 1;
        self.changed.notify_all();
        true
    }

    fn pop(&self) {
        let mut occupancy = self.occupancy();
        while *occupancy == 0 {
            occupancy = self
                .changed
                .wait(occupancy)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *occupancy -= 1;
        self.changed.notify_all();
    }

    fn try_pop(&self) -> bool {
        let mut occupancy = self.occupancy();
        if *occupancy == 0 {
            return false;
        }
        *occupancy -= 1;
        self.changed.notify_all();
        true
    }
}
