use std::sync::Arc;
use std::sync::atomic::Ordering::Relaxed;

use loom::sync::atomic::{AtomicBool, AtomicUsize};
use loom::thread::spawn;

use crate::{Barrier, DynamicBarrier, Mutex, RwLock, Semaphore};

#[test]
fn mutex_exclusive() {
    loom::model(|| {
        let mutex = Arc::new(Mutex::new());
        let check = Arc::new(AtomicBool::new(false));

        mutex.lock();

        let mutex_clone = mutex.clone();
        let check_clone = check.clone();
        let thread = spawn(move || {
            mutex_clone.lock();
            assert!(check_clone.load(Relaxed));
            mutex_clone.unlock();
        });

        check.store(true, Relaxed);
        mutex.unlock();
        assert!(thread.join().is_ok());
    });
}

#[test]
fn semaphore_release_acquire() {
    loom::model(|| {
        let semaphore = Arc::new(Semaphore::new(2).unwrap());
        let check = Arc::new(AtomicBool::new(false));

        semaphore.acquire();
        semaphore.acquire();
        assert!(!semaphore.try_acquire());

        let semaphore_clone = semaphore.clone();
        let check_clone = check.clone();
        let thread = spawn(move || {
            semaphore_clone.acquire();
            assert!(check_clone.load(Relaxed));
            semaphore_clone.release();
        });

        check.store(true, Relaxed);
        semaphore.release();
        assert!(thread.join().is_ok());
        semaphore.release();
    });
}

#[test]
fn rwlock_shared_after_exclusive() {
    loom::model(|| {
        let lock = Arc::new(RwLock::new());
        let check = Arc::new(AtomicBool::new(false));

        lock.lock_exclusive();

        let lock_clone = lock.clone();
        let check_clone = check.clone();
        let thread = spawn(move || {
            lock_clone.lock_shared();
            assert!(check_clone.load(Relaxed));
            lock_clone.unlock_shared();
        });

        check.store(true, Relaxed);
        lock.unlock_exclusive();
        assert!(thread.join().is_ok());
    });
}

#[test]
fn rwlock_exclusive_after_shared() {
    loom::model(|| {
        let lock = Arc::new(RwLock::new());
        let check = Arc::new(AtomicBool::new(false));

        lock.lock_shared();

        let lock_clone = lock.clone();
        let check_clone = check.clone();
        let thread = spawn(move || {
            lock_clone.lock_exclusive();
            assert!(check_clone.load(Relaxed));
            lock_clone.unlock_exclusive();
        });

        check.store(true, Relaxed);
        lock.unlock_shared();
        assert!(thread.join().is_ok());
    });
}

#[test]
fn rwlock_reader_generations() {
    // A reader leaving while another registers must not leave the no-readers token behind.
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        let lock = Arc::new(RwLock::new());
        let check = Arc::new(AtomicUsize::new(0));

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let lock = lock.clone();
                let check = check.clone();
                spawn(move || {
                    lock.lock_shared();
                    assert_ne!(check.fetch_add(1, Relaxed), usize::MAX);
                    check.fetch_sub(1, Relaxed);
                    lock.unlock_shared();
                })
            })
            .collect();

        lock.lock_exclusive();
        assert_eq!(check.fetch_add(usize::MAX, Relaxed), 0);
        check.fetch_sub(usize::MAX, Relaxed);
        lock.unlock_exclusive();

        for reader in readers {
            assert!(reader.join().is_ok());
        }
        assert_eq!(lock.reader_count(), 0);
    });
}

#[test]
fn barrier_sync() {
    loom::model(|| {
        let barrier = Arc::new(Barrier::new(2).unwrap());
        let finished = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let barrier = barrier.clone();
                let finished = finished.clone();
                spawn(move || {
                    finished.fetch_add(1, Relaxed);
                    barrier.done();
                })
            })
            .collect();

        barrier.sync();
        assert_eq!(finished.load(Relaxed), 2);
        for worker in workers {
            assert!(worker.join().is_ok());
        }
    });
}

#[test]
fn dynamic_barrier_sync() {
    loom::model(|| {
        let barrier = Arc::new(DynamicBarrier::new());
        let check = Arc::new(AtomicBool::new(false));

        barrier.add();

        let barrier_clone = barrier.clone();
        let check_clone = check.clone();
        let thread = spawn(move || {
            check_clone.store(true, Relaxed);
            barrier_clone.done();
        });

        barrier.sync();
        assert!(check.load(Relaxed));
        assert!(thread.join().is_ok());
    });
}
