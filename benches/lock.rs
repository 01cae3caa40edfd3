use criterion::{Criterion, criterion_group, criterion_main};
use slotsync::{Mutex, RwLock};

fn mutex_lock_unlock(c: &mut Criterion) {
    let mutex = Mutex::new();
    c.bench_function("mutex-lock-unlock", |b| {
        b.iter(|| {
            mutex.lock();
            mutex.unlock();
        });
    });
}

fn exclusive_unlock(c: &mut Criterion) {
    let lock = RwLock::new();
    c.bench_function("rwlock-exclusive-unlock", |b| {
        b.iter(|| {
            lock.lock_exclusive();
            lock.unlock_exclusive();
        });
    });
}

fn shared_shared_unlock_unlock(c: &mut Criterion) {
    let lock = RwLock::new();
    c.bench_function("rwlock-shared-shared-unlock-unlock", |b| {
        b.iter(|| {
            lock.lock_shared();
            lock.lock_shared();
            lock.unlock_shared();
            lock.unlock_shared();
        });
    });
}

criterion_group!(
    lock,
    mutex_lock_unlock,
    exclusive_unlock,
    shared_shared_unlock_unlock
);
criterion_main!(lock);
