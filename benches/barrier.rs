use criterion::{Criterion, criterion_group, criterion_main};
use slotsync::{Barrier, DynamicBarrier};

fn done_sync(c: &mut Criterion) {
    let barrier = Barrier::new(4).unwrap();
    c.bench_function("barrier-done-sync", |b| {
        b.iter(|| {
            for _ in 0..4 {
                barrier.done();
            }
            barrier.sync();
        });
    });
}

fn add_done_sync(c: &mut Criterion) {
    let barrier = DynamicBarrier::new();
    c.bench_function("dynamic-barrier-add-done-sync", |b| {
        b.iter(|| {
            for _ in 0..4 {
                barrier.add();
            }
            for _ in 0..4 {
                barrier.done();
            }
            barrier.sync();
        });
    });
}

criterion_group!(barrier, done_sync, add_done_sync);
criterion_main!(barrier);
