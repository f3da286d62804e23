//! Basic benchmarks for the `shared_vec` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use shared_vec::SharedVec;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = u64;
const TEST_VALUE: TestItem = 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("shared_vec_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SharedVec::<TestItem>::new()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("first_push");
    group.bench_function("first_push", |b| {
        b.iter_custom(|iters| {
            let mut vecs = iter::repeat_with(SharedVec::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                vec.push(black_box(TEST_VALUE));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("push_into_capacity");
    group.bench_function("push_into_capacity", |b| {
        b.iter_custom(|iters| {
            let mut vecs = iter::repeat_with(|| SharedVec::<TestItem>::with_capacity(1))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                vec.push(black_box(TEST_VALUE));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("clone_handle");
    group.bench_function("clone_handle", |b| {
        b.iter_custom(|iters| {
            let mut source = SharedVec::with_capacity(10);
            for _ in 0..10 {
                source.push(TEST_VALUE);
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(source.clone()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("grow_doubling");
    group.bench_function("grow_doubling", |b| {
        b.iter_custom(|iters| {
            let mut vecs = iter::repeat_with(|| {
                let mut vec = SharedVec::with_capacity(10);
                for _ in 0..10 {
                    vec.push(TEST_VALUE);
                }
                vec
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                // The handle is full, so this push clones into a new buffer.
                vec.push(black_box(TEST_VALUE));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("clear_sole_owner");
    group.bench_function("clear_sole_owner", |b| {
        b.iter_custom(|iters| {
            let mut vecs = iter::repeat_with(|| {
                let mut vec = SharedVec::with_capacity(10);
                for _ in 0..10 {
                    vec.push(TEST_VALUE);
                }
                vec
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                vec.clear();
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
