use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ideaboard::services::TtlCache;
use std::hint::black_box;
use std::time::Duration;

fn filled_cache(size: usize, ttl: Duration) -> TtlCache<String, u64> {
    let cache = TtlCache::new(ttl);
    for i in 0..size {
        cache.set(format!("profile-{i}"), i as u64);
    }
    cache
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_cache/get_hit");
    for size in [100, 10_000] {
        let cache = filled_cache(size, Duration::from_secs(300));
        let key = format!("profile-{}", size / 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), &key, |b, key| {
            b.iter(|| black_box(cache.get(key.as_str())));
        });
    }
    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let cache = filled_cache(1_000, Duration::from_secs(300));
    let mut i = 0u64;
    c.bench_function("ttl_cache/set_overwrite", |b| {
        b.iter(|| {
            i = (i + 1) % 1_000;
            cache.set(format!("profile-{i}"), black_box(i));
        });
    });
}

fn bench_cleanup(c: &mut Criterion) {
    c.bench_function("ttl_cache/cleanup_10k_expired", |b| {
        b.iter_batched(
            || filled_cache(10_000, Duration::ZERO),
            |cache| black_box(cache.cleanup()),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_get_hit, bench_set, bench_cleanup);
criterion_main!(benches);
