//! Benchmark the prepared-statement cache and statement rendering.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tagorm::statement::{self, Statement};
use tagorm::{Condition, Postgres, StatementCache, cond};

fn make_key(i: usize) -> String {
    format!("SELECT * FROM table_{i} WHERE id = $1 AND status = $2")
}

fn filled(capacity: usize, count: usize) -> StatementCache<u64> {
    let mut cache = StatementCache::new(capacity, true);
    for i in 0..count {
        cache.add(make_key(i), i as u64);
    }
    cache
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("stmt_cache/hit");

    for capacity in [64, 256, 1024] {
        let mut cache = filled(capacity, capacity);
        let hit_key = make_key(capacity / 2);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &hit_key, |b, key| {
            b.iter(|| black_box(cache.get(key)));
        });
    }

    group.finish();
}

fn bench_cache_miss_and_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("stmt_cache/miss_evict");

    for capacity in [64, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &cap| {
                let mut cache = filled(cap, cap);
                let mut counter = cap;
                b.iter(|| {
                    counter += 1;
                    black_box(cache.add(make_key(counter), counter as u64));
                });
            },
        );
    }

    group.finish();
}

fn bench_cache_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("stmt_cache/mixed");

    for capacity in [64, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &cap| {
                let prefill = cap * 4 / 5;
                let mut cache = filled(cap, prefill);
                let mut counter = 0usize;
                b.iter(|| {
                    counter += 1;
                    if counter % 5 == 0 {
                        black_box(cache.add(make_key(cap + counter), counter as u64));
                    } else {
                        black_box(cache.get(&make_key(counter % prefill)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_render_select(c: &mut Criterion) {
    let ids: Vec<i64> = (0..32).collect();
    c.bench_function("statement/render_select", |b| {
        b.iter(|| {
            let query = statement::select()
                .columns(&["\"id\"", "\"title\"", "\"version\""])
                .from("books")
                .filter(Condition::and([
                    cond!("\"id\" IN (?)", ids.clone()),
                    Condition::or([
                        Condition::like("\"title\"", "D%"),
                        Condition::is_null("\"title\""),
                    ]),
                ]))
                .order_by("\"id\"")
                .limit(50);
            black_box(query.render(&Postgres))
        });
    });
}

criterion_group!(
    benches,
    bench_cache_hit,
    bench_cache_miss_and_evict,
    bench_cache_mixed_workload,
    bench_render_select
);
criterion_main!(benches);
