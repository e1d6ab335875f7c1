use adaptive_hashtable::HashTable;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

// Every key collides: measures tree-bucket cost against chain scans.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("table::insert_fresh_100k", |b| {
        b.iter_batched(
            HashTable::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_reserved_100k(c: &mut Criterion) {
    c.bench_function("table::insert_reserved_100k", |b| {
        b.iter_batched(
            || {
                let mut m = HashTable::<String, u64>::new();
                m.reserve(100_000);
                m
            },
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup_hit_miss(c: &mut Criterion) {
    let mut m = HashTable::<String, u64>::new();
    let keys: Vec<String> = lcg(5).take(100_000).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.insert(k.clone(), i as u64);
    }
    let misses: Vec<String> = lcg(6).take(10_000).map(key).collect();
    c.bench_function("table::peek_hit_10k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for k in keys.iter().take(10_000) {
                sum = sum.wrapping_add(*m.peek(k.as_str()).unwrap());
            }
            black_box(sum)
        })
    });
    c.bench_function("table::peek_miss_10k", |b| {
        b.iter(|| {
            let mut n = 0usize;
            for k in &misses {
                n += m.contains_key(k.as_str()) as usize;
            }
            black_box(n)
        })
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("table::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut m = HashTable::<String, u64>::new();
                let keys: Vec<String> = lcg(7).take(110_000).map(key).collect();
                for (i, k) in keys.iter().enumerate() {
                    m.insert(k.clone(), i as u64);
                }
                let victims: Vec<String> = keys.into_iter().step_by(11).take(10_000).collect();
                (m, victims)
            },
            |(mut m, victims)| {
                for k in &victims {
                    black_box(m.remove(k.as_str()));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_collisions_1k(c: &mut Criterion) {
    c.bench_function("table::colliding_insert_lookup_1k", |b| {
        b.iter_batched(
            || HashTable::<u64, u64, ConstBuildHasher>::with_hasher(ConstBuildHasher),
            |mut m| {
                for x in lcg(9).take(1_000) {
                    m.insert(x, x);
                }
                for x in lcg(9).take(1_000) {
                    black_box(m.peek(&x));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("table::colliding_ordered_insert_lookup_1k", |b| {
        b.iter_batched(
            || HashTable::<u64, u64, ConstBuildHasher>::with_hasher(ConstBuildHasher).with_key_order(),
            |mut m| {
                for x in lcg(9).take(1_000) {
                    m.insert(x, x);
                }
                for x in lcg(9).take(1_000) {
                    black_box(m.peek(&x));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_reserved_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_lookup_hit_miss,
              bench_remove_random_10k,
              bench_collisions_1k
}
criterion_main!(benches_insert, benches_ops);
