//! Performance benchmarks for tether-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use tether_engine::{diff, CacheSnapshot, Element, Field, Filter, Predicate, Sorter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: Option<u64>,
    name: String,
    age: u32,
}

impl Element for User {
    type Id = u64;

    fn id(&self) -> Option<u64> {
        self.id
    }
}

fn users(size: usize) -> Vec<User> {
    (0..size as u64)
        .map(|i| User {
            id: Some(i + 1),
            name: format!("User {}", (i * 7919) % size as u64),
            age: (i % 80) as u32,
        })
        .collect()
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for size in [10, 100, 500].iter() {
        let old = users(*size);

        // Every tenth element edited, one removed, one appended.
        let mut edited = old.clone();
        for user in edited.iter_mut().step_by(10) {
            user.age += 1;
        }
        edited.remove(size / 2);
        edited.push(User {
            id: None,
            name: "New User".into(),
            age: 30,
        });

        group.bench_with_input(BenchmarkId::new("mixed", size), size, |b, _| {
            b.iter(|| diff(black_box(&old), black_box(&edited)))
        });

        let mut reversed = old.clone();
        reversed.reverse();
        group.bench_with_input(BenchmarkId::new("reverse", size), size, |b, _| {
            b.iter(|| diff(black_box(&old), black_box(&reversed)))
        });

        let changes = diff(&old, &edited);
        group.bench_with_input(BenchmarkId::new("apply", size), size, |b, _| {
            b.iter(|| changes.apply(black_box(&old)))
        });
    }

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    let age = Field::new("age", |u: &User| u.age);
    let name = Field::new("name", |u: &User| u.name.clone());

    for size in [100, 1000].iter() {
        let elements = users(*size);

        let filter = Filter::new(vec![
            Predicate::gte(age.clone(), 18),
            Predicate::lte(age.clone(), 65),
        ]);
        group.bench_with_input(BenchmarkId::new("filter", size), size, |b, _| {
            b.iter(|| {
                let mut elements = elements.clone();
                filter.apply(black_box(&mut elements));
                elements
            })
        });

        let sorter = Sorter::ascending(name.clone());
        group.bench_with_input(BenchmarkId::new("sort", size), size, |b, _| {
            b.iter(|| {
                let mut elements = elements.clone();
                sorter.apply(black_box(&mut elements));
                elements
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for size in [100, 1000].iter() {
        let snapshot = CacheSnapshot::new("User@https://example.com/users", users(*size));
        let json = snapshot.to_json().unwrap_or_default();

        group.bench_with_input(BenchmarkId::new("to_json", size), size, |b, _| {
            b.iter(|| black_box(&snapshot).to_json())
        });

        group.bench_with_input(BenchmarkId::new("from_json", size), size, |b, _| {
            b.iter(|| CacheSnapshot::<User>::from_json(black_box(&json)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_strategies, bench_snapshot);
criterion_main!(benches);
