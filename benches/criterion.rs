use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use item_catalog::feature::item::{item_query::ItemFilter, item_repository::Item};
use uuid::Uuid;

fn items(n: usize) -> Vec<Item> {
    let now = Utc::now();
    (0..n)
        .map(|i| Item {
            id: Uuid::new_v4(),
            title: format!("Item {i}"),
            description: (i % 3 == 0).then(|| format!("A red item, number {i}")),
            image: None,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn filter_benchmark(c: &mut Criterion) {
    let items = items(1000);
    let filter = ItemFilter::new("RED").expect("non-blank filter");
    c.bench_function("filter 1000 items", |b| {
        b.iter(|| {
            black_box(&items)
                .iter()
                .filter(|item| filter.matches(item))
                .count()
        })
    });
}

criterion_group!(benches, filter_benchmark);
criterion_main!(benches);
