// Criterion benchmarks for the marketplace core

use casting_hub::core::{build_model_query, cover_changes, plan_reorder};
use casting_hub::models::{ModelSearchQuery, PortfolioImage};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

fn portfolio(n: usize) -> Vec<PortfolioImage> {
    let model_id = Uuid::new_v4();
    (0..n)
        .map(|i| PortfolioImage {
            id: Uuid::new_v4(),
            model_id,
            url: format!("https://cdn.test/{}.jpg", i),
            caption: None,
            position: i as i32,
            is_cover: i == 0,
            created_at: None,
        })
        .collect()
}

fn bench_plan_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_reorder");

    for size in [10usize, 50, 200] {
        let images = portfolio(size);
        // Reverse order moves every row
        let order: Vec<Uuid> = images.iter().rev().map(|i| i.id).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| plan_reorder(black_box(&images), black_box(&order)));
        });
    }

    group.finish();
}

fn bench_cover_changes(c: &mut Criterion) {
    let images = portfolio(200);
    let target = images[150].id;

    c.bench_function("cover_changes_200", |b| {
        b.iter(|| cover_changes(black_box(&images), black_box(Some(target))));
    });
}

fn bench_build_model_query(c: &mut Criterion) {
    let search = ModelSearchQuery {
        city: Some("Mumbai".to_string()),
        gender: Some("female".to_string()),
        min_height_cm: Some(170),
        max_height_cm: Some(185),
        available_only: Some(true),
        limit: Some(48),
        ..Default::default()
    };

    c.bench_function("build_model_query", |b| {
        b.iter(|| build_model_query(black_box(&search)).to_query_string());
    });
}

criterion_group!(benches, bench_plan_reorder, bench_cover_changes, bench_build_model_query);
criterion_main!(benches);
