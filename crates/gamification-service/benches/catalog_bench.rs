//! 徽章目录评估性能基准测试
//!
//! 测试覆盖：
//! - 单个条件判定
//! - 全目录评估（不同已获得徽章数量）
//! - 自定义大目录评估

use std::collections::HashSet;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gamification::{ActivityType, BadgeCatalog, BadgeCriteria, BadgeDefinition, UserProgress};

/// 活跃用户的典型进度
fn active_progress() -> UserProgress {
    UserProgress {
        reviewed_count: 42,
        balance: 780,
        quantity_by_type: [
            (ActivityType::Recycling, 63.5),
            (ActivityType::TreePlanting, 4.0),
            (ActivityType::Composting, 18.0),
            (ActivityType::Cleanup, 7.0),
        ]
        .into_iter()
        .collect(),
    }
}

/// 构造指定大小的目录，条件类型轮换
fn synthetic_catalog(size: usize) -> BadgeCatalog {
    let definitions = (0..size)
        .map(|i| {
            let criteria = match i % 3 {
                0 => BadgeCriteria::ActivityCount {
                    threshold: (i as i64 % 100) + 1,
                },
                1 => BadgeCriteria::TotalPoints {
                    threshold: (i as i64 % 50) * 100,
                },
                _ => BadgeCriteria::SpecificActivityTypeCount {
                    activity_type: ActivityType::ALL[i % ActivityType::ALL.len()],
                    threshold: (i % 40) as f64,
                },
            };
            BadgeDefinition {
                id: i as i64 + 1,
                code: "SYNTHETIC",
                name: "Sintética",
                description: "Insignia de prueba",
                criteria,
            }
        })
        .collect();
    BadgeCatalog::new(definitions)
}

fn bench_single_criteria(c: &mut Criterion) {
    let progress = active_progress();
    let mut group = c.benchmark_group("single_criteria");

    let cases = [
        ("activity_count", BadgeCriteria::ActivityCount { threshold: 10 }),
        ("total_points", BadgeCriteria::TotalPoints { threshold: 500 }),
        (
            "activity_type_quantity",
            BadgeCriteria::SpecificActivityTypeCount {
                activity_type: ActivityType::Recycling,
                threshold: 50.0,
            },
        ),
    ];

    for (name, criteria) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(&criteria).is_satisfied(black_box(&progress)))
        });
    }

    group.finish();
}

fn bench_standard_catalog(c: &mut Criterion) {
    let catalog = BadgeCatalog::standard();
    let progress = active_progress();
    let mut group = c.benchmark_group("standard_catalog");

    for obtained_count in [0usize, 4, 8] {
        let obtained: HashSet<i64> = catalog
            .definitions()
            .iter()
            .take(obtained_count)
            .map(|def| def.id)
            .collect();

        group.bench_with_input(
            BenchmarkId::new("newly_satisfied", obtained_count),
            &obtained,
            |b, obtained| {
                b.iter(|| catalog.newly_satisfied(black_box(&progress), black_box(obtained)))
            },
        );
    }

    group.finish();
}

fn bench_large_catalog(c: &mut Criterion) {
    let progress = active_progress();
    let obtained = HashSet::new();
    let mut group = c.benchmark_group("large_catalog");

    for size in [50usize, 500, 5000] {
        let catalog = synthetic_catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| catalog.newly_satisfied(black_box(&progress), black_box(&obtained)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_criteria,
    bench_standard_catalog,
    bench_large_catalog
);
criterion_main!(benches);
