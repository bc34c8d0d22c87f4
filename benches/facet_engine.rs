//! Facet engine benchmarks
//!
//! Measures filtering, option counting and heatmap aggregation over a
//! synthetic dataset the size of a large benchmark history.

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use fio_analytics::aggregation::{aggregate, HeatmapRequest};
use fio_analytics::facet::{compute_filtered, compute_options, compute_options_with_mode};
use fio_analytics::{
    AnalysisCache, BenchmarkRun, Dataset, Dimension, Facet, FacetCountMode, FacetValue,
    FilterState, Metric,
};

const BLOCK_SIZES: [&str; 6] = ["4K", "8K", "16K", "64K", "128K", "1M"];
const PATTERNS: [&str; 4] = ["read", "write", "randread", "randwrite"];
const QUEUE_DEPTHS: [i64; 5] = [1, 4, 16, 32, 64];

fn generate_runs(count: usize) -> Vec<BenchmarkRun> {
    (0..count)
        .map(|i| BenchmarkRun {
            id: i.to_string(),
            timestamp: format!("2025-{:02}-{:02}T12:00:00", i % 12 + 1, i % 28 + 1),
            hostname: Some(format!("server{}", i % 20)),
            protocol: Some(if i % 3 == 0 { "iSCSI" } else { "Local" }.to_string()),
            drive_model: format!("model-{}", i % 7),
            drive_type: if i % 2 == 0 { "NVMe SSD" } else { "SATA SSD" }.to_string(),
            block_size: BLOCK_SIZES[i % BLOCK_SIZES.len()].to_string(),
            read_write_pattern: PATTERNS[i % PATTERNS.len()].to_string(),
            queue_depth: QUEUE_DEPTHS[i % QUEUE_DEPTHS.len()],
            num_jobs: Some((i % 4 + 1) as i64),
            sync: Some((i % 2) as i64),
            direct: Some(1),
            test_size: Some("10G".to_string()),
            duration: 60,
            iops: Some((i % 1000) as f64 * 10.0),
            avg_latency: Some((i % 50) as f64 / 10.0),
            bandwidth: Some((i % 400) as f64),
            p95_latency: None,
            p99_latency: None,
        })
        .collect()
}

fn selective_state() -> FilterState {
    FilterState::new()
        .with_selection(Facet::BlockSize, [FacetValue::from("4K"), FacetValue::from("64K")])
        .with_selection(Facet::QueueDepth, [FacetValue::Int(32)])
}

fn bench_filter_and_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_and_count");

    for size in [1_000usize, 10_000, 50_000] {
        let runs = generate_runs(size);
        let state = selective_state();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("filter", size), &runs, |b, runs| {
            b.iter(|| compute_filtered(black_box(runs), black_box(&state)).len())
        });

        group.bench_with_input(BenchmarkId::new("options_unfiltered", size), &runs, |b, runs| {
            let refs: Vec<&BenchmarkRun> = runs.iter().collect();
            b.iter(|| compute_options(black_box(&refs)))
        });

        group.bench_with_input(
            BenchmarkId::new("options_exclude_self", size),
            &runs,
            |b, runs| {
                b.iter(|| {
                    compute_options_with_mode(black_box(runs), &state, FacetCountMode::ExcludeSelf)
                })
            },
        );
    }

    group.finish();
}

fn bench_heatmap(c: &mut Criterion) {
    let runs = generate_runs(50_000);
    let refs: Vec<&BenchmarkRun> = runs.iter().collect();
    let request =
        HeatmapRequest::matrix(Dimension::HostDrive, Dimension::Configuration, Metric::Iops);

    c.bench_function("heatmap_matrix_50k", |b| {
        b.iter(|| aggregate(black_box(&refs), black_box(&request)).cells.len())
    });
}

fn bench_cache(c: &mut Criterion) {
    let dataset = Dataset::new(generate_runs(50_000));
    let cache = AnalysisCache::new(16);
    let state = selective_state();
    cache.get_or_compute(&dataset, &state, FacetCountMode::Inclusive);

    c.bench_function("cache_hit_50k", |b| {
        b.iter(|| {
            cache.get_or_compute(
                black_box(&dataset),
                black_box(&state),
                FacetCountMode::Inclusive,
            )
        })
    });
}

criterion_group!(benches, bench_filter_and_count, bench_heatmap, bench_cache);
criterion_main!(benches);
