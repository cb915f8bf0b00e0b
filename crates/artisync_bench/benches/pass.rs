//! Full reconciliation pass benchmarks.

use artisync_bench::scripted_files;
use artisync_core::FileStore;
use artisync_testkit::{init_tracing, ScriptedSynchronizer, TestFamily};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tempfile::TempDir;

fn family(count: usize, jobs: Arc<ScriptedSynchronizer>) -> TestFamily {
    let family = TestFamily::new("bench").with_synchronizer(0, jobs);
    for (i, artifacts) in scripted_files(count, count / 10 + 1).iter().enumerate() {
        family.put_artifacts(&format!("/f{i}.job"), artifacts);
    }
    family
}

/// Benchmark a first pass that creates every artifact.
fn bench_first_pass(c: &mut Criterion) {
    init_tracing();
    let mut group = c.benchmark_group("first_pass");
    group.sample_size(20);

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || family(count, ScriptedSynchronizer::new("job", "job")).driver(),
                |driver| black_box(driver.synchronize()),
                criterion::BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

/// Benchmark a pass over an unchanged source.
fn bench_idle_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("idle_pass");

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let driver = family(count, ScriptedSynchronizer::new("job", "job")).driver();
            driver.synchronize();
            b.iter(|| black_box(driver.synchronize()));
        });
    }

    group.finish();
}

/// Benchmark a first pass persisting into a file store.
fn bench_file_store_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_store_pass");
    group.sample_size(10);

    group.bench_function("100", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let store = Arc::new(FileStore::open(dir.path().join("jobs.cbor")).unwrap());
                let jobs = ScriptedSynchronizer::with_store("job", "job", store);
                (dir, family(100, jobs).driver())
            },
            |(_dir, driver)| black_box(driver.synchronize()),
            criterion::BatchSize::PerIteration,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_first_pass, bench_idle_pass, bench_file_store_pass);
criterion_main!(benches);
