//! Run with: cargo bench --bench parse_log

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gitpulse::classify::Classifier;
use gitpulse::parse::parse_log;

const SUBJECTS: [&str; 6] = [
    "Add blueprint registration hook",
    "Fix session cookie on redirect",
    "Refactor config loading",
    "Update docs for app factory",
    "Bump version to 2.3.1",
    "Merge pull request from contributor",
];

/// `git log --numstat` shaped text with `count` commits of three files each.
fn synthetic_log(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "{i:040x}|Author {}|20{:02}-{:02}-{:02}|{}\n{}\t{}\tsrc/app.py\n{}\t0\ttests/test_{}.py\n-\t-\tdocs/logo.png\n\n",
                i % 50,
                10 + i % 14,
                1 + i % 12,
                1 + i % 28,
                SUBJECTS[i % SUBJECTS.len()],
                i % 40,
                i % 7,
                i % 15,
                i % 9,
            )
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_log");
    for count in [100, 1_000, 10_000] {
        let text = synthetic_log(count);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| parse_log(black_box(text)))
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::default();
    let commits = parse_log(&synthetic_log(5_000)).commits;
    c.bench_function("classify_5000", |b| {
        b.iter(|| {
            let mut batch = commits.clone();
            classifier.apply(black_box(&mut batch));
            batch
        })
    });
}

criterion_group!(benches, bench_parse, bench_classify);
criterion_main!(benches);
