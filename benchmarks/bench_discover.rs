use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use sequence::{discover, AnalyzerConfig, InputFormat, Parser, Scanner};

fn fixture(lines: usize) -> Vec<String> {
    (0..lines)
        .map(|i| match i % 3 {
            0 => format!(
                "Jan 12 06:49:{:02} host{} sshd[{}]: Accepted publickey for user{} from 10.0.0.{}",
                i % 60,
                i % 3,
                1000 + i,
                i % 7,
                i % 250
            ),
            1 => format!("worker {} finished job {} in {} ms", i % 8, i, i % 900),
            _ => format!("failed to connect to host node{} port {}", i % 20, 8000 + i % 5),
        })
        .collect()
}

fn bench_discover(c: &mut Criterion) {
    let lines = fixture(5_000);
    let parser = Parser::new();

    let mut group = c.benchmark_group("discover");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.sample_size(20);
    group.bench_function("two_pass_no_known_patterns", |b| {
        b.iter(|| {
            black_box(
                discover(&lines, &parser, InputFormat::Text, AnalyzerConfig::default()).unwrap(),
            )
        });
    });
    group.finish();
}

fn bench_discover_with_known_patterns(c: &mut Criterion) {
    let lines = fixture(5_000);
    let mut scanner = Scanner::new(InputFormat::Text);
    let mut parser = Parser::new();
    parser.add(
        &scanner
            .scan("worker %integer% finished job %integer% in %integer% ms")
            .unwrap(),
    );

    c.bench_function("discover_with_known_patterns", |b| {
        b.iter(|| {
            black_box(
                discover(&lines, &parser, InputFormat::Text, AnalyzerConfig::default()).unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_discover, bench_discover_with_known_patterns);
criterion_main!(benches);
