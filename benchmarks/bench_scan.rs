use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use sequence::{benchmark, BenchMode, InputFormat, LineBatch, Parser, Scanner};

const SYSLOG: &str = "Jan 12 06:49:42 irc sshd[7034]: Accepted password for root from 218.161.87.156 port 4154 ssh2";
const JSON: &str = r#"{"ts":"2023-06-01T10:15:00Z","level":"info","msg":"request served","status":200,"latency":0.023,"path":"/api/v1/users"}"#;

fn bench_scan_text(c: &mut Criterion) {
    let mut scanner = Scanner::new(InputFormat::Text);
    c.bench_function("scan_text_syslog", |b| {
        b.iter(|| {
            black_box(scanner.scan(black_box(SYSLOG)).unwrap());
        });
    });
}

fn bench_scan_json(c: &mut Criterion) {
    let mut scanner = Scanner::new(InputFormat::Json);
    c.bench_function("scan_json_object", |b| {
        b.iter(|| {
            black_box(scanner.scan(black_box(JSON)).unwrap());
        });
    });
}

fn bench_harness_workers(c: &mut Criterion) {
    let mut batch = LineBatch::default();
    for i in 0..10_000 {
        batch.push(format!(
            "Jan 12 06:49:{:02} host{} sshd[{}]: Accepted password for user{} from 10.0.{}.{} port {}",
            i % 60,
            i % 4,
            7000 + i,
            i % 13,
            i % 256,
            i % 200,
            40000 + i
        ));
    }
    let parser = Parser::new();

    let mut group = c.benchmark_group("harness_scan");
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.sample_size(10);
    for workers in [1, 2, 4] {
        group.bench_function(format!("workers_{}", workers), |b| {
            b.iter(|| black_box(benchmark(&batch, &parser, workers, BenchMode::Scan).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan_text, bench_scan_json, bench_harness_workers);
criterion_main!(benches);
