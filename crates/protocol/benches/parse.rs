//! Benchmarks for the line parser and the protobuf codec
//!
//! The parser runs once per input line and the codec once per record, so
//! both sit on the hot path of every file.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use appsload_protocol::{BinaryCodec, ProtobufCodec, parse_line};

/// A line with `apps` installed app ids
fn create_line(apps: usize) -> String {
    let ids: Vec<String> = (0..apps).map(|i| (1000 + i).to_string()).collect();
    format!("idfa\te7e1a50c0ec2747ca56cd9e1558c0d7c\t67.7835424444\t-22.8044005471\t{}", ids.join(","))
}

fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    for apps in [1, 10, 100] {
        let line = create_line(apps);

        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(format!("{}_apps", apps), |b| {
            b.iter(|| black_box(parse_line(black_box(&line))))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("protobuf_encode");
    let codec = ProtobufCodec;

    for apps in [1, 10, 100] {
        let record = parse_line(&create_line(apps)).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_function(format!("{}_apps", apps), |b| {
            b.iter(|| black_box(codec.entry(black_box(&record))))
        });
    }

    group.finish();
}

fn bench_malformed_line(c: &mut Criterion) {
    let line = "idfa\te7e1a50c0ec2747ca56cd9e1558c0d7c\tnot-a-number\t-22.80\t1,2,3";

    c.bench_function("parse_malformed", |b| {
        b.iter(|| black_box(parse_line(black_box(line))))
    });
}

criterion_group!(benches, bench_parse_line, bench_encode, bench_malformed_line);

criterion_main!(benches);
