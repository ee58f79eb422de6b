//! Benchmarks for the ingest pipeline at varying body sizes and read sizes.
//!
//! Run with: `cargo bench --bench pipeline_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdfspot::ingest::{decode, LineFramer};
use pdfspot::overlay::project_rect;
use pdfspot::{BBox, ChunkAccumulator, Extractor, Rect, ReplayTransport};

/// Generate an NDJSON extraction body covering `pages` pages.
///
/// Every page reports progress, sends a batch of chunks, and re-sends the
/// previous page's first chunk so the dedup path is exercised.
fn generate_body(pages: u32) -> String {
    let mut body = String::new();
    for page in 1..=pages {
        body.push_str(&format!(
            r#"{{"type":"progress","processed_pages":{page},"total_pages":{pages}}}"#
        ));
        body.push('\n');

        let mut chunks = Vec::new();
        for line in 0..20 {
            let y = f64::from(line) * 0.045;
            chunks.push(format!(
                r#"{{"text":"Page {page} line {line}: Lorem ipsum dolor sit amet","bbox":[0.1,{y:.3},0.9,{:.3}],"page_num":{page}}}"#,
                y + 0.03
            ));
        }
        if page > 1 {
            chunks.push(format!(
                r#"{{"text":"Page {} line 0: Lorem ipsum dolor sit amet","bbox":[0.1,0.0,0.9,0.03],"page_num":{}}}"#,
                page - 1,
                page - 1
            ));
        }
        body.push_str(&format!(
            r#"{{"type":"data","extracted_data":[{}],"is_complete":{}}}"#,
            chunks.join(","),
            page == pages
        ));
        body.push('\n');
    }
    body
}

fn bench_framer(c: &mut Criterion) {
    let mut group = c.benchmark_group("framer");
    let body = generate_body(50);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for read_size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(read_size), &read_size, |b, &size| {
            b.iter(|| {
                let mut framer = LineFramer::new();
                let mut lines = 0;
                for chunk in body.as_bytes().chunks(size) {
                    lines += framer.feed(black_box(chunk)).len();
                }
                black_box(lines)
            });
        });
    }
    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");

    for pages in [10u32, 100] {
        let events: Vec<_> = generate_body(pages)
            .lines()
            .filter_map(decode)
            .filter_map(Result::ok)
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(pages), &events, |b, events| {
            b.iter(|| {
                let mut acc = ChunkAccumulator::new();
                for event in events {
                    acc.apply(event.clone());
                }
                black_box(acc.len())
            });
        });
    }
    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let body = generate_body(50);
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    c.bench_function("session_replay_50_pages", |b| {
        b.iter(|| {
            let mut extractor = Extractor::new(ReplayTransport::new(body.clone(), 1024));
            let session = extractor.start("https://example.com/bench.pdf");
            black_box(runtime.block_on(session.run(|_| {})))
        });
    });
}

fn bench_projection(c: &mut Criterion) {
    let bbox = BBox::new(0.12, 0.34, 0.56, 0.78);
    let container = Rect::new(0.0, 64.0, 1280.0, 720.0);
    let canvas = Rect::new(240.0, -1200.0, 800.0, 1035.0);

    c.bench_function("project_rect", |b| {
        b.iter(|| project_rect(black_box(&bbox), black_box(1.5), container, canvas));
    });
}

criterion_group!(benches, bench_framer, bench_accumulate, bench_session, bench_projection);
criterion_main!(benches);
