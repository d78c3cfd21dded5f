//! Benchmarks for content analysis, unit splitting and structural chunking.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use seams::{split_units, ChunkingOptions, ContentAnalyzer, ContentFormat, SemanticChunker};

fn sample_markdown(size: usize) -> String {
    // Realistic mix of headings, prose, code and lists
    let blocks = [
        "# Overview\n\n",
        "The quick brown fox jumps over the lazy dog. Pack my box with five dozen liquor jugs.\n\n",
        "How vexingly quick daft zebras jump! The five boxing wizards jump quickly.\n\n",
        "```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n\n",
        "- first item\n- second item\n- third item\n\n",
        "| a | b |\n|---|---|\n| 1 | 2 |\n\n",
        "Sphinx of black quartz, judge my vow. Jackdaws love my big sphinx of quartz.\n\n",
    ];
    let mut text = String::with_capacity(size);
    let mut i = 0;
    while text.len() < size {
        text.push_str(blocks[i % blocks.len()]);
        i += 1;
    }
    text
}

fn bench_analyzer(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyzer");
    let analyzer = ContentAnalyzer::new();

    for size in [1_000, 10_000, 100_000] {
        let text = sample_markdown(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("analyze", size), &text, |b, text| {
            b.iter(|| analyzer.analyze(black_box(text)))
        });
    }

    group.finish();
}

fn bench_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("units");

    for size in [1_000, 10_000, 100_000] {
        let text = sample_markdown(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        for format in [ContentFormat::Markdown, ContentFormat::Default] {
            group.bench_with_input(BenchmarkId::new(format.as_str(), size), &text, |b, text| {
                b.iter(|| split_units(black_box(text), format))
            });
        }
    }

    group.finish();
}

fn bench_structural_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_chunking");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let chunker = SemanticChunker::new(ChunkingOptions::default().with_token_limits(50, 200, 400))
        .unwrap();

    for size in [10_000, 100_000] {
        let text = sample_markdown(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("markdown", size), &text, |b, text| {
            b.iter(|| runtime.block_on(chunker.chunk(black_box(text), ContentFormat::Markdown)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analyzer, bench_units, bench_structural_chunking);
criterion_main!(benches);
