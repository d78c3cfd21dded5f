//! Basic Content-Aware Chunking
//!
//! Chunk a small markdown document without embeddings and print each chunk.
//!
//! ```bash
//! RUST_LOG=seams=debug cargo run --example basic_chunking
//! ```

use seams::{dominant_type, ChunkingOptions, ContentAnalyzer, ContentFormat, SemanticChunker};
use tracing_subscriber::EnvFilter;

const DOCUMENT: &str = "# Ownership

Every value in Rust has a single owner. When the owner goes out of scope the value is dropped, \
and its memory is released without a garbage collector.

```rust
let s = String::from(\"hello\");
let t = s; // s is moved into t
```

# Borrowing

References let code use a value without taking ownership. Any number of shared references may \
exist at once, or exactly one mutable reference, but never both.

- shared: `&T`
- mutable: `&mut T`

# Lifetimes

Lifetimes describe how long references stay valid. The compiler infers most of them; explicit \
annotations are needed when a function returns a reference tied to one of several inputs.
";

#[tokio::main(flavor = "current_thread")]
async fn main() -> seams::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let segments = ContentAnalyzer::new().analyze(DOCUMENT);
    println!("Segments: {}", segments.len());
    for seg in &segments {
        println!("  {:?} {}..{}", seg.kind, seg.start_offset, seg.end_offset);
    }
    println!("Dominant: {:?}\n", dominant_type(&segments));

    // Small limits so this short document still splits.
    let options = ChunkingOptions::default().with_token_limits(20, 60, 120);
    let chunker = SemanticChunker::new(options)?;
    let result = chunker.chunk(DOCUMENT, ContentFormat::Markdown).await;

    println!(
        "Chunks: {} ({:?}, {} units, {:?})\n",
        result.total_chunks, result.strategy, result.source.units, result.elapsed
    );
    for chunk in &result.chunks {
        println!(
            "[{}] {:?} tokens={} topics=\"{}\"",
            chunk.chunk_index,
            chunk.boundary_type,
            chunk.metadata.token_count,
            chunk.metadata.topic_signature
        );
        println!("{}\n", chunk.text);
    }

    Ok(())
}
