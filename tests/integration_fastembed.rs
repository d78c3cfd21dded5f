//! Integration tests for the local fastembed backend.
//!
//! These verify that real embeddings drive the chunker end to end.

#![cfg(feature = "fastembed")]

// Note: These tests download a model on first run, so they are ignored by
// default. Run with `cargo test --features fastembed -- --ignored`.

use std::sync::Arc;

use seams::{ChunkingOptions, ChunkingStrategy, ContentFormat, Embedder, FastEmbedder, SemanticChunker};

#[tokio::test]
#[ignore] // Requires fastembed model download
async fn fastembed_returns_advertised_dimensions() {
    let embedder = FastEmbedder::new().expect("Failed to load embedding model");
    let texts = vec!["Neural networks learn patterns.".to_string(), "Castles have moats.".to_string()];
    let vectors = embedder.embed_batch(&texts).await.expect("Embedding failed");

    assert_eq!(vectors.len(), 2);
    assert!(vectors.iter().all(|v| v.len() == embedder.dimensions()));
}

#[tokio::test]
#[ignore] // Requires fastembed model download
async fn fastembed_detects_topic_shift() {
    let quantum = "Quantum computing uses qubits instead of classical bits, and superposition \
        lets a register of qubits hold many states at once while entanglement links them.";
    let castles = "Medieval castles served as defensive fortifications, with thick stone walls \
        against siege engines and moats that kept attackers away from the gates.";
    let text = [quantum; 4]
        .iter()
        .chain([castles; 4].iter())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n");

    let embedder = FastEmbedder::new().expect("Failed to load embedding model");
    let chunker = SemanticChunker::new(ChunkingOptions::default().with_token_limits(20, 150, 250))
        .and_then(|c| c.with_embedder(Arc::new(embedder)))
        .expect("Failed to build chunker");
    let result = chunker.chunk(&text, ContentFormat::Default).await;

    assert_eq!(result.strategy, ChunkingStrategy::Semantic);
    assert!(
        result.total_chunks >= 2,
        "Should detect topic shift, got {} chunks",
        result.total_chunks
    );
    assert!(result.chunks[0].text.contains("qubits"));
    assert!(result.chunks.last().is_some_and(|c| c.text.contains("castles")));
}
