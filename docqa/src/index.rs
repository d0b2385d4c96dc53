//! Per-document embedding index and cosine similarity.
//!
//! A document's index is simply its ordered list of embedded [`Chunk`]s.
//! [`build_document`] produces it whole or not at all, so a failed embedding
//! never leaves a half-indexed document behind.

use tracing::debug;

use crate::chunking::Chunker;
use crate::document::{Chunk, Document};
use crate::embedding::{EmbeddingProvider, check_dimensions};
use crate::error::{QaError, Result};

/// Similarity assigned when either vector has zero magnitude.
pub const ZERO_NORM_SIMILARITY: f32 = -1.0;

/// Compute cosine similarity between two vectors.
///
/// Returns [`ZERO_NORM_SIMILARITY`] if either vector has zero magnitude (or the
/// result is not finite), and clamps rounding noise into `[-1, 1]`.
///
/// # Errors
///
/// Returns [`QaError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(QaError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(ZERO_NORM_SIMILARITY);
    }
    let similarity = dot / (norm_a * norm_b);
    if !similarity.is_finite() {
        return Ok(ZERO_NORM_SIMILARITY);
    }
    Ok(similarity.clamp(-1.0, 1.0))
}

/// Embed chunk texts in order, pairing each with its vector.
///
/// # Errors
///
/// Fails if the provider fails, returns the wrong number of vectors, or returns
/// a vector whose length differs from [`EmbeddingProvider::dimensions`].
pub async fn build_index(
    document_id: &str,
    texts: Vec<String>,
    provider: &dyn EmbeddingProvider,
) -> Result<Vec<Chunk>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = provider.embed_batch(&refs).await?;
    if embeddings.len() != texts.len() {
        return Err(QaError::EmbeddingError {
            provider: "batch".to_string(),
            message: format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
        });
    }

    let dimensions = provider.dimensions();
    let mut chunks = Vec::with_capacity(texts.len());
    for (index, (text, embedding)) in texts.into_iter().zip(embeddings).enumerate() {
        check_dimensions(&embedding, dimensions)?;
        chunks.push(Chunk { document_id: document_id.to_string(), index, text, embedding });
    }

    debug!(document.id = document_id, chunk_count = chunks.len(), dimensions, "built index");
    Ok(chunks)
}

/// Chunk and embed `text` into a complete [`Document`].
///
/// # Errors
///
/// Propagates any failure from [`build_index`]; no partial document is returned.
pub async fn build_document(
    id: &str,
    text: String,
    chunker: &dyn Chunker,
    provider: &dyn EmbeddingProvider,
) -> Result<Document> {
    let texts = chunker.chunk(&text);
    let chunks = build_index(id, texts, provider).await?;
    Ok(Document { id: id.to_string(), text, chunks })
}

impl Document {
    /// Find the chunk of this document most similar to `query`.
    ///
    /// Returns `None` when the document has no chunks. On ties the earliest
    /// chunk wins.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::DimensionMismatch`] if `query` has a different
    /// dimension from the chunk embeddings.
    pub fn most_similar(&self, query: &[f32]) -> Result<Option<(&Chunk, f32)>> {
        let mut best: Option<(&Chunk, f32)> = None;
        for chunk in &self.chunks {
            let score = cosine_similarity(query, &chunk.embedding)?;
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((chunk, score));
            }
        }
        Ok(best)
    }
}
