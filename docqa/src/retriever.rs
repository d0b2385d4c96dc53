//! Global best-chunk retrieval across a [`Corpus`].

use tracing::debug;

use crate::corpus::Corpus;
use crate::document::{Chunk, MatchResult};
use crate::embedding::{EmbeddingProvider, check_dimensions};
use crate::error::Result;
use crate::index::cosine_similarity;

/// Find the chunk most similar to an already-embedded query.
///
/// Every chunk of every document is scored in corpus order and a single
/// running maximum is kept; a later chunk replaces it only when strictly
/// better, so the first of several equal maxima wins. Returns `None` when the
/// corpus holds no chunks.
///
/// # Errors
///
/// Returns [`QaError::DimensionMismatch`](crate::QaError::DimensionMismatch)
/// if the query and a chunk embedding differ in dimension.
pub fn best_match(corpus: &Corpus, query: &[f32]) -> Result<Option<MatchResult>> {
    let mut best: Option<(&Chunk, f32)> = None;
    for chunk in corpus.chunks() {
        let score = cosine_similarity(query, &chunk.embedding)?;
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((chunk, score));
        }
    }

    Ok(best.map(|(chunk, score)| MatchResult {
        document_id: chunk.document_id.clone(),
        chunk_index: chunk.index,
        chunk_text: chunk.text.clone(),
        score,
    }))
}

/// Embed `question` once and find the best-matching chunk in `corpus`.
///
/// An empty corpus short-circuits to `None` without calling the provider.
///
/// # Errors
///
/// Fails if the question cannot be embedded or its embedding has the wrong
/// dimension.
pub async fn find_best_match(
    question: &str,
    corpus: &Corpus,
    provider: &dyn EmbeddingProvider,
) -> Result<Option<MatchResult>> {
    if corpus.chunk_count() == 0 {
        debug!(documents = corpus.len(), "corpus has no chunks");
        return Ok(None);
    }

    let query = embed_query(question, provider).await?;
    let found = best_match(corpus, &query)?;
    log_match(found.as_ref());
    Ok(found)
}

/// Embed `question` and check the vector against the provider's dimension.
pub async fn embed_query(question: &str, provider: &dyn EmbeddingProvider) -> Result<Vec<f32>> {
    let query = provider.embed(question).await?;
    check_dimensions(&query, provider.dimensions())?;
    Ok(query)
}

pub(crate) fn log_match(found: Option<&MatchResult>) {
    if let Some(found) = found {
        debug!(
            document.id = %found.document_id,
            chunk_index = found.chunk_index,
            score = found.score,
            "best match"
        );
    }
}
