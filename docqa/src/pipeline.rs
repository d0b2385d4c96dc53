//! Question-answering pipeline orchestrator.
//!
//! The [`QaPipeline`] owns the session [`Corpus`] and coordinates document
//! ingestion (extract → chunk → embed → insert) and question answering
//! (embed → retrieve → extract span).
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa::{QaConfig, QaPipeline, RawDocument, WhitespaceTokenizer};
//!
//! let pipeline = QaPipeline::builder()
//!     .config(QaConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .tokenizer(Arc::new(WhitespaceTokenizer::new()))
//!     .scorer(Arc::new(my_qa_model))
//!     .build()?;
//!
//! let report = pipeline.ingest_batch(&documents).await;
//! match pipeline.ask("How long is the statute of limitations?").await? {
//!     QaOutcome::Answered(answer) => println!("{} ({})", answer.text(), answer.document_id()),
//!     QaOutcome::NoMatch => println!("no relevant answer"),
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, WordBudgetChunker};
use crate::config::QaConfig;
use crate::corpus::Corpus;
use crate::document::{Answer, Document, MatchResult, QaOutcome, RawDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};
use crate::extraction::{QaTokenizer, SpanExtractor, SpanScorer};
use crate::index::build_document;
use crate::retriever::{best_match, embed_query, log_match};
use crate::source::{PlainTextExtractor, TextExtractor};

/// What happened to one document of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The document is in the corpus.
    Ingested {
        /// Number of chunks indexed for the document.
        chunk_count: usize,
    },
    /// Text extraction failed; the document was skipped.
    ExtractionFailed {
        /// A description of the failure.
        message: String,
    },
    /// Embedding failed; no part of the document was kept.
    EmbeddingFailed {
        /// A description of the failure.
        message: String,
    },
}

/// Per-document results of [`QaPipeline::ingest_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// `(document id, outcome)` in input order.
    pub outcomes: Vec<(String, IngestOutcome)>,
}

impl IngestReport {
    /// Number of documents that made it into the corpus.
    pub fn ingested(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| matches!(o, IngestOutcome::Ingested { .. })).count()
    }

    /// Number of documents that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.ingested()
    }

    /// The outcome for a document id, if it was part of the batch.
    pub fn outcome(&self, id: &str) -> Option<&IngestOutcome> {
        self.outcomes.iter().rev().find(|(doc_id, _)| doc_id == id).map(|(_, o)| o)
    }
}

/// The question-answering pipeline orchestrator.
///
/// Ingestion builds each document completely before taking a short write
/// lock to insert it. A question embeds itself with no lock held and reads
/// the corpus only for the similarity scan, so a slow embedding provider
/// never blocks ingestion, and a question never observes a half-indexed
/// document. Construct one via [`QaPipeline::builder()`].
pub struct QaPipeline {
    config: QaConfig,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    text_extractor: Arc<dyn TextExtractor>,
    extractor: SpanExtractor,
    corpus: RwLock<Corpus>,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the span extractor.
    pub fn extractor(&self) -> &SpanExtractor {
        &self.extractor
    }

    /// Chunk, embed, and insert a document from already-extracted text.
    ///
    /// Replaces any document with the same id. Returns the number of chunks.
    ///
    /// # Errors
    ///
    /// Returns the embedding failure for this document; the corpus is left
    /// unchanged in that case.
    pub async fn ingest_text(&self, id: &str, text: impl Into<String>) -> Result<usize> {
        let document =
            build_document(id, text.into(), self.chunker.as_ref(), self.embedding_provider.as_ref())
                .await
                .map_err(|e| {
                    error!(document.id = id, error = %e, "embedding failed during ingestion");
                    e
                })?;

        let chunk_count = document.chunks.len();
        let replaced = self.corpus.write().await.insert(document).is_some();
        info!(document.id = id, chunk_count, replaced, "ingested document");
        Ok(chunk_count)
    }

    /// Extract text from a raw document and ingest it.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ExtractionError`] or the embedding failure for this
    /// document; the corpus is left unchanged in either case.
    pub async fn ingest(&self, document: &RawDocument) -> Result<usize> {
        let text = self.text_extractor.extract_text(document).map_err(|e| match e {
            QaError::ExtractionError { .. } => e,
            other => QaError::ExtractionError {
                source_id: document.id.clone(),
                message: other.to_string(),
            },
        })?;
        self.ingest_text(&document.id, text).await
    }

    /// Ingest several documents, reporting each outcome.
    ///
    /// A failing document never stops the rest of the batch.
    pub async fn ingest_batch(&self, documents: &[RawDocument]) -> IngestReport {
        let mut report = IngestReport::default();
        for document in documents {
            let outcome = match self.ingest(document).await {
                Ok(chunk_count) => IngestOutcome::Ingested { chunk_count },
                Err(e @ QaError::ExtractionError { .. }) => {
                    warn!(document.id = %document.id, error = %e, "skipping document");
                    IngestOutcome::ExtractionFailed { message: e.to_string() }
                }
                Err(e) => IngestOutcome::EmbeddingFailed { message: e.to_string() },
            };
            report.outcomes.push((document.id.clone(), outcome));
        }

        info!(
            documents = documents.len(),
            ingested = report.ingested(),
            failed = report.failed(),
            "ingested batch"
        );
        report
    }

    /// Find the chunk that best matches `question` across the corpus.
    ///
    /// Returns `None` when the corpus holds no chunks.
    ///
    /// # Errors
    ///
    /// Fails if the question cannot be embedded.
    pub async fn find_best_match(&self, question: &str) -> Result<Option<MatchResult>> {
        let chunk_count = self.corpus.read().await.chunk_count();
        if chunk_count == 0 {
            debug!("corpus has no chunks");
            return Ok(None);
        }

        let log_failure = |e: QaError| {
            error!(error = %e, "retrieval failed");
            e
        };
        let query =
            embed_query(question, self.embedding_provider.as_ref()).await.map_err(log_failure)?;
        let found = best_match(&*self.corpus.read().await, &query).map_err(log_failure)?;
        log_match(found.as_ref());
        Ok(found)
    }

    /// Answer `question` from the corpus.
    ///
    /// Retrieves the best chunk and extracts a span from it. When nothing can
    /// be retrieved, returns [`QaOutcome::NoMatch`] without scoring.
    ///
    /// # Errors
    ///
    /// Fails if the question cannot be embedded or the span scorer fails.
    pub async fn ask(&self, question: &str) -> Result<QaOutcome> {
        let Some(source) = self.find_best_match(question).await? else {
            info!("no relevant answer");
            return Ok(QaOutcome::NoMatch);
        };

        let span = self.extractor.extract(question, &source.chunk_text).await.map_err(|e| {
            error!(document.id = %source.document_id, error = %e, "span extraction failed");
            e
        })?;

        info!(
            document.id = %source.document_id,
            chunk_index = source.chunk_index,
            score = source.score,
            answer_len = span.text.len(),
            "answered question"
        );
        Ok(QaOutcome::Answered(Answer { span, source }))
    }

    /// Remove every document, starting a fresh session.
    pub async fn reset(&self) {
        let mut corpus = self.corpus.write().await;
        let removed = corpus.len();
        corpus.clear();
        info!(removed, "corpus reset");
    }

    /// Remove one document. Returns whether it was present.
    pub async fn remove(&self, id: &str) -> bool {
        self.corpus.write().await.remove(id).is_some()
    }

    /// Ids of ingested documents in insertion order.
    pub async fn document_ids(&self) -> Vec<String> {
        self.corpus.read().await.ids().map(str::to_string).collect()
    }

    /// A copy of an ingested document.
    pub async fn document(&self, id: &str) -> Option<Document> {
        self.corpus.read().await.get(id).cloned()
    }

    /// Number of ingested documents.
    pub async fn len(&self) -> usize {
        self.corpus.read().await.len()
    }

    /// Whether no documents have been ingested.
    pub async fn is_empty(&self) -> bool {
        self.corpus.read().await.is_empty()
    }
}

impl std::fmt::Debug for QaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaPipeline")
            .field("config", &self.config)
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`QaPipeline`].
///
/// The embedding provider, tokenizer, and scorer are required. The chunker
/// defaults to a [`WordBudgetChunker`] sized from the config and the text
/// extractor to [`PlainTextExtractor`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = QaPipeline::builder()
///     .config(QaConfig::builder().chunk_size(300).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .tokenizer(Arc::new(tokenizer))
///     .scorer(Arc::new(scorer))
///     .text_extractor(Arc::new(pdf_reader))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<QaConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    text_extractor: Option<Arc<dyn TextExtractor>>,
    tokenizer: Option<Arc<dyn QaTokenizer>>,
    scorer: Option<Arc<dyn SpanScorer>>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`QaConfig::default`].
    pub fn config(mut self, config: QaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the text extractor used for raw documents.
    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.text_extractor = Some(extractor);
        self
    }

    /// Set the tokenizer matching the scorer's vocabulary.
    pub fn tokenizer(mut self, tokenizer: Arc<dyn QaTokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Set the span scorer.
    pub fn scorer(mut self, scorer: Arc<dyn SpanScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Build the [`QaPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ConfigError`] if the config is invalid or a required
    /// field is missing.
    pub fn build(self) -> Result<QaPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| QaError::ConfigError("embedding_provider is required".to_string()))?;
        let tokenizer = self
            .tokenizer
            .ok_or_else(|| QaError::ConfigError("tokenizer is required".to_string()))?;
        let scorer =
            self.scorer.ok_or_else(|| QaError::ConfigError("scorer is required".to_string()))?;

        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(WordBudgetChunker::new(config.chunk_size)));
        let text_extractor = self.text_extractor.unwrap_or_else(|| Arc::new(PlainTextExtractor));
        let extractor = SpanExtractor::new(tokenizer, scorer, config.max_seq_len);

        Ok(QaPipeline {
            config,
            chunker,
            embedding_provider,
            text_extractor,
            extractor,
            corpus: RwLock::new(Corpus::new()),
        })
    }
}
