//! Error types for the `docqa` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
///
/// "No relevant answer" and empty answer spans are regular outcomes, not
/// errors; see [`QaOutcome`](crate::QaOutcome) and
/// [`AnswerSpan`](crate::AnswerSpan).
#[derive(Debug, Error)]
pub enum QaError {
    /// Text extraction from a raw document failed.
    #[error("Extraction error ({source_id}): {message}")]
    ExtractionError {
        /// The document whose bytes could not be turned into text.
        source_id: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Two vectors that must share a dimension did not.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension required by the index or provider.
        expected: usize,
        /// The dimension actually observed.
        actual: usize,
    },

    /// The span scorer failed or returned malformed logits.
    #[error("Scoring error ({scorer}): {message}")]
    ScoringError {
        /// The scorer that produced the error.
        scorer: String,
        /// A description of the failure.
        message: String,
    },

    /// Encoding or decoding through a tokenizer failed.
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller supplied input the pipeline cannot process.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem access failed while loading documents.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for question-answering operations.
pub type Result<T> = std::result::Result<T, QaError>;
