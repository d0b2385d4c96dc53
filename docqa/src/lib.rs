//! Extractive question answering over a small document corpus.
//!
//! Documents are split into word-budget chunks, each chunk is embedded, and a
//! question is answered by retrieving the single most similar chunk across
//! the corpus and extracting an answer span from it with a start/end scoring
//! model.
//!
//! The embedding model, the QA scoring model, its tokenizer, and document
//! text extraction are injected through the [`EmbeddingProvider`],
//! [`SpanScorer`], [`QaTokenizer`], and [`TextExtractor`] traits.
//!
//! # Features
//!
//! - `openai` — [`openai::OpenAIEmbeddingProvider`]
//! - `tokenizers` — [`HfTokenizer`] for `tokenizer.json` vocabularies
//! - `full` — all of the above

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod source;

#[cfg(feature = "tokenizers")]
pub mod hf_tokenizer;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, WordBudgetChunker};
pub use config::{QaConfig, QaConfigBuilder};
pub use corpus::Corpus;
pub use document::{Answer, AnswerSpan, Chunk, Document, MatchResult, QaOutcome, RawDocument};
pub use embedding::EmbeddingProvider;
pub use error::{QaError, Result};
pub use extraction::{
    QaTokenizer, SpanExtractor, SpanLogits, SpanScorer, SpecialTokens, TokenizedPair,
    WhitespaceTokenizer,
};
#[cfg(feature = "tokenizers")]
pub use hf_tokenizer::HfTokenizer;
pub use index::{build_document, build_index, cosine_similarity};
pub use pipeline::{IngestOutcome, IngestReport, QaPipeline, QaPipelineBuilder};
pub use retriever::{best_match, embed_query, find_best_match};
pub use source::{PlainTextExtractor, TextExtractor, load_directory};
