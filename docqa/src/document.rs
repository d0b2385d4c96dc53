//! Data types for documents, chunks, matches, and answers.

use serde::{Deserialize, Serialize};

/// An uploaded document before text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Unique identifier for the document, usually its file name.
    pub id: String,
    /// The raw bytes as uploaded.
    pub bytes: Vec<u8>,
}

impl RawDocument {
    /// Create a raw document from its identifier and bytes.
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), bytes: bytes.into() }
    }

    /// Create a raw document holding UTF-8 text.
    pub fn from_text(id: impl Into<String>, text: &str) -> Self {
        Self::new(id, text.as_bytes())
    }
}

/// An ingested document: its extracted text and embedded chunks.
///
/// Documents are built whole by the pipeline and never mutated afterwards;
/// re-ingesting the same id replaces the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document within the corpus.
    pub id: String,
    /// The extracted text.
    pub text: String,
    /// Embedded chunks in document order.
    pub chunks: Vec<Chunk>,
}

/// A contiguous slice of a [`Document`]'s words with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Zero-based position within the parent document.
    pub index: usize,
    /// The text content of the chunk, words joined by single spaces.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
}

/// The best-matching chunk for a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    /// The document owning the chunk.
    pub document_id: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// The chunk text, used as extraction context.
    pub chunk_text: String,
    /// Cosine similarity between the question and the chunk, in `[-1, 1]`.
    pub score: f32,
}

/// An answer decoded from start/end logits.
///
/// Indices refer to positions in the tokenized `(question, context)` pair.
/// `end_index < start_index` is possible and yields an empty `text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerSpan {
    /// The detokenized, trimmed answer. May be empty.
    pub text: String,
    /// Position of the highest start logit.
    pub start_index: usize,
    /// Position of the highest end logit.
    pub end_index: usize,
}

impl AnswerSpan {
    /// Whether decoding produced no answer text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An answer together with the chunk it was extracted from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The extracted span.
    pub span: AnswerSpan,
    /// Where the span came from.
    pub source: MatchResult,
}

impl Answer {
    /// The answer text.
    pub fn text(&self) -> &str {
        &self.span.text
    }

    /// The source document id.
    pub fn document_id(&self) -> &str {
        &self.source.document_id
    }

    /// The retrieval score rendered as a percentage, e.g. `"87.50%"`.
    pub fn relevance_percent(&self) -> String {
        format!("{:.2}%", self.source.score * 100.0)
    }
}

/// The result of asking a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QaOutcome {
    /// A chunk was retrieved and an answer extracted from it.
    Answered(Answer),
    /// The corpus holds no chunks to answer from.
    NoMatch,
}

impl QaOutcome {
    /// Return the answer, if any.
    pub fn answer(&self) -> Option<&Answer> {
        match self {
            QaOutcome::Answered(answer) => Some(answer),
            QaOutcome::NoMatch => None,
        }
    }

    /// Whether this is the "no relevant answer" outcome.
    pub fn is_no_match(&self) -> bool {
        matches!(self, QaOutcome::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(score: f32) -> Answer {
        Answer {
            span: AnswerSpan { text: "five years".into(), start_index: 12, end_index: 13 },
            source: MatchResult {
                document_id: "statutes.pdf".into(),
                chunk_index: 0,
                chunk_text: "The statute of limitations is five years".into(),
                score,
            },
        }
    }

    #[test]
    fn relevance_is_rendered_as_percentage() {
        assert_eq!(answer(0.875).relevance_percent(), "87.50%");
        assert_eq!(answer(-0.5).relevance_percent(), "-50.00%");
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let value = serde_json::to_value(QaOutcome::NoMatch).unwrap();
        assert_eq!(value, serde_json::json!({ "outcome": "no_match" }));

        let value = serde_json::to_value(QaOutcome::Answered(answer(0.5))).unwrap();
        assert_eq!(value["outcome"], "answered");
        assert_eq!(value["source"]["document_id"], "statutes.pdf");
    }
}
