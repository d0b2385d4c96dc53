//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`WordBudgetChunker`], which
//! groups whitespace-separated words until their summed length passes a budget.

/// A strategy for splitting document text into chunks.
///
/// Implementations return chunk texts only. Embeddings are attached later by
/// [`build_document`](crate::index::build_document).
pub trait Chunker: Send + Sync {
    /// Split text into an ordered sequence of non-empty chunks.
    ///
    /// Returns an empty `Vec` if the text has no words.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Groups words into chunks by the sum of their character lengths.
///
/// Separators do not count toward the budget. A chunk is closed right after
/// the word that pushes its running length past `chunk_size`, so that word is
/// kept in the closing chunk and a single oversized word forms a chunk of its
/// own. Words are re-joined with single spaces.
///
/// # Example
///
/// ```rust
/// use docqa::{Chunker, WordBudgetChunker};
///
/// let chunker = WordBudgetChunker::new(5);
/// assert_eq!(chunker.chunk("aa bb cc dd"), vec!["aa bb cc", "dd"]);
/// ```
#[derive(Debug, Clone)]
pub struct WordBudgetChunker {
    chunk_size: usize,
}

impl WordBudgetChunker {
    /// Create a new `WordBudgetChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — word-character budget; a chunk closes once it is exceeded
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// The configured budget.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Chunker for WordBudgetChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for word in text.split_whitespace() {
            current.push(word);
            current_len += word.chars().count();

            if current_len > self.chunk_size {
                chunks.push(current.join(" "));
                current.clear();
                current_len = 0;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }
}
