//! Extractive answer spans from start/end logits.
//!
//! [`SpanExtractor`] encodes a `(question, context)` pair as
//! `[CLS] question [SEP] context [SEP]`, asks a [`SpanScorer`] for per-token
//! start and end logits, and decodes `argmax(start)..=argmax(end)`. The two
//! argmaxes are taken independently, so an end before the start yields an
//! empty answer rather than an error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::AnswerSpan;
use crate::error::{QaError, Result};

/// Number of special tokens in an encoded pair.
const PAIR_SPECIAL_TOKENS: usize = 3;

/// Ids of the special tokens framing an encoded pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    /// Classification token opening the sequence.
    pub cls: u32,
    /// Separator closing each segment.
    pub sep: u32,
}

/// Text/token conversion used to build scorer inputs and decode answers.
pub trait QaTokenizer: Send + Sync {
    /// Encode text into token ids, without special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids into text, skipping special tokens.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// The special tokens this tokenizer uses for pairs.
    fn special_tokens(&self) -> SpecialTokens;
}

/// A `(question, context)` pair ready for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedPair {
    /// `[CLS] question [SEP] context [SEP]`.
    pub input_ids: Vec<u32>,
    /// Segment ids: 0 for the question segment, 1 for the context segment.
    pub token_type_ids: Vec<u32>,
    /// Index of the first context token.
    pub context_start: usize,
    /// Index one past the last context token.
    pub context_end: usize,
    /// Whether context tokens were dropped to fit the length limit.
    pub truncated: bool,
}

impl TokenizedPair {
    /// Encode a pair, truncating only the context to fit `max_len` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidInput`] if the question alone cannot fit,
    /// and propagates tokenizer failures.
    pub fn encode(
        tokenizer: &dyn QaTokenizer,
        question: &str,
        context: &str,
        max_len: usize,
    ) -> Result<Self> {
        let special = tokenizer.special_tokens();
        let question_ids = tokenizer.encode(question)?;
        let mut context_ids = tokenizer.encode(context)?;

        let fixed = question_ids.len() + PAIR_SPECIAL_TOKENS;
        if fixed > max_len {
            return Err(QaError::InvalidInput(format!(
                "question needs {fixed} tokens with special tokens, limit is {max_len}"
            )));
        }

        let budget = max_len - fixed;
        let truncated = context_ids.len() > budget;
        if truncated {
            warn!(
                context_tokens = context_ids.len(),
                kept = budget,
                "context truncated to fit sequence limit"
            );
            context_ids.truncate(budget);
        }

        let mut input_ids = Vec::with_capacity(fixed + context_ids.len());
        input_ids.push(special.cls);
        input_ids.extend_from_slice(&question_ids);
        input_ids.push(special.sep);
        let context_start = input_ids.len();
        input_ids.extend_from_slice(&context_ids);
        let context_end = input_ids.len();
        input_ids.push(special.sep);

        let mut token_type_ids = vec![0; context_start];
        token_type_ids.resize(input_ids.len(), 1);

        Ok(Self { input_ids, token_type_ids, context_start, context_end, truncated })
    }

    /// Number of tokens in the pair.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the pair holds no tokens. Never true for encoded pairs.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Per-token start and end scores for an encoded pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanLogits {
    /// Score for "the answer starts here", one per token.
    pub start: Vec<f32>,
    /// Score for "the answer ends here", one per token.
    pub end: Vec<f32>,
}

/// A question-answering model producing start/end logits.
///
/// Implementations wrap a pre-trained extractive QA model; this crate never
/// trains one.
#[async_trait]
pub trait SpanScorer: Send + Sync {
    /// Score every token of `pair` as a potential answer start and end.
    async fn score(&self, pair: &TokenizedPair) -> Result<SpanLogits>;

    /// A short name used in error messages.
    fn name(&self) -> &str {
        "scorer"
    }
}

/// Index of the first maximal value. NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((i, value));
        }
    }
    best.map(|(i, _)| i)
}

/// Extracts answer spans with a tokenizer and scorer.
#[derive(Clone)]
pub struct SpanExtractor {
    tokenizer: Arc<dyn QaTokenizer>,
    scorer: Arc<dyn SpanScorer>,
    max_seq_len: usize,
}

impl SpanExtractor {
    /// Create an extractor limited to `max_seq_len` tokens per pair.
    pub fn new(
        tokenizer: Arc<dyn QaTokenizer>,
        scorer: Arc<dyn SpanScorer>,
        max_seq_len: usize,
    ) -> Self {
        Self { tokenizer, scorer, max_seq_len }
    }

    /// The configured pair length limit.
    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// Extract the answer to `question` from `context`.
    ///
    /// Only the context is shortened to fit `max_seq_len`. The question is
    /// never truncated, so a question longer than `max_seq_len - 3` tokens
    /// cannot be encoded at all.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidInput`] when the question exceeds that limit
    /// and propagates tokenizer failures. Returns [`QaError::ScoringError`]
    /// when the scorer fails or returns logits of the wrong length.
    pub async fn extract(&self, question: &str, context: &str) -> Result<AnswerSpan> {
        let pair =
            TokenizedPair::encode(self.tokenizer.as_ref(), question, context, self.max_seq_len)?;
        let logits = self.scorer.score(&pair).await.map_err(|e| match e {
            QaError::ScoringError { .. } => e,
            other => QaError::ScoringError {
                scorer: self.scorer.name().to_string(),
                message: other.to_string(),
            },
        })?;

        self.decode(&pair, &logits)
    }

    /// Decode logits for `pair` into an answer span.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ScoringError`] if either logit vector does not have
    /// one entry per token.
    pub fn decode(&self, pair: &TokenizedPair, logits: &SpanLogits) -> Result<AnswerSpan> {
        for (label, scores) in [("start", &logits.start), ("end", &logits.end)] {
            if scores.len() != pair.len() {
                return Err(QaError::ScoringError {
                    scorer: self.scorer.name().to_string(),
                    message: format!(
                        "{label} logits have {} entries for {} tokens",
                        scores.len(),
                        pair.len()
                    ),
                });
            }
        }

        let malformed = || QaError::ScoringError {
            scorer: self.scorer.name().to_string(),
            message: "logits contain no comparable values".to_string(),
        };
        let start_index = argmax(&logits.start).ok_or_else(malformed)?;
        let end_index = argmax(&logits.end).ok_or_else(malformed)?;

        let text = if end_index < start_index {
            String::new()
        } else {
            let ids = &pair.input_ids[start_index..=end_index];
            self.tokenizer.decode(ids)?.trim().to_string()
        };

        debug!(start_index, end_index, answer_len = text.len(), "decoded span");
        Ok(AnswerSpan { text, start_index, end_index })
    }
}

impl std::fmt::Debug for SpanExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanExtractor")
            .field("scorer", &self.scorer.name())
            .field("max_seq_len", &self.max_seq_len)
            .finish()
    }
}

/// Word-level tokenizer with a vocabulary that grows as text is encoded.
///
/// Words are whitespace-separated and case-preserving. Decoding joins words
/// with spaces. Ids 0 to 3 are reserved for `[PAD]`, `[UNK]`, `[CLS]` and
/// `[SEP]`; the same spellings inside user text are ordinary words with ids
/// of their own, so they survive decoding and never act as separators.
///
/// The vocabulary is session-scoped: ids stay stable until [`clear`] is
/// called, and it grows with every distinct word seen, questions included.
/// Clearing while a question is being answered would mix ids from two
/// vocabularies, so only clear between sessions.
///
/// [`clear`]: WhitespaceTokenizer::clear
#[derive(Debug)]
pub struct WhitespaceTokenizer {
    vocab: RwLock<Vocab>,
}

#[derive(Debug)]
struct Vocab {
    /// Ordinary words only; reserved ids are never looked up by spelling.
    ids: HashMap<String, u32>,
    words: Vec<String>,
}

impl Vocab {
    fn reserved() -> Self {
        Self { ids: HashMap::new(), words: SPECIAL.iter().map(|s| s.to_string()).collect() }
    }
}

const PAD: &str = "[PAD]";
const UNK: &str = "[UNK]";
const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const SPECIAL: [&str; 4] = [PAD, UNK, CLS, SEP];

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self { vocab: RwLock::new(Vocab::reserved()) }
    }
}

impl WhitespaceTokenizer {
    /// Create a tokenizer holding only the special tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known tokens, special tokens included.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::TokenizerError`] if the vocabulary lock is poisoned.
    pub fn vocab_size(&self) -> Result<usize> {
        Ok(self.vocab.read().map_err(|_| poisoned())?.words.len())
    }

    /// Forget every learned word, keeping only the reserved tokens.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::TokenizerError`] if the vocabulary lock is poisoned.
    pub fn clear(&self) -> Result<()> {
        *self.vocab.write().map_err(|_| poisoned())? = Vocab::reserved();
        Ok(())
    }

    fn is_special(id: u32) -> bool {
        (id as usize) < SPECIAL.len()
    }
}

fn poisoned() -> QaError {
    QaError::TokenizerError("vocabulary lock poisoned".to_string())
}

impl QaTokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut vocab = self.vocab.write().map_err(|_| poisoned())?;
        let mut ids = Vec::new();
        for word in text.split_whitespace() {
            let id = match vocab.ids.get(word) {
                Some(&id) => id,
                None => {
                    let id = u32::try_from(vocab.words.len()).map_err(|_| {
                        QaError::TokenizerError("vocabulary exceeds u32 ids".to_string())
                    })?;
                    vocab.ids.insert(word.to_string(), id);
                    vocab.words.push(word.to_string());
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let vocab = self.vocab.read().map_err(|_| poisoned())?;
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| !Self::is_special(id))
            .map(|&id| vocab.words.get(id as usize).map_or(UNK, String::as_str))
            .collect();
        Ok(words.join(" "))
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens { cls: 2, sep: 3 }
    }
}
