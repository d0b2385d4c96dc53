//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa::{
    EmbeddingProvider, QaConfig, QaError, QaPipeline, QaTokenizer, Result, SpanLogits,
    SpanScorer, TokenizedPair, WhitespaceTokenizer,
};

/// Lowercased alphanumeric words of `text`.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Bag-of-words embedder hashing each word into a fixed number of buckets.
///
/// Fails for any text containing `fail_marker`, if one is set.
pub struct HashingEmbedder {
    dimensions: usize,
    fail_marker: Option<String>,
    calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fail_marker: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in words(text) {
            vector[(fnv1a(&word) % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(QaError::EmbeddingError {
                    provider: "Hashing".into(),
                    message: format!("refusing text containing '{marker}'"),
                });
            }
        }
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Scores the first occurrence of a phrase inside the context as the answer.
///
/// When the phrase is absent, start and end both point at `[CLS]`, which
/// decodes to an empty answer.
pub struct PhraseScorer {
    tokenizer: Arc<dyn QaTokenizer>,
    phrase: String,
    fail: bool,
    calls: AtomicUsize,
}

impl PhraseScorer {
    pub fn new(tokenizer: Arc<dyn QaTokenizer>, phrase: &str) -> Self {
        Self { tokenizer, phrase: phrase.to_string(), fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpanScorer for PhraseScorer {
    async fn score(&self, pair: &TokenizedPair) -> Result<SpanLogits> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(QaError::ScoringError {
                scorer: "phrase".into(),
                message: "model crashed".into(),
            });
        }

        let target = self.tokenizer.encode(&self.phrase)?;
        let context = &pair.input_ids[pair.context_start..pair.context_end];
        let (start, end) = context
            .windows(target.len().max(1))
            .position(|window| window == target.as_slice())
            .map(|offset| {
                let start = pair.context_start + offset;
                (start, start + target.len() - 1)
            })
            .unwrap_or((0, 0));

        let one_hot = |hot: usize| -> Vec<f32> {
            (0..pair.len()).map(|i| if i == hot { 10.0 } else { -1.0 }).collect()
        };
        Ok(SpanLogits { start: one_hot(start), end: one_hot(end) })
    }

    fn name(&self) -> &str {
        "phrase"
    }
}

/// A pipeline wired with the test doubles above.
pub struct Fixture {
    pub pipeline: QaPipeline,
    pub embedder: Arc<HashingEmbedder>,
    pub scorer: Arc<PhraseScorer>,
}

pub fn fixture(config: QaConfig, embedder: HashingEmbedder, phrase: &str) -> Fixture {
    fixture_with_scorer(config, embedder, |tokenizer| PhraseScorer::new(tokenizer, phrase))
}

pub fn fixture_with_scorer(
    config: QaConfig,
    embedder: HashingEmbedder,
    scorer: impl FnOnce(Arc<dyn QaTokenizer>) -> PhraseScorer,
) -> Fixture {
    let tokenizer: Arc<dyn QaTokenizer> = Arc::new(WhitespaceTokenizer::new());
    let embedder = Arc::new(embedder);
    let scorer = Arc::new(scorer(tokenizer.clone()));
    let pipeline = QaPipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .tokenizer(tokenizer)
        .scorer(scorer.clone())
        .build()
        .unwrap();
    Fixture { pipeline, embedder, scorer }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
