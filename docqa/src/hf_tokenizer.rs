//! HuggingFace tokenizer adapter.
//!
//! This module is only available when the `tokenizers` feature is enabled.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{QaError, Result};
use crate::extraction::{QaTokenizer, SpecialTokens};

/// Candidate `(cls, sep)` spellings, BERT first then RoBERTa.
const SPECIAL_SPELLINGS: [(&str, &str); 2] = [("[CLS]", "[SEP]"), ("<s>", "</s>")];

/// A [`QaTokenizer`] backed by a `tokenizer.json` from the HuggingFace hub.
///
/// Truncation and padding configured in the file are switched off: pair
/// layout and context truncation are handled by
/// [`TokenizedPair::encode`](crate::TokenizedPair::encode).
///
/// # Example
///
/// ```rust,ignore
/// use docqa::HfTokenizer;
///
/// let tokenizer = HfTokenizer::from_file("models/legal-bert/tokenizer.json")?;
/// let ids = tokenizer.encode("statute of limitations")?;
/// ```
pub struct HfTokenizer {
    tokenizer: Tokenizer,
    special: SpecialTokens,
}

impl HfTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            QaError::TokenizerError(format!("cannot load '{}': {e}", path.display()))
        })?;
        Self::from_tokenizer(tokenizer)
    }

    /// Load a tokenizer from serialized `tokenizer.json` bytes.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let tokenizer = Tokenizer::from_bytes(bytes)
            .map_err(|e| QaError::TokenizerError(format!("failed to deserialize: {e}")))?;
        Self::from_tokenizer(tokenizer)
    }

    /// Wrap an already-constructed tokenizer.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::TokenizerError`] if the vocabulary has no known
    /// classification/separator token pair.
    pub fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer
            .with_truncation(None)
            .map_err(|e| QaError::TokenizerError(format!("cannot disable truncation: {e}")))?;
        tokenizer.with_padding(None);

        let special = SPECIAL_SPELLINGS
            .iter()
            .find_map(|(cls, sep)| {
                let cls = tokenizer.token_to_id(cls)?;
                let sep = tokenizer.token_to_id(sep)?;
                Some(SpecialTokens { cls, sep })
            })
            .ok_or_else(|| {
                QaError::TokenizerError("vocabulary has no [CLS]/[SEP] or <s>/</s> tokens".into())
            })?;

        Ok(Self { tokenizer, special })
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

impl QaTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| QaError::TokenizerError(format!("encoding failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| QaError::TokenizerError(format!("decoding failed: {e}")))
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("vocab_size", &self.vocab_size())
            .field("special", &self.special)
            .finish()
    }
}
