//! Configuration for the question-answering pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// Smallest usable sequence: `[CLS]`, one question token, and two `[SEP]`s.
const MIN_SEQ_LEN: usize = 4;

/// Configuration parameters for the question-answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QaConfig {
    /// Chunk budget, measured as the sum of word lengths (separators excluded).
    pub chunk_size: usize,
    /// Maximum token length of the `(question, context)` pair fed to the scorer.
    pub max_seq_len: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self { chunk_size: 500, max_seq_len: 512 }
    }
}

impl QaConfig {
    /// Create a new builder for constructing a [`QaConfig`].
    pub fn builder() -> QaConfigBuilder {
        QaConfigBuilder::default()
    }

    /// Check that the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `max_seq_len < 4`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(QaError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.max_seq_len < MIN_SEQ_LEN {
            return Err(QaError::ConfigError(format!(
                "max_seq_len ({}) must be at least {MIN_SEQ_LEN}",
                self.max_seq_len
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`QaConfig`].
#[derive(Debug, Clone, Default)]
pub struct QaConfigBuilder {
    config: QaConfig,
}

impl QaConfigBuilder {
    /// Set the chunk budget in word characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the maximum token length of the scored `(question, context)` pair.
    pub fn max_seq_len(mut self, len: usize) -> Self {
        self.config.max_seq_len = len;
        self
    }

    /// Build the [`QaConfig`], validating its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::ConfigError`] under the conditions listed on
    /// [`QaConfig::validate`].
    pub fn build(self) -> Result<QaConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
