//! Lowercasing tokenizer.

use std::sync::LazyLock;

use regex::Regex;

use crate::stopwords::StopWords;

/// Splits text into lowercase alphanumeric tokens, dropping stopwords and
/// tokens shorter than `min_token_len` characters.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    min_token_len: usize,
    stopwords: StopWords,
}

impl Tokenizer {
    pub fn new(min_token_len: usize, stopwords: StopWords) -> Self {
        Self {
            min_token_len,
            stopwords,
        }
    }

    /// Tokenize `text`, preserving token order (duplicates kept).
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        static WORD_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex"));

        let lowered = text.to_lowercase();
        WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.chars().count() >= self.min_token_len)
            .filter(|t| !self.stopwords.contains(t))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(2, StopWords::english())
    }
}
