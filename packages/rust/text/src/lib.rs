//! Tokenization, vocabulary construction, and document-term counting.
//!
//! This crate provides:
//! - [`Tokenizer`]: lowercase alphanumeric tokens with stopword removal
//! - [`StopWords`]: the built-in English list plus user additions
//! - [`Vectorizer`]: builds a [`Vocabulary`] and a [`DocumentTermMatrix`]

pub mod stopwords;
pub mod tokenizer;
pub mod vectorizer;

pub use stopwords::{ENGLISH_STOP_WORDS, StopWords};
pub use tokenizer::Tokenizer;
pub use vectorizer::{DocumentTermMatrix, Vectorizer, Vocabulary};
