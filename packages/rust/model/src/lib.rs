//! Topic model fitting and interpretation.
//!
//! - [`LdaModel`] fits Latent Dirichlet Allocation to a document-term matrix
//! - [`summarize_topics`] ranks each topic's terms
//! - [`assign_topics`] picks each document's dominant topic

pub mod assign;
pub mod lda;
pub mod summary;

pub use assign::assign_topics;
pub use lda::{LdaConfig, LdaModel, digamma};
pub use summary::{rank_terms, summarize_topics};
