//! Corpus loading: enumerate documents at a location, extract their text
//! concurrently, and apply the configured failure policy.
//!
//! This crate provides:
//! - [`CorpusLoader`]: builds a [`Corpus`](topiclens_shared::Corpus) from a file or directory
//! - [`CancellationFlag`]: cooperative cancellation checked between documents
//! - [`walk::enumerate`]: candidate document enumeration

pub mod loader;
pub mod walk;

pub use loader::{CancellationFlag, CorpusLoader, LoadOptions};
