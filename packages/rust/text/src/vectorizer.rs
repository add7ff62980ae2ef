//! Vocabulary construction and document-term counting.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use ndarray::Array2;
use tracing::{debug, info, instrument};

use topiclens_shared::{Corpus, Result, TopicLensError, VectorizerConfig};

use crate::stopwords::StopWords;
use crate::tokenizer::Tokenizer;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Terms with stable indices, assigned in ascending lexicographic order.
///
/// Built once by [`Vectorizer::fit_transform`]; there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from already-sorted, deduplicated terms.
    fn from_sorted(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { terms, index }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term at `index`, if in range.
    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Terms in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

// ---------------------------------------------------------------------------
// DocumentTermMatrix
// ---------------------------------------------------------------------------

/// Documents × terms count matrix. Row `i` is corpus document `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTermMatrix {
    counts: Array2<u32>,
}

impl DocumentTermMatrix {
    /// Wrap an existing count matrix.
    pub fn from_counts(counts: Array2<u32>) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &Array2<u32> {
        &self.counts
    }

    pub fn n_documents(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_terms(&self) -> usize {
        self.counts.ncols()
    }

    /// Non-zero `(term index, count)` pairs of one row, in term order.
    pub fn row_entries(&self, row: usize) -> Vec<(usize, u32)> {
        self.counts
            .row(row)
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(j, &c)| (j, c))
            .collect()
    }

    /// Total count of each term across the corpus.
    pub fn term_frequencies(&self) -> Vec<u64> {
        self.counts
            .columns()
            .into_iter()
            .map(|col| col.iter().map(|&c| u64::from(c)).sum())
            .collect()
    }

    /// Token total of each document.
    pub fn document_lengths(&self) -> Vec<u64> {
        self.counts
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|&c| u64::from(c)).sum())
            .collect()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

// ---------------------------------------------------------------------------
// Vectorizer
// ---------------------------------------------------------------------------

/// Turns texts into a [`Vocabulary`] and a [`DocumentTermMatrix`].
#[derive(Debug, Clone)]
pub struct Vectorizer {
    tokenizer: Tokenizer,
    min_df: usize,
    max_df_ratio: f64,
    max_features: Option<usize>,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::from(&VectorizerConfig::default())
    }
}

impl From<&VectorizerConfig> for Vectorizer {
    fn from(config: &VectorizerConfig) -> Self {
        let stopwords = StopWords::english().with_extra(&config.extra_stopwords);
        Self {
            tokenizer: Tokenizer::new(config.min_token_len, stopwords),
            min_df: config.min_df,
            max_df_ratio: config.max_df_ratio,
            max_features: config.max_features,
        }
    }
}

/// Per-term statistics gathered while counting.
#[derive(Debug, Default, Clone, Copy)]
struct TermStats {
    doc_freq: usize,
    total: u64,
}

impl Vectorizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            min_df: 1,
            max_df_ratio: 1.0,
            max_features: None,
        }
    }

    /// Vectorize every document of `corpus` (failed documents count as empty).
    pub fn vectorize(&self, corpus: &Corpus) -> Result<(Vocabulary, DocumentTermMatrix)> {
        self.fit_transform(&corpus.texts())
    }

    /// Build the vocabulary from `texts` and count each text against it.
    #[instrument(skip_all, fields(documents = texts.len()))]
    pub fn fit_transform(&self, texts: &[&str]) -> Result<(Vocabulary, DocumentTermMatrix)> {
        let start = Instant::now();

        let per_doc: Vec<HashMap<String, u32>> = texts
            .iter()
            .map(|text| {
                let mut counts = HashMap::new();
                for token in self.tokenizer.tokenize(text) {
                    *counts.entry(token).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut stats: BTreeMap<&str, TermStats> = BTreeMap::new();
        for counts in &per_doc {
            for (term, &count) in counts {
                let entry = stats.entry(term.as_str()).or_default();
                entry.doc_freq += 1;
                entry.total += u64::from(count);
            }
        }

        if stats.is_empty() {
            return Err(TopicLensError::empty_vocabulary(
                "no terms remain after tokenization and stopword removal",
            ));
        }

        let observed = stats.len();
        let terms = self.prune(&stats, texts.len());
        if terms.is_empty() {
            return Err(TopicLensError::empty_vocabulary(format!(
                "all {observed} terms were pruned by document-frequency limits"
            )));
        }

        let vocabulary = Vocabulary::from_sorted(terms);
        let mut counts = Array2::<u32>::zeros((texts.len(), vocabulary.len()));
        for (i, doc) in per_doc.iter().enumerate() {
            for (term, &count) in doc {
                if let Some(j) = vocabulary.index_of(term) {
                    counts[[i, j]] = count;
                }
            }
        }
        let dtm = DocumentTermMatrix::from_counts(counts);

        debug!(observed, kept = vocabulary.len(), "vocabulary pruned");
        info!(
            documents = dtm.n_documents(),
            vocabulary_size = vocabulary.len(),
            total_tokens = dtm.total(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "vectorization complete"
        );

        Ok((vocabulary, dtm))
    }

    /// Apply `min_df`, `max_df_ratio`, and `max_features`. Returns the kept
    /// terms in ascending order.
    fn prune(&self, stats: &BTreeMap<&str, TermStats>, n_docs: usize) -> Vec<String> {
        let max_doc_count = self.max_df_ratio * n_docs as f64;

        let mut kept: Vec<(&str, TermStats)> = stats
            .iter()
            .filter(|(_, s)| s.doc_freq >= self.min_df && s.doc_freq as f64 <= max_doc_count)
            .map(|(t, s)| (*t, *s))
            .collect();

        if let Some(limit) = self.max_features {
            if kept.len() > limit {
                // Stable sort keeps alphabetical order among equal totals.
                kept.sort_by(|a, b| b.1.total.cmp(&a.1.total));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        kept.into_iter().map(|(t, _)| t.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topiclens_shared::{Document, ErrorKind};

    fn fit(texts: &[&str]) -> (Vocabulary, DocumentTermMatrix) {
        Vectorizer::default().fit_transform(texts).expect("vectorize")
    }

    #[test]
    fn fruit_scenario_counts() {
        let (vocab, dtm) = fit(&["apple banana apple", "banana cherry", "apple banana apple"]);

        assert_eq!(vocab.terms(), &["apple", "banana", "cherry"]);
        assert_eq!(dtm.counts().row(0).to_vec(), vec![2, 1, 0]);
        assert_eq!(dtm.counts().row(1).to_vec(), vec![0, 1, 1]);
        assert_eq!(dtm.counts().row(2).to_vec(), vec![2, 1, 0]);
    }

    #[test]
    fn shape_matches_corpus_and_vocabulary() {
        let texts = ["topic models", "latent dirichlet allocation", "", "models of topics"];
        let (vocab, dtm) = fit(&texts);
        assert_eq!(dtm.n_documents(), texts.len());
        assert_eq!(dtm.n_terms(), vocab.len());
        assert!(dtm.counts().row(2).iter().all(|&c| c == 0));
    }

    #[test]
    fn indices_are_alphabetical() {
        let (vocab, _) = fit(&["zebra mango apple"]);
        assert_eq!(vocab.index_of("apple"), Some(0));
        assert_eq!(vocab.index_of("mango"), Some(1));
        assert_eq!(vocab.index_of("zebra"), Some(2));
        assert_eq!(vocab.term(1), Some("mango"));
        assert_eq!(vocab.term(3), None);
        assert_eq!(vocab.index_of("the"), None);
    }

    #[test]
    fn only_stopwords_is_empty_vocabulary() {
        let err = Vectorizer::default()
            .fit_transform(&["the and of it was a"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyVocabulary);
    }

    #[test]
    fn empty_texts_are_empty_vocabulary() {
        let err = Vectorizer::default().fit_transform(&["", ""]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyVocabulary);
    }

    #[test]
    fn extra_stopwords_are_removed() {
        let config = VectorizerConfig {
            extra_stopwords: vec!["Banana".into()],
            ..VectorizerConfig::default()
        };
        let (vocab, _) = Vectorizer::from(&config)
            .fit_transform(&["apple banana cherry"])
            .expect("vectorize");
        assert_eq!(vocab.terms(), &["apple", "cherry"]);
    }

    #[test]
    fn min_df_drops_rare_terms() {
        let config = VectorizerConfig {
            min_df: 2,
            ..VectorizerConfig::default()
        };
        let (vocab, _) = Vectorizer::from(&config)
            .fit_transform(&["apple banana", "apple cherry", "apple banana"])
            .expect("vectorize");
        assert_eq!(vocab.terms(), &["apple", "banana"]);
    }

    #[test]
    fn max_df_ratio_drops_ubiquitous_terms() {
        let config = VectorizerConfig {
            max_df_ratio: 0.5,
            ..VectorizerConfig::default()
        };
        let (vocab, _) = Vectorizer::from(&config)
            .fit_transform(&["apple banana", "apple cherry", "apple banana", "apple date"])
            .expect("vectorize");
        assert_eq!(vocab.terms(), &["banana", "cherry", "date"]);
    }

    #[test]
    fn max_features_keeps_most_frequent_with_alphabetical_ties() {
        let config = VectorizerConfig {
            max_features: Some(2),
            ..VectorizerConfig::default()
        };
        let (vocab, dtm) = Vectorizer::from(&config)
            .fit_transform(&["cherry cherry cherry banana apple", "date apple"])
            .expect("vectorize");
        // cherry=3, apple=2, banana=1, date=1
        assert_eq!(vocab.terms(), &["apple", "cherry"]);
        assert_eq!(dtm.counts().row(0).to_vec(), vec![1, 3]);

        let config = VectorizerConfig {
            max_features: Some(3),
            ..VectorizerConfig::default()
        };
        let (vocab, _) = Vectorizer::from(&config)
            .fit_transform(&["cherry cherry cherry banana apple", "date apple"])
            .expect("vectorize");
        assert_eq!(vocab.terms(), &["apple", "banana", "cherry"]);
    }

    #[test]
    fn pruning_everything_is_empty_vocabulary() {
        let config = VectorizerConfig {
            min_df: 5,
            ..VectorizerConfig::default()
        };
        let err = Vectorizer::from(&config)
            .fit_transform(&["apple", "banana"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyVocabulary);
    }

    #[test]
    fn matrix_statistics() {
        let (_, dtm) = fit(&["apple banana apple", "banana cherry"]);
        assert_eq!(dtm.term_frequencies(), vec![2, 2, 1]);
        assert_eq!(dtm.document_lengths(), vec![3, 2]);
        assert_eq!(dtm.total(), 5);
        assert_eq!(dtm.row_entries(1), vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn vectorize_reads_corpus_in_order() {
        let corpus = Corpus::new(vec![
            Document::from_text("a.txt", "banana"),
            Document::from_text("b.txt", "apple"),
        ]);
        let (vocab, dtm) = Vectorizer::default().vectorize(&corpus).expect("vectorize");
        assert_eq!(vocab.terms(), &["apple", "banana"]);
        assert_eq!(dtm.counts().row(0).to_vec(), vec![0, 1]);
        assert_eq!(dtm.counts().row(1).to_vec(), vec![1, 0]);
    }
}
