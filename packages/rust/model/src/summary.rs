//! Per-topic top-term summaries.

use ndarray::{ArrayView1, Axis};
use tracing::debug;

use topiclens_shared::{Result, TermWeight, TopicLensError, TopicSummary};
use topiclens_text::Vocabulary;

use crate::lda::LdaModel;

/// Summarize every topic of `model` by its `top_n` highest-weighted terms.
///
/// Terms are ordered by descending weight; equal weights fall back to
/// vocabulary order. Weights are the normalized topic-term probabilities and
/// `prevalence` is the topic's mean share across documents.
pub fn summarize_topics(
    model: &LdaModel,
    vocabulary: &Vocabulary,
    top_n: usize,
) -> Result<Vec<TopicSummary>> {
    if top_n == 0 {
        return Err(TopicLensError::invalid_parameter(
            "top_terms",
            "must be at least 1",
        ));
    }

    let distribution = model.topic_term_distribution();
    if distribution.ncols() != vocabulary.len() {
        return Err(TopicLensError::invalid_parameter(
            "vocabulary",
            format!(
                "model has {} terms but vocabulary has {}",
                distribution.ncols(),
                vocabulary.len()
            ),
        ));
    }

    let prevalence = model.doc_topic().mean_axis(Axis(0));

    let summaries = distribution
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(topic, weights)| {
            let terms = rank_terms(weights, vocabulary, top_n);

            TopicSummary {
                topic,
                terms,
                prevalence: prevalence.as_ref().map_or(0.0, |p| p[topic]),
            }
        })
        .collect::<Vec<_>>();

    debug!(topics = summaries.len(), top_n, "summarized topics");
    Ok(summaries)
}

/// The `top_n` highest-weighted terms of one topic row.
///
/// Equal weights keep ascending vocabulary order. Indices past the end of
/// `vocabulary` are skipped.
pub fn rank_terms(
    weights: ArrayView1<'_, f64>,
    vocabulary: &Vocabulary,
    top_n: usize,
) -> Vec<TermWeight> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));

    order
        .into_iter()
        .take(top_n)
        .filter_map(|i| {
            vocabulary.term(i).map(|term| TermWeight {
                term: term.to_string(),
                weight: weights[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lda::LdaConfig;
    use ndarray::array;
    use topiclens_shared::ErrorKind;
    use topiclens_text::Vectorizer;

    fn fitted(texts: &[&str], k: usize) -> (LdaModel, Vocabulary) {
        let (vocab, dtm) = Vectorizer::default().fit_transform(texts).expect("vectorize");
        let model = LdaModel::fit(&dtm, &LdaConfig::new(k)).expect("fit");
        (model, vocab)
    }

    #[test]
    fn one_summary_per_topic_with_requested_terms() {
        let (model, vocab) = fitted(
            &[
                "stocks bonds markets trading investors",
                "football goals league match players",
                "markets stocks investors bonds",
            ],
            2,
        );
        let summaries = summarize_topics(&model, &vocab, 3).expect("summarize");
        assert_eq!(summaries.len(), 2);
        for (i, s) in summaries.iter().enumerate() {
            assert_eq!(s.topic, i);
            assert_eq!(s.terms.len(), 3);
        }
    }

    #[test]
    fn term_count_is_capped_by_vocabulary() {
        let (model, vocab) = fitted(&["apple banana apple", "banana cherry", "apple banana"], 2);
        let summaries = summarize_topics(&model, &vocab, 10).expect("summarize");
        for s in &summaries {
            assert_eq!(s.terms.len(), 3);
            let mut terms = s.term_list();
            terms.sort();
            assert_eq!(terms, vec!["apple", "banana", "cherry"]);
        }
    }

    #[test]
    fn terms_are_sorted_by_descending_weight() {
        let (model, vocab) = fitted(&["apple banana apple", "banana cherry", "apple banana"], 2);
        for s in summarize_topics(&model, &vocab, 3).expect("summarize") {
            assert!(s.terms.windows(2).all(|w| w[0].weight >= w[1].weight));
        }
    }

    #[test]
    fn tied_weights_keep_vocabulary_order() {
        let (vocab, _) = Vectorizer::default()
            .fit_transform(&["cherry apple banana"])
            .expect("vectorize");
        let terms = |row: ArrayView1<'_, f64>, n| {
            rank_terms(row, &vocab, n)
                .into_iter()
                .map(|t| t.term)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            terms(array![0.5, 0.5, 0.5].view(), 3),
            vec!["apple", "banana", "cherry"]
        );
        assert_eq!(
            terms(array![0.2, 0.4, 0.4].view(), 3),
            vec!["banana", "cherry", "apple"]
        );
        assert_eq!(terms(array![0.3, 0.3, 0.4].view(), 2), vec!["cherry", "apple"]);
    }

    #[test]
    fn prevalence_sums_to_one() {
        let (model, vocab) = fitted(&["apple banana apple", "banana cherry", "apple banana"], 2);
        let summaries = summarize_topics(&model, &vocab, 2).expect("summarize");
        let total: f64 = summaries.iter().map(|s| s.prevalence).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_top_terms_is_rejected() {
        let (model, vocab) = fitted(&["apple banana", "banana cherry"], 1);
        let err = summarize_topics(&model, &vocab, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn mismatched_vocabulary_is_rejected() {
        let (model, _) = fitted(&["apple banana", "banana cherry"], 1);
        let (other, _) = Vectorizer::default()
            .fit_transform(&["zebra"])
            .expect("vectorize");
        let err = summarize_topics(&model, &other, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
