//! Dominant-topic assignment per document.

use ndarray::Array2;

use topiclens_shared::{Corpus, DocumentTopicAssignment, Result, TopicLensError};

/// Assign each corpus document the topic with the highest probability in its
/// row of `doc_topic`. Ties go to the lowest topic index.
pub fn assign_topics(
    doc_topic: &Array2<f64>,
    corpus: &Corpus,
) -> Result<Vec<DocumentTopicAssignment>> {
    if doc_topic.nrows() != corpus.len() {
        return Err(TopicLensError::invalid_parameter(
            "doc_topic",
            format!(
                "{} rows for a corpus of {} documents",
                doc_topic.nrows(),
                corpus.len()
            ),
        ));
    }
    if doc_topic.ncols() == 0 {
        return Err(TopicLensError::invalid_parameter(
            "doc_topic",
            "matrix has no topic columns",
        ));
    }

    Ok(doc_topic
        .rows()
        .into_iter()
        .zip(corpus.iter())
        .enumerate()
        .map(|(index, (row, document))| {
            let mut topic = 0;
            for (t, &p) in row.iter().enumerate() {
                if p > row[topic] {
                    topic = t;
                }
            }
            DocumentTopicAssignment {
                index,
                document: document.id.clone(),
                topic,
                score: row[topic],
            }
        })
        .collect())
}
