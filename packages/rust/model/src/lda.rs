//! Latent Dirichlet Allocation fitted with batch variational Bayes.
//!
//! Documents are mixtures of K topics with a Dirichlet(alpha) prior over
//! proportions; topics are distributions over the vocabulary with a
//! Dirichlet(eta) prior over term weights.
//!
//! Each EM iteration runs a full E-step over every document (per-document
//! variational Dirichlet `gamma`, iterated to convergence) and then sets the
//! topic-term variational parameter `lambda = eta + sufficient statistics`.
//! `lambda` starts from Gamma(100, 0.01) draws of a seeded [`StdRng`], and
//! every `gamma` starts from ones, so a fit is fully determined by the input
//! matrix, K, and the seed.

use std::time::{Duration, Instant};

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};
use tracing::{debug, info, instrument};

use topiclens_shared::{ModelConfig, Result, TopicLensError};
use topiclens_text::DocumentTermMatrix;

/// Guard against division by zero in the variational updates.
const EPS: f64 = f64::EPSILON;

/// Shape and scale of the Gamma distribution `lambda` is initialized from.
const INIT_GAMMA_SHAPE: f64 = 100.0;
const INIT_GAMMA_SCALE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// LDA model configuration.
#[derive(Debug, Clone)]
pub struct LdaConfig {
    /// Number of topics (K).
    pub n_topics: usize,
    /// Document-topic prior; `1/K` when `None`.
    pub alpha: Option<f64>,
    /// Topic-term prior; `1/K` when `None`.
    pub eta: Option<f64>,
    /// EM iterations over the corpus.
    pub max_iter: usize,
    /// Inner iterations per document in the E-step.
    pub max_doc_update_iter: usize,
    /// E-step convergence threshold on the mean absolute change of `gamma`.
    pub mean_change_tol: f64,
    /// Evaluate perplexity every this many iterations (0 disables early stopping).
    pub evaluate_every: usize,
    /// Stop when perplexity changes by less than this.
    pub perp_tol: f64,
    /// Seed for the `lambda` initialization.
    pub random_seed: u64,
    /// Abort the fit once this much wall time has elapsed.
    pub timeout: Option<Duration>,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self::from_model_config(5, &ModelConfig::default())
    }
}

impl LdaConfig {
    /// Create a new configuration with the specified number of topics.
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            ..Default::default()
        }
    }

    /// Build from the `[model]` config section.
    pub fn from_model_config(n_topics: usize, model: &ModelConfig) -> Self {
        Self {
            n_topics,
            alpha: model.alpha,
            eta: model.eta,
            max_iter: model.max_iter,
            max_doc_update_iter: model.max_doc_update_iter,
            mean_change_tol: model.mean_change_tol,
            evaluate_every: model.evaluate_every,
            perp_tol: model.perp_tol,
            random_seed: model.seed,
            timeout: model.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn eta(mut self, eta: f64) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = n;
        self
    }

    pub fn evaluate_every(mut self, n: usize) -> Self {
        self.evaluate_every = n;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Effective document-topic prior.
    pub fn doc_topic_prior(&self) -> f64 {
        self.alpha.unwrap_or(1.0 / self.n_topics.max(1) as f64)
    }

    /// Effective topic-term prior.
    pub fn topic_word_prior(&self) -> f64 {
        self.eta.unwrap_or(1.0 / self.n_topics.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A fitted LDA model.
#[derive(Debug, Clone)]
pub struct LdaModel {
    config: LdaConfig,
    /// K × V variational topic-term parameters (unnormalized).
    term_topic: Array2<f64>,
    /// D × K document-topic probabilities (rows sum to 1).
    doc_topic: Array2<f64>,
    iterations: usize,
    perplexity: f64,
}

impl LdaModel {
    /// Fit a model to `dtm`.
    ///
    /// Fails with `ModelFit` when K is zero or exceeds the document count,
    /// the matrix is empty, a prior is not positive, the fit diverges, or the
    /// configured timeout elapses.
    #[instrument(
        skip_all,
        fields(topics = config.n_topics, documents = dtm.n_documents(), terms = dtm.n_terms())
    )]
    pub fn fit(dtm: &DocumentTermMatrix, config: &LdaConfig) -> Result<Self> {
        let start = Instant::now();
        validate(dtm, config)?;

        let k = config.n_topics;
        let alpha = config.doc_topic_prior();
        let eta = config.topic_word_prior();
        // A timeout too large to represent as an instant means no deadline.
        let deadline = config.timeout.and_then(|t| start.checked_add(t));
        let docs = sparse_rows(dtm);

        info!(
            topics = k,
            alpha,
            eta,
            max_iter = config.max_iter,
            seed = config.random_seed,
            "fitting LDA"
        );

        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let init = Gamma::new(INIT_GAMMA_SHAPE, INIT_GAMMA_SCALE)
            .map_err(|e| TopicLensError::model_fit(format!("invalid initializer: {e}")))?;
        let mut lambda = Array2::from_shape_fn((k, dtm.n_terms()), |_| init.sample(&mut rng));

        let mut last_perplexity: Option<f64> = None;
        let mut iterations = 0;

        for iteration in 0..config.max_iter {
            let exp_topic_word = exp_dirichlet_expectation_2d(&lambda);
            let (gamma, sstats) =
                e_step(&docs, &exp_topic_word, alpha, config, deadline, true)?;

            let sstats = sstats.unwrap_or_else(|| Array2::zeros(lambda.raw_dim()));
            lambda = sstats * &exp_topic_word + eta;
            ensure_finite(&lambda, "topic-term parameters")?;
            iterations = iteration + 1;

            if config.evaluate_every > 0 && iterations % config.evaluate_every == 0 {
                let perplexity =
                    perplexity(&docs, &normalize_rows(&gamma), &normalize_rows(&lambda));
                debug!(iteration = iterations, perplexity, "EM iteration");

                if let Some(last) = last_perplexity {
                    if (last - perplexity).abs() < config.perp_tol {
                        debug!(iteration = iterations, "perplexity converged");
                        break;
                    }
                }
                last_perplexity = Some(perplexity);
            } else {
                debug!(iteration = iterations, "EM iteration");
            }

            check_deadline(deadline, config)?;
        }

        let exp_topic_word = exp_dirichlet_expectation_2d(&lambda);
        let (gamma, _) = e_step(&docs, &exp_topic_word, alpha, config, deadline, false)?;
        let doc_topic = normalize_rows(&gamma);
        ensure_finite(&doc_topic, "document-topic distribution")?;

        let perplexity = perplexity(&docs, &doc_topic, &normalize_rows(&lambda));

        info!(
            iterations,
            perplexity,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "LDA fit complete"
        );

        Ok(Self {
            config: config.clone(),
            term_topic: lambda,
            doc_topic,
            iterations,
            perplexity,
        })
    }

    pub fn n_topics(&self) -> usize {
        self.config.n_topics
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    /// K × V term weights used for ranking terms within a topic.
    pub fn term_topic(&self) -> &Array2<f64> {
        &self.term_topic
    }

    /// D × K document-topic probabilities.
    pub fn doc_topic(&self) -> &Array2<f64> {
        &self.doc_topic
    }

    /// Term-topic weights normalized so each topic row sums to 1.
    pub fn topic_term_distribution(&self) -> Array2<f64> {
        normalize_rows(&self.term_topic)
    }

    /// EM iterations actually run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Perplexity of the training matrix under the fitted model.
    pub fn perplexity(&self) -> f64 {
        self.perplexity
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// One pass of per-document variational updates.
///
/// Returns the D × K `gamma` matrix and, when requested, the K × V
/// sufficient statistics already multiplied by `exp_topic_word`.
fn e_step(
    docs: &[Vec<(usize, f64)>],
    exp_topic_word: &Array2<f64>,
    alpha: f64,
    config: &LdaConfig,
    deadline: Option<Instant>,
    collect_sstats: bool,
) -> Result<(Array2<f64>, Option<Array2<f64>>)> {
    let k = exp_topic_word.nrows();
    let mut doc_topic = Array2::<f64>::zeros((docs.len(), k));
    let mut sstats = collect_sstats.then(|| Array2::<f64>::zeros(exp_topic_word.raw_dim()));

    for (d, doc) in docs.iter().enumerate() {
        check_deadline(deadline, config)?;

        let mut gamma = Array1::<f64>::ones(k);
        let mut exp_doc_topic = exp_dirichlet_expectation_1d(&gamma);

        for _ in 0..config.max_doc_update_iter {
            let last = gamma.clone();
            let norm_phi = normalizers(doc, &exp_doc_topic, exp_topic_word);

            for t in 0..k {
                let weighted: f64 = doc
                    .iter()
                    .zip(&norm_phi)
                    .map(|(&(w, c), &n)| c / n * exp_topic_word[[t, w]])
                    .sum();
                gamma[t] = alpha + exp_doc_topic[t] * weighted;
            }
            exp_doc_topic = exp_dirichlet_expectation_1d(&gamma);

            let change = (&gamma - &last).mapv(f64::abs).mean().unwrap_or(0.0);
            if change < config.mean_change_tol {
                break;
            }
        }

        if let Some(sstats) = sstats.as_mut() {
            let norm_phi = normalizers(doc, &exp_doc_topic, exp_topic_word);
            for (&(w, c), &n) in doc.iter().zip(&norm_phi) {
                for t in 0..k {
                    sstats[[t, w]] += exp_doc_topic[t] * c / n;
                }
            }
        }

        doc_topic.row_mut(d).assign(&gamma);
    }

    let sstats = sstats.map(|s| s * exp_topic_word);
    Ok((doc_topic, sstats))
}

/// `Σ_k exp_doc_topic[k] · exp_topic_word[k, w] + EPS` for each term of a document.
fn normalizers(
    doc: &[(usize, f64)],
    exp_doc_topic: &Array1<f64>,
    exp_topic_word: &Array2<f64>,
) -> Vec<f64> {
    doc.iter()
        .map(|&(w, _)| {
            exp_doc_topic
                .iter()
                .enumerate()
                .map(|(t, &e)| e * exp_topic_word[[t, w]])
                .sum::<f64>()
                + EPS
        })
        .collect()
}

/// `exp(E[log θ])` for a Dirichlet with parameter `alpha`.
fn exp_dirichlet_expectation_1d(alpha: &Array1<f64>) -> Array1<f64> {
    let psi_sum = digamma(alpha.sum());
    alpha.mapv(|a| (digamma(a) - psi_sum).exp())
}

/// Row-wise `exp(E[log β])`.
fn exp_dirichlet_expectation_2d(lambda: &Array2<f64>) -> Array2<f64> {
    let mut out = lambda.clone();
    for mut row in out.rows_mut() {
        let psi_sum = digamma(row.sum());
        row.mapv_inplace(|x| (digamma(x) - psi_sum).exp());
    }
    out
}

/// `exp(-Σ c · ln p(w|d) / Σ c)` with `p(w|d) = Σ_k θ_dk φ_kw`.
fn perplexity(docs: &[Vec<(usize, f64)>], theta: &Array2<f64>, phi: &Array2<f64>) -> f64 {
    let mut log_likelihood = 0.0;
    let mut tokens = 0.0;

    for (d, doc) in docs.iter().enumerate() {
        let row = theta.row(d);
        for &(w, c) in doc {
            let p: f64 = row
                .iter()
                .enumerate()
                .map(|(t, &th)| th * phi[[t, w]])
                .sum();
            log_likelihood += c * (p + EPS).ln();
            tokens += c;
        }
    }

    if tokens == 0.0 {
        return f64::NAN;
    }
    (-log_likelihood / tokens).exp()
}

/// Digamma function ψ(x) for x > 0.
///
/// Shifts x above 6 with the recurrence ψ(x) = ψ(x + 1) − 1/x, then applies
/// the asymptotic expansion.
pub fn digamma(x: f64) -> f64 {
    let mut x = x;
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate(dtm: &DocumentTermMatrix, config: &LdaConfig) -> Result<()> {
    let k = config.n_topics;
    let d = dtm.n_documents();

    if k == 0 {
        return Err(TopicLensError::model_fit("topic count must be at least 1"));
    }
    if d == 0 {
        return Err(TopicLensError::model_fit("document-term matrix has no rows"));
    }
    if k > d {
        return Err(TopicLensError::model_fit(format!(
            "{k} topics requested but the corpus has only {d} documents"
        )));
    }
    if dtm.n_terms() == 0 {
        return Err(TopicLensError::model_fit("document-term matrix has no columns"));
    }
    if dtm.total() == 0 {
        return Err(TopicLensError::model_fit("document-term matrix has no counts"));
    }
    if config.max_iter == 0 {
        return Err(TopicLensError::model_fit("max_iter must be at least 1"));
    }
    for (name, prior) in [
        ("alpha", config.doc_topic_prior()),
        ("eta", config.topic_word_prior()),
    ] {
        if !(prior.is_finite() && prior > 0.0) {
            return Err(TopicLensError::model_fit(format!(
                "{name} must be positive, got {prior}"
            )));
        }
    }
    Ok(())
}

fn check_deadline(deadline: Option<Instant>, config: &LdaConfig) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(TopicLensError::model_fit(format!(
            "fit exceeded timeout of {:?}",
            config.timeout.unwrap_or_default()
        ))),
        _ => Ok(()),
    }
}

fn ensure_finite(matrix: &Array2<f64>, what: &str) -> Result<()> {
    if matrix.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TopicLensError::model_fit(format!("{what} contain non-finite values")))
    }
}

/// Non-zero `(term, count)` pairs of every row.
fn sparse_rows(dtm: &DocumentTermMatrix) -> Vec<Vec<(usize, f64)>> {
    (0..dtm.n_documents())
        .map(|d| {
            dtm.row_entries(d)
                .into_iter()
                .map(|(w, c)| (w, f64::from(c)))
                .collect()
        })
        .collect()
}

/// Divide each row by its sum. All-zero rows are left as zeros.
fn normalize_rows(matrix: &Array2<f64>) -> Array2<f64> {
    let mut out = matrix.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let sum = row.sum();
        if sum > 0.0 {
            row /= sum;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use topiclens_shared::ErrorKind;
    use topiclens_text::Vectorizer;

    fn dtm(texts: &[&str]) -> DocumentTermMatrix {
        Vectorizer::default().fit_transform(texts).expect("vectorize").1
    }

    fn fruit() -> DocumentTermMatrix {
        dtm(&["apple banana apple", "banana cherry", "apple banana apple"])
    }

    fn argmax(row: ndarray::ArrayView1<f64>) -> usize {
        let mut best = 0;
        for (i, &v) in row.iter().enumerate() {
            if v > row[best] {
                best = i;
            }
        }
        best
    }

    #[test]
    fn digamma_known_values() {
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        assert!((digamma(0.5) + 1.963_510_026_021_423_5).abs() < 1e-10);
        assert!((digamma(10.0) - 2.251_752_589_066_721).abs() < 1e-10);
    }

    #[test]
    fn output_shapes() {
        let m = fruit();
        let model = LdaModel::fit(&m, &LdaConfig::new(2)).expect("fit");
        assert_eq!(model.term_topic().dim(), (2, 3));
        assert_eq!(model.doc_topic().dim(), (3, 2));
        assert_eq!(model.n_topics(), 2);
    }

    #[test]
    fn doc_topic_rows_sum_to_one() {
        let m = dtm(&[
            "stocks bonds markets trading",
            "football goals league match",
            "markets stocks investors",
            "league football players",
        ]);
        let model = LdaModel::fit(&m, &LdaConfig::new(2)).expect("fit");
        for row in model.doc_topic().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
        for row in model.topic_term_distribution().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn identical_documents_share_dominant_topic() {
        let model = LdaModel::fit(&fruit(), &LdaConfig::new(2)).expect("fit");
        let theta = model.doc_topic();
        assert_eq!(theta.row(0), theta.row(2));
        assert_eq!(argmax(theta.row(0)), argmax(theta.row(2)));
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let m = fruit();
        let config = LdaConfig::new(2).random_seed(7);
        let a = LdaModel::fit(&m, &config).expect("fit a");
        let b = LdaModel::fit(&m, &config).expect("fit b");
        assert_eq!(a.term_topic(), b.term_topic());
        assert_eq!(a.doc_topic(), b.doc_topic());
    }

    #[test]
    fn different_seeds_change_initialization() {
        let m = fruit();
        let a = LdaModel::fit(&m, &LdaConfig::new(2).random_seed(1)).expect("fit a");
        let b = LdaModel::fit(&m, &LdaConfig::new(2).random_seed(2)).expect("fit b");
        assert_ne!(a.term_topic(), b.term_topic());
    }

    #[test]
    fn too_many_topics_is_model_fit_error() {
        let err = LdaModel::fit(&fruit(), &LdaConfig::new(4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
        assert!(err.to_string().contains("only 3 documents"));
    }

    #[test]
    fn zero_topics_is_model_fit_error() {
        let err = LdaModel::fit(&fruit(), &LdaConfig::new(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
    }

    #[test]
    fn degenerate_matrices_are_rejected() {
        let no_columns = DocumentTermMatrix::from_counts(Array2::zeros((3, 0)));
        assert_eq!(
            LdaModel::fit(&no_columns, &LdaConfig::new(1)).unwrap_err().kind(),
            ErrorKind::ModelFit
        );

        let no_counts = DocumentTermMatrix::from_counts(Array2::zeros((3, 2)));
        assert_eq!(
            LdaModel::fit(&no_counts, &LdaConfig::new(1)).unwrap_err().kind(),
            ErrorKind::ModelFit
        );
    }

    #[test]
    fn non_positive_prior_is_rejected() {
        let err = LdaModel::fit(&fruit(), &LdaConfig::new(2).alpha(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn zero_timeout_aborts_fit() {
        let config = LdaConfig::new(2).timeout(Duration::ZERO);
        let err = LdaModel::fit(&fruit(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let config = LdaConfig::new(2).timeout(Duration::from_secs(u64::MAX));
        let model = LdaModel::fit(&fruit(), &config).expect("fit");
        for row in model.doc_topic().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_rows_get_uniform_topics() {
        let m = dtm(&["apple banana apple", "", "banana cherry"]);
        let model = LdaModel::fit(&m, &LdaConfig::new(2)).expect("fit");
        let empty = model.doc_topic().row(1);
        assert!((empty[0] - 0.5).abs() < 1e-12);
        assert!((empty[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn perplexity_is_finite_and_bounded_by_vocabulary() {
        let model = LdaModel::fit(&fruit(), &LdaConfig::new(2)).expect("fit");
        let p = model.perplexity();
        assert!(p.is_finite());
        assert!(p >= 1.0);
        // A model can do no worse than uniform over the vocabulary by much.
        assert!(p < 10.0, "perplexity {p}");
    }

    #[test]
    fn evaluate_every_can_stop_early() {
        let config = LdaConfig::new(2).max_iter(50).evaluate_every(1);
        let model = LdaModel::fit(&fruit(), &config).expect("fit");
        assert!(model.iterations() >= 2);
        assert!(model.iterations() < 50);
    }

    #[test]
    fn runs_all_iterations_without_evaluation() {
        let model = LdaModel::fit(&fruit(), &LdaConfig::new(2).max_iter(3)).expect("fit");
        assert_eq!(model.iterations(), 3);
    }

    #[test]
    fn config_defaults_follow_topic_count() {
        let config = LdaConfig::new(4);
        assert_eq!(config.doc_topic_prior(), 0.25);
        assert_eq!(config.topic_word_prior(), 0.25);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.max_doc_update_iter, 100);
    }
}
