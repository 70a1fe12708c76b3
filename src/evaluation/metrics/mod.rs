//! Per-pair similarity metrics
//!
//! Computes a fixed set of similarity scores between a prediction and a
//! reference answer:
//! - Exact match and token-set F1
//! - ROUGE-1/2/L and smoothed BLEU-1..4, computed over a shared tokenizer
//! - Model-backed scores (BERTScore-style triple, METEOR-style alignment,
//!   sentence similarity) delegated to a swappable [`SemanticScorer`]
//!
//! Every score lands in [0, 1]. A failing scorer degrades to zeros for
//! its own outputs only; an empty prediction or reference short-circuits
//! the whole suite to zeros without invoking any calculator.

use crate::embedding::{cosine_similarity, Embedder, EmbeddingConfig, TokenEmbedder};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Per-pair metric scores keyed by metric name.
pub type MetricMap = BTreeMap<String, f64>;

/// Every metric name the suite reports.
pub const METRIC_NAMES: [&str; 14] = [
    "exact_match",
    "f1",
    "rouge1_f",
    "rouge2_f",
    "rougeL_f",
    "bleu1",
    "bleu2",
    "bleu3",
    "bleu4",
    "bert_precision",
    "bert_recall",
    "bert_f1",
    "meteor",
    "sbert_similarity",
];

/// Numerator substitute for zero clipped n-gram counts (BLEU smoothing).
const BLEU_SMOOTHING_EPSILON: f64 = 0.1;

/// Lowercase tokenizer: sentence punctuation becomes whitespace, then
/// split on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if matches!(c, '.' | ',' | '!' | '?') { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn f_measure(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Case-insensitive whole-string equality, as 0.0 or 1.0.
fn exact_match(prediction: &str, reference: &str) -> f64 {
    if prediction.to_lowercase() == reference.to_lowercase() {
        1.0
    } else {
        0.0
    }
}

/// Token-set F1: precision and recall over distinct tokens.
fn token_f1(pred_tokens: &[String], ref_tokens: &[String]) -> f64 {
    let pred_set: HashSet<&str> = pred_tokens.iter().map(String::as_str).collect();
    let ref_set: HashSet<&str> = ref_tokens.iter().map(String::as_str).collect();

    if pred_set.is_empty() || ref_set.is_empty() {
        return 0.0;
    }

    let common = pred_set.intersection(&ref_set).count() as f64;
    let precision = common / pred_set.len() as f64;
    let recall = common / ref_set.len() as f64;
    f_measure(precision, recall)
}

/// N-gram occurrence counts over token windows.
fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// ROUGE-N F-measure over clipped n-gram overlap.
fn rouge_n(pred_tokens: &[String], ref_tokens: &[String], n: usize) -> f64 {
    let pred_counts = ngram_counts(pred_tokens, n);
    let ref_counts = ngram_counts(ref_tokens, n);
    if pred_counts.is_empty() || ref_counts.is_empty() {
        return 0.0;
    }

    let overlap: usize = ref_counts
        .iter()
        .map(|(gram, &count)| count.min(pred_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    let pred_total: usize = pred_counts.values().sum();
    let ref_total: usize = ref_counts.values().sum();

    let precision = overlap as f64 / pred_total as f64;
    let recall = overlap as f64 / ref_total as f64;
    f_measure(precision, recall)
}

/// Longest common subsequence length (1D dynamic programming).
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let n = b.len();
    let mut dp = vec![0usize; n + 1];

    for item in a {
        let mut prev = 0;
        for j in 1..=n {
            let temp = dp[j];
            if *item == b[j - 1] {
                dp[j] = prev + 1;
            } else {
                dp[j] = dp[j].max(dp[j - 1]);
            }
            prev = temp;
        }
    }

    dp[n]
}

/// ROUGE-L F-measure over the longest common subsequence.
fn rouge_l(pred_tokens: &[String], ref_tokens: &[String]) -> f64 {
    if pred_tokens.is_empty() || ref_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(pred_tokens, ref_tokens) as f64;
    let precision = lcs / pred_tokens.len() as f64;
    let recall = lcs / ref_tokens.len() as f64;
    f_measure(precision, recall)
}

/// Smoothed BLEU with uniform weights over n-gram orders 1..=max_n.
///
/// Zero clipped counts contribute an epsilon numerator instead of
/// collapsing the geometric mean; a brevity penalty applies when the
/// prediction is shorter than the reference.
fn bleu(pred_tokens: &[String], ref_tokens: &[String], max_n: usize) -> f64 {
    if pred_tokens.is_empty() || ref_tokens.is_empty() {
        return 0.0;
    }

    let mut log_sum = 0.0;
    for n in 1..=max_n {
        let pred_counts = ngram_counts(pred_tokens, n);
        let total: usize = pred_counts.values().sum();
        if total == 0 {
            // Prediction shorter than n: no n-grams to score
            return 0.0;
        }
        let ref_counts = ngram_counts(ref_tokens, n);
        let clipped: usize = pred_counts
            .iter()
            .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
            .sum();

        let precision = if clipped == 0 {
            BLEU_SMOOTHING_EPSILON / total as f64
        } else {
            clipped as f64 / total as f64
        };
        log_sum += precision.ln() / max_n as f64;
    }

    let brevity_penalty = if pred_tokens.len() < ref_tokens.len() {
        (1.0 - ref_tokens.len() as f64 / pred_tokens.len() as f64).exp()
    } else {
        1.0
    };

    brevity_penalty * log_sum.exp()
}

/// Clipped unigram matches with a recall-weighted harmonic mean.
fn unigram_alignment(pred_tokens: &[String], ref_tokens: &[String]) -> f64 {
    let pred_counts = ngram_counts(pred_tokens, 1);
    let ref_counts = ngram_counts(ref_tokens, 1);

    let matches: usize = pred_counts
        .iter()
        .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    if matches == 0 {
        return 0.0;
    }

    let precision = matches as f64 / pred_tokens.len() as f64;
    let recall = matches as f64 / ref_tokens.len() as f64;
    // Recall-weighted 9:1
    10.0 * precision * recall / (recall + 9.0 * precision)
}

/// Scores produced by a semantic scorer.
#[derive(Debug, Clone, Default)]
pub struct SemanticScores {
    pub bert_precision: f64,
    pub bert_recall: f64,
    pub bert_f1: f64,
    pub meteor: f64,
    pub sbert_similarity: f64,
}

/// Model-backed similarity scoring, swappable as a unit.
///
/// Implementations may fail (model unavailable, provider error); the
/// metric suite degrades their outputs to zero rather than propagating.
pub trait SemanticScorer: Send + Sync {
    /// Score a prediction against a reference
    fn score(&self, prediction: &str, reference: &str) -> Result<SemanticScores>;
}

/// Default scorer built on an [`Embedder`].
///
/// Sentence similarity is embedding cosine; the BERTScore-style triple
/// comes from greedy token-level cosine matching; the METEOR-style score
/// is a recall-weighted unigram alignment.
pub struct EmbedderScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbedderScorer {
    /// Create a scorer over the given embedder
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Mean over `from` embeddings of the best cosine match in `to`.
    fn greedy_match(from: &[Vec<f32>], to: &[Vec<f32>]) -> f64 {
        if from.is_empty() || to.is_empty() {
            return 0.0;
        }
        let sum: f64 = from
            .iter()
            .map(|emb| {
                to.iter()
                    .map(|other| cosine_similarity(emb, other) as f64)
                    .fold(0.0f64, f64::max)
            })
            .sum();
        sum / from.len() as f64
    }
}

impl SemanticScorer for EmbedderScorer {
    fn score(&self, prediction: &str, reference: &str) -> Result<SemanticScores> {
        let pred_tokens = tokenize(prediction);
        let ref_tokens = tokenize(reference);
        if pred_tokens.is_empty() || ref_tokens.is_empty() {
            return Ok(SemanticScores::default());
        }

        let pred_embedding = self.embedder.embed(prediction)?;
        let ref_embedding = self.embedder.embed(reference)?;
        let sbert_similarity =
            f64::from(cosine_similarity(&pred_embedding, &ref_embedding)).clamp(0.0, 1.0);

        let pred_refs: Vec<&str> = pred_tokens.iter().map(String::as_str).collect();
        let ref_refs: Vec<&str> = ref_tokens.iter().map(String::as_str).collect();
        let pred_token_embeddings = self.embedder.embed_batch(&pred_refs)?;
        let ref_token_embeddings = self.embedder.embed_batch(&ref_refs)?;

        let bert_precision =
            Self::greedy_match(&pred_token_embeddings, &ref_token_embeddings).clamp(0.0, 1.0);
        let bert_recall =
            Self::greedy_match(&ref_token_embeddings, &pred_token_embeddings).clamp(0.0, 1.0);
        let bert_f1 = f_measure(bert_precision, bert_recall);

        Ok(SemanticScores {
            bert_precision,
            bert_recall,
            bert_f1,
            meteor: unigram_alignment(&pred_tokens, &ref_tokens),
            sbert_similarity,
        })
    }
}

/// The composed metric suite.
///
/// Constructed once by the composition root with an injected scorer;
/// never an ambient singleton, so tests can substitute a double.
pub struct MetricSuite {
    scorer: Arc<dyn SemanticScorer>,
}

impl MetricSuite {
    /// Create a suite with the given semantic scorer
    pub fn new(scorer: Arc<dyn SemanticScorer>) -> Self {
        Self { scorer }
    }

    /// Create a suite backed by the default token-hashing embedder
    pub fn with_default_scorer() -> Self {
        let embedder = Arc::new(TokenEmbedder::new(EmbeddingConfig::default()));
        Self::new(Arc::new(EmbedderScorer::new(embedder)))
    }

    /// Compute every metric for one prediction/reference pair.
    ///
    /// Empty input on either side yields the full metric set as zeros
    /// without invoking any calculator.
    pub fn calculate(&self, prediction: &str, reference: &str) -> MetricMap {
        let prediction = prediction.trim();
        let reference = reference.trim();
        if prediction.is_empty() || reference.is_empty() {
            return zeroed_metrics();
        }

        let pred_tokens = tokenize(prediction);
        let ref_tokens = tokenize(reference);

        let mut metrics = MetricMap::new();
        metrics.insert("exact_match".into(), exact_match(prediction, reference));
        metrics.insert("f1".into(), token_f1(&pred_tokens, &ref_tokens));
        metrics.insert("rouge1_f".into(), rouge_n(&pred_tokens, &ref_tokens, 1));
        metrics.insert("rouge2_f".into(), rouge_n(&pred_tokens, &ref_tokens, 2));
        metrics.insert("rougeL_f".into(), rouge_l(&pred_tokens, &ref_tokens));
        for n in 1..=4 {
            metrics.insert(format!("bleu{}", n), bleu(&pred_tokens, &ref_tokens, n));
        }

        let semantic = self.scorer.score(prediction, reference).unwrap_or_else(|e| {
            tracing::warn!("semantic scorer failed, substituting zero scores: {:#}", e);
            SemanticScores::default()
        });
        metrics.insert("bert_precision".into(), semantic.bert_precision);
        metrics.insert("bert_recall".into(), semantic.bert_recall);
        metrics.insert("bert_f1".into(), semantic.bert_f1);
        metrics.insert("meteor".into(), semantic.meteor);
        metrics.insert("sbert_similarity".into(), semantic.sbert_similarity);

        metrics
    }
}

/// The full metric name set, all zero.
pub fn zeroed_metrics() -> MetricMap {
    METRIC_NAMES
        .iter()
        .map(|&name| (name.to_string(), 0.0))
        .collect()
}
