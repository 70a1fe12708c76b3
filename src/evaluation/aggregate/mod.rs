//! Metric aggregation
//!
//! Folds per-pair metric maps into grouped descriptive statistics: one
//! "overall" group over every pair, plus one group per distinct category
//! code. Pairs and categories correlate positionally. The output is
//! invariant to permutation of the input aside from category ordering,
//! which is always ascending.

use crate::evaluation::metrics::MetricMap;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Descriptive statistics for one metric within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Sample standard deviation; 0.0 below two values
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl MetricSummary {
    /// Summarize a non-empty value list.
    fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Self {
            mean,
            std,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            count,
        }
    }
}

/// Statistics for one category of QA pairs.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    /// Category code; `None` groups the uncategorized pairs
    pub category: Option<u8>,
    pub metrics: BTreeMap<String, MetricSummary>,
}

/// Grouped statistics over a scored batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    /// Statistics over every pair, per metric
    pub overall: BTreeMap<String, MetricSummary>,
    /// Per-category statistics, ascending by category code with the
    /// uncategorized group (if any) first
    pub categories: Vec<CategoryGroup>,
}

/// Aggregate per-pair metrics into overall and per-category statistics.
///
/// `categories[i]` is the category of the pair that produced
/// `all_metrics[i]`. Mismatched lengths are a precondition violation;
/// empty input yields an empty report. A metric absent from some pairs
/// contributes only to the groups that saw it.
pub fn aggregate(
    all_metrics: &[MetricMap],
    categories: &[Option<u8>],
) -> Result<AggregateReport> {
    if all_metrics.len() != categories.len() {
        anyhow::bail!(
            "length mismatch: {} metric maps vs {} categories",
            all_metrics.len(),
            categories.len()
        );
    }
    if all_metrics.is_empty() {
        return Ok(AggregateReport::default());
    }

    let mut overall: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut by_category: BTreeMap<Option<u8>, BTreeMap<&str, Vec<f64>>> = BTreeMap::new();

    for (metrics, &category) in all_metrics.iter().zip(categories) {
        for (name, &value) in metrics {
            overall.entry(name).or_default().push(value);
            by_category
                .entry(category)
                .or_default()
                .entry(name)
                .or_default()
                .push(value);
        }
    }

    let overall = summarize(overall);
    let categories = by_category
        .into_iter()
        .map(|(category, values)| CategoryGroup {
            category,
            metrics: summarize(values),
        })
        .collect();

    Ok(AggregateReport { overall, categories })
}

fn summarize(groups: BTreeMap<&str, Vec<f64>>) -> BTreeMap<String, MetricSummary> {
    groups
        .into_iter()
        .map(|(name, values)| (name.to_string(), MetricSummary::from_values(&values)))
        .collect()
}

impl std::fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Overall:")?;
        write_group(f, &self.overall)?;
        for group in &self.categories {
            match group.category {
                Some(code) => writeln!(f, "Category {}:", code)?,
                None => writeln!(f, "Uncategorized:")?,
            }
            write_group(f, &group.metrics)?;
        }
        Ok(())
    }
}

fn write_group(
    f: &mut std::fmt::Formatter<'_>,
    metrics: &BTreeMap<String, MetricSummary>,
) -> std::fmt::Result {
    for (name, summary) in metrics {
        writeln!(
            f,
            "  {:<18} mean {:.4}  std {:.4}  median {:.4}  min {:.4}  max {:.4}  n={}",
            name, summary.mean, summary.std, summary.median, summary.min, summary.max,
            summary.count
        )?;
    }
    Ok(())
}
