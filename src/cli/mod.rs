//! Command-line interface
//!
//! Thin drivers over the library: `stats` loads a dataset and prints
//! corpus statistics; `eval` scores prediction/reference pairs and
//! prints the aggregated report.

use crate::dataset::{load_dataset, DatasetStatistics};
use crate::embedding::{create_embedder, EmbeddingConfig};
use crate::evaluation::aggregate::aggregate;
use crate::evaluation::metrics::{EmbedderScorer, MetricMap, MetricSuite};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// One prediction/reference record from a JSON Lines pairs file.
#[derive(Debug, Clone, Deserialize)]
pub struct PairRecord {
    /// Model-generated answer
    pub prediction: String,
    /// Gold reference answer
    pub reference: String,
    /// Category code of the originating QA pair
    #[serde(default)]
    pub category: Option<u8>,
}

/// Read scored-pair records from a JSONL file.
pub fn load_pair_records(path: &Path) -> Result<Vec<PairRecord>> {
    let file =
        File::open(path).with_context(|| format!("failed to open pairs file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {} of pairs file", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PairRecord = serde_json::from_str(&line)
            .with_context(|| format!("failed to parse pair record at line {}", i + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Execute the stats command.
pub fn stats(data: String) -> Result<()> {
    tracing::info!("Computing dataset statistics");
    tracing::info!("  Data: {}", data);

    let samples = load_dataset(Path::new(&data))?;
    let statistics = DatasetStatistics::from_samples(&samples);

    println!("{}", statistics);
    Ok(())
}

/// Execute the eval command.
pub fn eval(pairs: String, backend: String, output: Option<String>) -> Result<()> {
    tracing::info!("Starting evaluation");
    tracing::info!("  Pairs: {}", pairs);
    tracing::info!("  Backend: {}", backend);

    let records = load_pair_records(Path::new(&pairs))?;
    tracing::info!("Loaded {} prediction/reference pairs", records.len());

    let embedder = create_embedder(&backend, EmbeddingConfig::default())?;
    let suite = MetricSuite::new(Arc::new(EmbedderScorer::new(embedder)));

    let mut all_metrics: Vec<MetricMap> = Vec::with_capacity(records.len());
    let mut categories = Vec::with_capacity(records.len());
    for record in &records {
        all_metrics.push(suite.calculate(&record.prediction, &record.reference));
        categories.push(record.category);
    }

    let report = aggregate(&all_metrics, &categories)?;
    println!("{}", report);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).with_context(|| format!("failed to write report to {}", path))?;
        tracing::info!("Report written to {}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_pair_records() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"prediction": "paris", "reference": "Paris", "category": 1}}"#)
            .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"prediction": "a dog", "reference": "a cat"}}"#).unwrap();

        let records = load_pair_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category, Some(1));
        assert_eq!(records[1].category, None);
    }

    #[test]
    fn test_load_pair_records_bad_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let err = load_pair_records(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }
}
