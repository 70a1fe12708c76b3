//! # dialogeval
//!
//! Evaluation toolkit for conversational QA benchmarks.
//!
//! ## Overview
//!
//! dialogeval ingests a benchmark of long-form dialogues (sessions of
//! turns with question/answer pairs, event summaries, and observations),
//! then scores model-generated answers against the references with a
//! suite of text-similarity metrics aggregated per question category:
//!
//! - Dataset parsing into a typed, sanitized in-memory model
//! - Lexical metrics (exact match, token F1, ROUGE, smoothed BLEU)
//! - Swappable model-backed metrics behind an embedding trait
//! - Grouped descriptive statistics (overall and per category)
//! - SQLite logging of model interactions
//!
//! ## Architecture
//!
//! - `text` - sanitization to a safe ASCII repertoire
//! - `dataset` - data model, JSON loader, corpus statistics
//! - `embedding` - embedding trait and deterministic backends
//! - `evaluation` - per-pair metrics and aggregation
//! - `llmlog` - model-interaction log store
//! - `cli` - command-line interface

pub mod cli;
pub mod dataset;
pub mod embedding;
pub mod evaluation;
pub mod llmlog;
pub mod text;

// Re-export commonly used types
pub use anyhow::{Error, Result};
