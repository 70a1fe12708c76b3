//! Model-interaction logging
//!
//! Append-only SQLite log of LLM calls made during an evaluation run.
//! Observability only; nothing in the evaluation reads it back.

use crate::text::{sanitize, sanitize_display};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// One model call to record.
#[derive(Debug, Clone)]
pub struct LlmInteraction {
    pub model: String,
    pub prompt: String,
    pub response: String,
    pub temperature: f64,
    /// Arbitrary call metadata, stored as its JSON rendering
    pub metadata: serde_json::Value,
    /// Wall-clock execution time in seconds
    pub execution_time: f64,
}

/// Append-only interaction log backed by SQLite.
pub struct InteractionLog {
    conn: Connection,
}

impl InteractionLog {
    /// Open (or create) the log database. Table creation is idempotent.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open log database: {:?}", db_path))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS llm_interactions
             (id INTEGER PRIMARY KEY AUTOINCREMENT,
              timestamp TEXT,
              model TEXT,
              prompt TEXT,
              response TEXT,
              temperature REAL,
              metadata TEXT,
              execution_time REAL)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Append one interaction, returning its row id. All text fields are
    /// sanitized before they reach the database.
    pub fn record(&self, interaction: &LlmInteraction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO llm_interactions
             (timestamp, model, prompt, response, temperature, metadata, execution_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Utc::now().to_rfc3339(),
                sanitize(&interaction.model),
                sanitize(&interaction.prompt),
                sanitize(&interaction.response),
                interaction.temperature,
                sanitize_display(&interaction.metadata),
                interaction.execution_time,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Number of recorded interactions.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM llm_interactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
