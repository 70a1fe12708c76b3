use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dialogeval::cli;

#[derive(Parser)]
#[command(name = "dialogeval")]
#[command(about = "Evaluation toolkit for conversational QA benchmarks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a benchmark dataset and print corpus statistics
    Stats {
        /// Dataset file path (JSON)
        #[arg(short, long)]
        data: String,
    },

    /// Score prediction/reference pairs and print aggregated metrics
    Eval {
        /// Pairs file path (JSONL with prediction, reference, category)
        #[arg(short, long)]
        pairs: String,

        /// Embedding backend for model-backed scores: token or mock
        #[arg(short, long, default_value = "token")]
        backend: String,

        /// Output file for the aggregated report (pretty JSON, optional)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dialogeval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { data } => {
            cli::stats(data)?;
        }

        Commands::Eval {
            pairs,
            backend,
            output,
        } => {
            cli::eval(pairs, backend, output)?;
        }
    }

    Ok(())
}
