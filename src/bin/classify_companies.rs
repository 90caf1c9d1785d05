//! Batch classification: runs the pipeline over two CSV files and writes the
//! scored company table as CSV.
//!
//! Usage:
//!   classify_companies <profile.csv> <transactions.csv> [output.csv] [--reference-date YYYY-MM-DD]

use clap::Parser;
use rust_b2b_risk_api::batch::{self, BatchArgs};

/// Main entry point for the batch classifier.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_b2b_risk_api=info".into()),
        )
        .init();

    let args = BatchArgs::parse();
    let summary = batch::run(&args)?;

    if let Some(path) = &args.output {
        eprintln!(
            "✓ Wrote {} companies ({} credit opportunities) to {}",
            summary.companies,
            summary.opportunities,
            path.display()
        );
    }

    Ok(())
}
