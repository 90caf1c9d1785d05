//! Batch classification over two CSV files.
//!
//! Backs the `classify_companies` binary: parses its arguments, runs the
//! pipeline once and writes the scored table as CSV.

use crate::loader::read_table_bytes;
use crate::models::{CompanyRecord, OportunidadeCredito};
use crate::pipeline::{reference_for, Dataset, SourceTables};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

/// Classify companies from a profile table and a transaction table
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "classify_companies", version, about, long_about = None)]
pub struct BatchArgs {
    /// Company-profile table (ID, DT_ABRT, VL_FATU, VL_SLDO, DS_CNAE)
    pub profiles: PathBuf,

    /// Transaction table (ID_PGTO, ID_RCBE, VL)
    pub transactions: PathBuf,

    /// Output CSV path; stdout when omitted
    pub output: Option<PathBuf>,

    /// Frozen reference date (YYYY-MM-DD); wall clock when omitted
    #[arg(long, value_parser = parse_reference_date)]
    pub reference_date: Option<NaiveDate>,
}

fn parse_reference_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", raw))
}

/// What a batch run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub companies: usize,
    pub opportunities: usize,
    pub reference: NaiveDateTime,
}

/// Serializes the output table, header first, one row per company.
pub fn write_records<W: Write>(records: &[CompanyRecord], sink: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs the pipeline over the argument tables and writes the result.
pub fn run(args: &BatchArgs) -> anyhow::Result<BatchSummary> {
    let tables = SourceTables {
        profiles: read_table_bytes(&args.profiles)?,
        transactions: read_table_bytes(&args.transactions)?,
    };
    let dataset = Dataset::build(&tables, reference_for(args.reference_date))?;

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            write_records(&dataset.records, file)?;
        }
        None => write_records(&dataset.records, std::io::stdout().lock())?,
    }

    Ok(BatchSummary {
        companies: dataset.len(),
        opportunities: dataset
            .records
            .iter()
            .filter(|r| r.credit_opportunity == OportunidadeCredito::Sim)
            .count(),
        reference: dataset.reference,
    })
}
