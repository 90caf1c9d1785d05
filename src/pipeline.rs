/// Company classification pipeline.
///
/// Turns the two source tables into the scored output table:
/// 1. Enrich profiles (age, maturity, health)
/// 2. Aggregate transactions per company
/// 3. Classify B2B relationships
/// 4. Merge and score risk
///
/// The pipeline is a pure function of the tables and the reference time.
use crate::aggregation::aggregate_transactions;
use crate::enrichment::enrich_profiles;
use crate::errors::{AppError, ResultExt};
use crate::loader::{read_profiles, read_transactions};
use crate::models::{CompanyProfile, CompanyRecord, Transaction};
use crate::relationship::classify_relationships;
use crate::scoring::merge_and_score;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Wall-clock reference used when no date is frozen.
pub fn current_reference() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Reference time for a frozen date, or the wall clock.
pub fn reference_for(date: Option<NaiveDate>) -> NaiveDateTime {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_else(current_reference)
}

/// Runs the four stages over already validated tables.
///
/// Fails only when the profile table repeats an ID, since the output must hold
/// exactly one row per company.
pub fn run_pipeline(
    profiles: &[CompanyProfile],
    transactions: &[Transaction],
    reference: NaiveDateTime,
) -> Result<Vec<CompanyRecord>, AppError> {
    let mut seen = std::collections::HashSet::with_capacity(profiles.len());
    if let Some(dup) = profiles.iter().find(|p| !seen.insert(p.id.as_str())) {
        return Err(AppError::InputMalformed(format!(
            "profile table repeats ID {}",
            dup.id
        )));
    }

    tracing::info!(
        "Running pipeline: {} profile(s), {} transaction(s), reference {}",
        profiles.len(),
        transactions.len(),
        reference
    );

    let enriched = enrich_profiles(profiles, reference);
    let counts = aggregate_transactions(transactions);
    let relationships = classify_relationships(&counts);
    let records = merge_and_score(&enriched, &relationships);

    tracing::info!("✓ Pipeline produced {} company record(s)", records.len());

    Ok(records)
}

/// Raw bytes of both source tables.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub profiles: Vec<u8>,
    pub transactions: Vec<u8>,
}

/// The pipeline output plus what the query surface needs to read it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<CompanyRecord>,
    /// Transactions kept after null-ID filtering, for chain analysis.
    pub transactions: Vec<Transaction>,
    pub reference: NaiveDateTime,
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(
        records: Vec<CompanyRecord>,
        transactions: Vec<Transaction>,
        reference: NaiveDateTime,
    ) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id.clone(), pos))
            .collect();

        Self {
            records,
            transactions,
            reference,
            index,
        }
    }

    /// Parses both tables and runs the pipeline.
    pub fn build(tables: &SourceTables, reference: NaiveDateTime) -> Result<Self, AppError> {
        let profiles =
            read_profiles(tables.profiles.as_slice()).context("reading profile table")?;
        let transactions = read_transactions(tables.transactions.as_slice())
            .context("reading transaction table")?;

        let records = run_pipeline(&profiles, &transactions, reference)?;
        Ok(Self::new(records, transactions, reference))
    }

    pub fn get(&self, id: &str) -> Option<&CompanyRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
