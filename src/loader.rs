//! Reads the profile and transaction tables from CSV.
//!
//! Both loaders check the header for the required columns before touching any
//! row, then parse every row strictly. A value that cannot be parsed aborts the
//! whole load: silently dropping or zero-filling a company would shift its
//! risk score.

use crate::errors::AppError;
use crate::models::{CompanyProfile, Transaction};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

pub const PROFILE_COLUMNS: [&str; 5] = ["ID", "DT_ABRT", "VL_FATU", "VL_SLDO", "DS_CNAE"];
pub const TRANSACTION_COLUMNS: [&str; 3] = ["ID_PGTO", "ID_RCBE", "VL"];

const PROFILE_TABLE: &str = "profile";
const TRANSACTION_TABLE: &str = "transaction";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
// Slashed dates are month first.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Deserialize)]
struct RawProfileRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "DT_ABRT")]
    opened_at: String,
    #[serde(rename = "DT_REFE", default)]
    reference_at: Option<String>,
    #[serde(rename = "VL_FATU")]
    revenue: String,
    #[serde(rename = "VL_SLDO")]
    balance: String,
    #[serde(rename = "DS_CNAE")]
    cnae: String,
}

#[derive(Debug, Deserialize)]
struct RawTransactionRow {
    #[serde(rename = "ID_PGTO")]
    payer: String,
    #[serde(rename = "ID_RCBE")]
    receiver: String,
    #[serde(rename = "VL")]
    value: String,
}

/// Normalizes a company identifier.
///
/// Float-typed exports write integer IDs as `123.0`; those are reduced to
/// `123` so they join with the profile table. Returns `None` for blank cells.
pub fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let integral = trimmed
        .strip_suffix(".0")
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));

    Some(integral.unwrap_or(trimmed).to_string())
}

/// Parses a date or datetime cell. Date-only values land on midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses a finite decimal number. `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    table: &str,
    required: &[&str],
) -> Result<(), AppError> {
    let headers = reader.headers()?;
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();

    if !missing.is_empty() {
        return Err(AppError::InputMalformed(format!(
            "{} table is missing required column(s): {}",
            table,
            missing.join(", ")
        )));
    }

    Ok(())
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(source)
}

/// Loads and validates the company-profile table.
pub fn read_profiles<R: Read>(source: R) -> Result<Vec<CompanyProfile>, AppError> {
    let mut reader = csv_reader(source);
    require_columns(&mut reader, PROFILE_TABLE, &PROFILE_COLUMNS)?;

    let mut seen = HashSet::new();
    let mut profiles = Vec::new();

    for (idx, result) in reader.deserialize::<RawProfileRow>().enumerate() {
        let row_number = idx + 1;
        let raw = result?;

        let id = normalize_id(&raw.id)
            .ok_or_else(|| AppError::malformed_at(PROFILE_TABLE, row_number, "ID", "empty identifier"))?;

        if !seen.insert(id.clone()) {
            return Err(AppError::malformed_at(
                PROFILE_TABLE,
                row_number,
                "ID",
                format!("duplicate identifier {}", id),
            ));
        }

        let opened_at = parse_datetime(&raw.opened_at).ok_or_else(|| {
            AppError::malformed_at(
                PROFILE_TABLE,
                row_number,
                "DT_ABRT",
                format!("unparseable date '{}'", raw.opened_at),
            )
        })?;

        let reference_at = match raw.reference_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_datetime(value).ok_or_else(|| {
                AppError::malformed_at(
                    PROFILE_TABLE,
                    row_number,
                    "DT_REFE",
                    format!("unparseable date '{}'", value),
                )
            })?),
        };

        let revenue = parse_number(&raw.revenue).ok_or_else(|| {
            AppError::malformed_at(
                PROFILE_TABLE,
                row_number,
                "VL_FATU",
                format!("invalid number '{}'", raw.revenue),
            )
        })?;

        let balance = parse_number(&raw.balance).ok_or_else(|| {
            AppError::malformed_at(
                PROFILE_TABLE,
                row_number,
                "VL_SLDO",
                format!("invalid number '{}'", raw.balance),
            )
        })?;

        profiles.push(CompanyProfile {
            id,
            opened_at,
            reference_at,
            revenue,
            balance,
            cnae: raw.cnae.trim().to_string(),
        });
    }

    tracing::debug!("Loaded {} profile rows", profiles.len());
    Ok(profiles)
}

/// Loads the transaction table, dropping rows without a payer or receiver.
pub fn read_transactions<R: Read>(source: R) -> Result<Vec<Transaction>, AppError> {
    let mut reader = csv_reader(source);
    require_columns(&mut reader, TRANSACTION_TABLE, &TRANSACTION_COLUMNS)?;

    let mut transactions = Vec::new();
    let mut dropped = 0usize;

    for (idx, result) in reader.deserialize::<RawTransactionRow>().enumerate() {
        let row_number = idx + 1;
        let raw = result?;

        let (Some(payer), Some(receiver)) = (normalize_id(&raw.payer), normalize_id(&raw.receiver))
        else {
            dropped += 1;
            continue;
        };

        let value = if raw.value.trim().is_empty() {
            None
        } else {
            Some(parse_number(&raw.value).ok_or_else(|| {
                AppError::malformed_at(
                    TRANSACTION_TABLE,
                    row_number,
                    "VL",
                    format!("invalid number '{}'", raw.value),
                )
            })?)
        };

        transactions.push(Transaction {
            payer,
            receiver,
            value,
        });
    }

    if dropped > 0 {
        tracing::info!(
            "Dropped {} transaction row(s) with a missing payer or receiver",
            dropped
        );
    }
    tracing::debug!("Loaded {} transaction rows", transactions.len());

    Ok(transactions)
}

/// Opens a table file, mapping a missing file to `InputMissing`.
pub fn read_table_bytes(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::InputMissing(format!("{} not found", path.display()))
        }
        _ => AppError::InternalError(format!("failed to read {}: {}", path.display(), e)),
    })
}
