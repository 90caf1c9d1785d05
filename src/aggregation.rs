//! Per-company directional transaction counts.

use crate::models::{Transaction, TransactionCounts};
use std::collections::BTreeMap;

/// Counts received and paid transactions per company.
///
/// A company shows up if it received or paid at least once; the side it never
/// appeared on stays at zero. The map is ordered by company ID.
pub fn aggregate_transactions(transactions: &[Transaction]) -> BTreeMap<String, TransactionCounts> {
    let mut counts: BTreeMap<String, TransactionCounts> = BTreeMap::new();

    for tx in transactions {
        counts.entry(tx.receiver.clone()).or_default().received += 1;
        counts.entry(tx.payer.clone()).or_default().paid += 1;
    }

    tracing::debug!(
        "Aggregated {} transaction(s) into {} compan(ies)",
        transactions.len(),
        counts.len()
    );

    counts
}
