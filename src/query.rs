//! Read-only queries over the pipeline output.
//!
//! Nothing here mutates a [`Dataset`]; every function borrows it and returns
//! freshly built views. Empty results are ordinary values, never errors.

use crate::errors::AppError;
use crate::models::{
    ChainAnalysis, CompanyFilter, CompanyRecord, Counterparty, DependenciaB2B, FilterOptions,
    LabelCount, OportunidadeCredito, Page, PivotRow, RiscoSantander, RiskDependencyPivot,
    ScatterPoint, Transaction,
};
use crate::pipeline::Dataset;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Selector value meaning "no constraint".
pub const ALL_OPTION: &str = "Todos";

/// Columns that can be filtered or counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Cnae,
    Perfil,
    Maturidade,
    Saude,
    Intensidade,
    Dependencia,
    Risco,
    Oportunidade,
}

impl Field {
    pub fn value<'a>(&self, record: &'a CompanyRecord) -> &'a str {
        match self {
            Field::Cnae => &record.cnae,
            Field::Perfil => &record.company_profile,
            Field::Maturidade => record.maturity.as_str(),
            Field::Saude => record.health.as_str(),
            Field::Intensidade => record.intensity.as_str(),
            Field::Dependencia => record.dependency.as_str(),
            Field::Risco => record.risk.as_str(),
            Field::Oportunidade => record.credit_opportunity.as_str(),
        }
    }
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_OPTION)
}

impl CompanyFilter {
    fn constraints(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        [
            (Field::Cnae, &self.cnae),
            (Field::Perfil, &self.perfil),
            (Field::Maturidade, &self.maturidade),
            (Field::Saude, &self.saude),
            (Field::Intensidade, &self.intensidade),
            (Field::Dependencia, &self.dependencia),
            (Field::Risco, &self.risco),
            (Field::Oportunidade, &self.oportunidade),
        ]
        .into_iter()
        .filter_map(|(field, value)| constraint(value).map(|v| (field, v)))
    }

    /// True when every provided constraint equals the record's value.
    pub fn matches(&self, record: &CompanyRecord) -> bool {
        self.constraints()
            .all(|(field, expected)| field.value(record) == expected)
    }
}

/// Rows matching all filters, in output order.
pub fn filter_companies<'a>(dataset: &'a Dataset, filter: &CompanyFilter) -> Vec<&'a CompanyRecord> {
    dataset
        .records
        .iter()
        .filter(|record| filter.matches(record))
        .collect()
}

/// Cuts one page out of `rows`.
///
/// `limit` defaults to `default_limit` and is clamped to `1..=max_limit`.
/// An offset past the end yields an empty page.
pub fn paginate<T: Clone>(
    rows: &[T],
    offset: Option<usize>,
    limit: Option<usize>,
    default_limit: usize,
    max_limit: usize,
) -> Page<T> {
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
    let offset = offset.unwrap_or(0);
    let total = rows.len();

    let items: Vec<T> = rows.iter().skip(offset).take(limit).cloned().collect();
    let end = offset.saturating_add(items.len());
    let next_offset = (end < total).then_some(end);

    Page {
        items,
        total,
        offset,
        limit,
        next_offset,
    }
}

fn sorted_unique<'a>(records: &'a [CompanyRecord], field: Field) -> Vec<String> {
    records
        .iter()
        .map(|r| field.value(r))
        .collect::<BTreeSet<&'a str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct values for each filterable column, sorted.
pub fn filter_options(dataset: &Dataset) -> FilterOptions {
    let records = &dataset.records;
    FilterOptions {
        cnae: sorted_unique(records, Field::Cnae),
        perfil: sorted_unique(records, Field::Perfil),
        maturidade: sorted_unique(records, Field::Maturidade),
        saude: sorted_unique(records, Field::Saude),
        intensidade: sorted_unique(records, Field::Intensidade),
        dependencia: sorted_unique(records, Field::Dependencia),
        risco: sorted_unique(records, Field::Risco),
        oportunidade: OportunidadeCredito::ALL
            .iter()
            .map(|o| o.as_str().to_string())
            .collect(),
    }
}

/// Row count per label, most frequent first, ties by label.
pub fn distribution(rows: &[&CompanyRecord], field: Field) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in rows {
        *counts.entry(field.value(record)).or_default() += 1;
    }

    let mut result: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    result
}

/// Counts per (dependency, risk tier), zero-filled over the labels observed.
pub fn risk_dependency_pivot(rows: &[&CompanyRecord]) -> RiskDependencyPivot {
    let risks: BTreeSet<RiscoSantander> = rows.iter().map(|r| r.risk).collect();
    let dependencies: BTreeSet<DependenciaB2B> = rows.iter().map(|r| r.dependency).collect();

    let columns: Vec<RiscoSantander> = risks.into_iter().collect();

    let mut cells: HashMap<(DependenciaB2B, RiscoSantander), usize> = HashMap::new();
    for record in rows {
        *cells.entry((record.dependency, record.risk)).or_default() += 1;
    }

    let pivot_rows = dependencies
        .into_iter()
        .map(|dependency| PivotRow {
            dependency: dependency.as_str().to_string(),
            counts: columns
                .iter()
                .map(|risk| cells.get(&(dependency, *risk)).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    RiskDependencyPivot {
        columns: columns.iter().map(|r| r.as_str().to_string()).collect(),
        rows: pivot_rows,
    }
}

pub fn credit_opportunities<'a>(rows: &[&'a CompanyRecord]) -> Vec<&'a CompanyRecord> {
    rows.iter()
        .copied()
        .filter(|r| r.credit_opportunity == OportunidadeCredito::Sim)
        .collect()
}

pub fn scatter_points(rows: &[&CompanyRecord]) -> Vec<ScatterPoint> {
    rows.iter()
        .map(|r| ScatterPoint {
            id: r.id.clone(),
            revenue: r.revenue,
            balance: r.balance,
            risk: r.risk,
        })
        .collect()
}

/// Sums value and count per counterparty and keeps the `top_n` largest sums.
///
/// Values are summed as signed numbers; empty values add nothing. Ties are
/// broken by counterparty ID so the ranking is stable.
fn rank_counterparties<'a, F>(
    dataset: &Dataset,
    transactions: impl Iterator<Item = &'a Transaction>,
    counterparty_of: F,
    top_n: usize,
) -> Vec<Counterparty>
where
    F: Fn(&'a Transaction) -> &'a str,
{
    let mut totals: HashMap<&str, (f64, u64)> = HashMap::new();
    for tx in transactions {
        let entry = totals.entry(counterparty_of(tx)).or_insert((0.0, 0));
        entry.0 += tx.value.unwrap_or(0.0);
        entry.1 += 1;
    }

    let mut ranked: Vec<(&str, (f64, u64))> = totals.into_iter().collect();
    ranked.sort_by(|(id_a, (sum_a, _)), (id_b, (sum_b, _))| {
        sum_b
            .partial_cmp(sum_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });

    ranked
        .into_iter()
        .take(top_n)
        .map(|(id, (total_value, transactions))| {
            let known = dataset.get(id);
            Counterparty {
                id: id.to_string(),
                total_value,
                transactions,
                cnae: known.map(|r| r.cnae.clone()),
                health: known.map(|r| r.health),
                risk: known.map(|r| r.risk),
            }
        })
        .collect()
}

/// Top clients (who paid the company) and suppliers (whom it paid).
pub fn chain_analysis(dataset: &Dataset, id: &str, top_n: usize) -> Result<ChainAnalysis, AppError> {
    let company = dataset
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))?;

    let clients = rank_counterparties(
        dataset,
        dataset.transactions.iter().filter(|tx| tx.receiver == id),
        |tx| tx.payer.as_str(),
        top_n,
    );
    let suppliers = rank_counterparties(
        dataset,
        dataset.transactions.iter().filter(|tx| tx.payer == id),
        |tx| tx.receiver.as_str(),
        top_n,
    );

    tracing::debug!(
        "Chain analysis for {}: {} client(s), {} supplier(s)",
        id,
        clients.len(),
        suppliers.len()
    );

    Ok(ChainAnalysis {
        company: company.clone(),
        clients,
        suppliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SourceTables;
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let profiles = "ID,DT_ABRT,VL_FATU,VL_SLDO,DS_CNAE\n\
            A,2010-01-01,1000,100,Comercio\n\
            B,2022-01-01,1000,-80,Industria\n\
            C,2010-01-01,1000,-20,Comercio\n\
            D,2021-01-01,0,-5,Servicos\n";
        let transactions = "ID_PGTO,ID_RCBE,VL\n\
            B,A,100\n\
            B,A,50\n\
            C,A,300\n\
            X,A,10\n\
            A,D,40\n\
            A,C,40\n";
        let tables = SourceTables {
            profiles: profiles.as_bytes().to_vec(),
            transactions: transactions.as_bytes().to_vec(),
        };
        let reference = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Dataset::build(&tables, reference).unwrap()
    }

    #[test]
    fn test_filter_exact_match_and_todos() {
        let data = dataset();

        let filter = CompanyFilter {
            cnae: Some("Comercio".to_string()),
            ..Default::default()
        };
        let ids: Vec<&str> = filter_companies(&data, &filter)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["A", "C"]);

        let everything = CompanyFilter {
            cnae: Some(ALL_OPTION.to_string()),
            risco: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter_companies(&data, &everything).len(), 4);

        let nothing = CompanyFilter {
            cnae: Some("Comerc".to_string()),
            ..Default::default()
        };
        assert!(filter_companies(&data, &nothing).is_empty());
    }

    #[test]
    fn test_filter_combines_constraints() {
        let data = dataset();
        let filter = CompanyFilter {
            cnae: Some("Comercio".to_string()),
            saude: Some("Alavancagem Estratégica".to_string()),
            ..Default::default()
        };
        let rows = filter_companies(&data, &filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "C");

        let a = data.get("A").unwrap();
        assert!(!filter.matches(a));
        assert!(CompanyFilter::default().matches(a));
    }

    #[test]
    fn test_paginate_cursor() {
        let rows: Vec<u32> = (0..7).collect();

        let first = paginate(&rows, None, Some(3), 50, 500);
        assert_eq!(first.items, vec![0, 1, 2]);
        assert_eq!(first.next_offset, Some(3));

        let last = paginate(&rows, Some(6), Some(3), 50, 500);
        assert_eq!(last.items, vec![6]);
        assert_eq!(last.next_offset, None);

        let past_end = paginate(&rows, Some(10), None, 50, 500);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 7);

        let clamped = paginate(&rows, None, Some(0), 50, 2);
        assert_eq!(clamped.limit, 1);
        let clamped = paginate(&rows, None, Some(100), 50, 2);
        assert_eq!(clamped.limit, 2);
    }

    #[test]
    fn test_distribution_order() {
        let data = dataset();
        let rows: Vec<&CompanyRecord> = data.records.iter().collect();
        let by_cnae = distribution(&rows, Field::Cnae);
        assert_eq!(
            by_cnae,
            vec![
                LabelCount { label: "Comercio".to_string(), count: 2 },
                LabelCount { label: "Industria".to_string(), count: 1 },
                LabelCount { label: "Servicos".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_pivot_zero_fills() {
        let data = dataset();
        let rows: Vec<&CompanyRecord> = data.records.iter().collect();
        let pivot = risk_dependency_pivot(&rows);

        let total: usize = pivot.rows.iter().flat_map(|r| r.counts.iter()).sum();
        assert_eq!(total, 4);
        for row in &pivot.rows {
            assert_eq!(row.counts.len(), pivot.columns.len());
        }
    }

    #[test]
    fn test_chain_analysis_ranks_by_value() {
        let data = dataset();
        let chain = chain_analysis(&data, "A", 10).unwrap();

        let clients: Vec<(&str, f64, u64)> = chain
            .clients
            .iter()
            .map(|c| (c.id.as_str(), c.total_value, c.transactions))
            .collect();
        assert_eq!(clients, vec![("C", 300.0, 1), ("B", 150.0, 2), ("X", 10.0, 1)]);

        // X is not in the profile table
        assert_eq!(chain.clients[2].risk, None);
        assert_eq!(chain.clients[0].cnae.as_deref(), Some("Comercio"));

        // Equal sums fall back to ID order
        let suppliers: Vec<&str> = chain.suppliers.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(suppliers, ["C", "D"]);
    }

    #[test]
    fn test_chain_analysis_top_n_and_unknown_id() {
        let data = dataset();
        assert_eq!(chain_analysis(&data, "A", 1).unwrap().clients.len(), 1);
        assert!(matches!(
            chain_analysis(&data, "Z", 10),
            Err(AppError::NotFound(_))
        ));
    }
}
