//! B2B relationship classification from aggregated counts.

use crate::models::{DependenciaB2B, IntensidadeB2B, Relationship, TransactionCounts};
use crate::rules::{Rule, RuleTable};
use std::collections::BTreeMap;

/// Intensity by total transactions. Thresholds are exclusive lower bounds.
pub static INTENSITY_RULES: RuleTable<u64, IntensidadeB2B> = RuleTable {
    rules: &[
        Rule::new(IntensidadeB2B::MuitoAlta, |total: &u64| *total > 50),
        Rule::new(IntensidadeB2B::Alta, |total: &u64| *total > 30),
        Rule::new(IntensidadeB2B::Media, |total: &u64| *total > 10),
        Rule::new(IntensidadeB2B::Baixa, |total: &u64| *total > 5),
    ],
    fallback: IntensidadeB2B::MuitoBaixa,
};

/// Dependency by paid vs received counts.
pub static DEPENDENCY_RULES: RuleTable<TransactionCounts, DependenciaB2B> = RuleTable {
    rules: &[
        Rule::new(DependenciaB2B::HubDePagamentos, |c: &TransactionCounts| {
            c.received == 0 && c.paid > 0
        }),
        Rule::new(
            DependenciaB2B::ConcentradoraDeRecebimentos,
            |c: &TransactionCounts| c.paid == 0 && c.received > 0,
        ),
        Rule::new(DependenciaB2B::DependenteDeClientes, |c: &TransactionCounts| {
            c.received > 3 * c.paid
        }),
        Rule::new(DependenciaB2B::DependenteDeFornecedores, |c: &TransactionCounts| {
            c.paid > 3 * c.received
        }),
    ],
    fallback: DependenciaB2B::RelacionamentoEquilibrado,
};

pub fn classify_intensity(total: u64) -> IntensidadeB2B {
    INTENSITY_RULES.classify(&total)
}

pub fn classify_dependency(counts: &TransactionCounts) -> DependenciaB2B {
    DEPENDENCY_RULES.classify(counts)
}

/// Classifies every aggregated company.
pub fn classify_relationships(
    counts: &BTreeMap<String, TransactionCounts>,
) -> BTreeMap<String, Relationship> {
    counts
        .iter()
        .map(|(id, counts)| {
            let relationship = Relationship {
                id: id.clone(),
                counts: *counts,
                intensity: classify_intensity(counts.total()),
                dependency: classify_dependency(counts),
            };
            (id.clone(), relationship)
        })
        .collect()
}
