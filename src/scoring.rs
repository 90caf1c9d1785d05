//! Merge of enriched profiles with relationships, and risk scoring.

use crate::models::{
    CompanyRecord, DependenciaB2B, EnrichedProfile, IntensidadeB2B, Maturidade,
    OportunidadeCredito, Relationship, RiscoSantander, SaudeFinanceira, TransactionCounts,
};
use crate::rules::{Rule, RuleTable};
use std::collections::BTreeMap;

/// Risk tiers by score, upper bounds inclusive, checked in ascending order.
pub static RISK_TIERS: RuleTable<i32, RiscoSantander> = RuleTable {
    rules: &[
        Rule::new(RiscoSantander::MuitoBaixo, |score: &i32| *score <= -2),
        Rule::new(RiscoSantander::Baixo, |score: &i32| *score <= 0),
        Rule::new(RiscoSantander::Medio, |score: &i32| *score <= 2),
        Rule::new(RiscoSantander::Alto, |score: &i32| *score <= 4),
    ],
    fallback: RiscoSantander::MuitoAlto,
};

/// Score contribution of financial health. One entry per label.
pub fn health_points(health: SaudeFinanceira) -> i32 {
    match health {
        SaudeFinanceira::Saudavel => -3,
        SaudeFinanceira::AlavancagemEstrategica => -1,
        SaudeFinanceira::PontoDeAtencao => 2,
        SaudeFinanceira::Endividada => 4,
    }
}

pub fn maturity_points(maturity: Maturidade) -> i32 {
    match maturity {
        Maturidade::Madura => -1,
        Maturidade::Inicial => 1,
    }
}

pub fn dependency_points(dependency: DependenciaB2B) -> i32 {
    match dependency {
        DependenciaB2B::DependenteDeClientes | DependenciaB2B::DependenteDeFornecedores => 1,
        DependenciaB2B::HubDePagamentos => -1,
        DependenciaB2B::ConcentradoraDeRecebimentos
        | DependenciaB2B::RelacionamentoEquilibrado
        | DependenciaB2B::NaoClassificado => 0,
    }
}

pub fn risk_score(
    health: SaudeFinanceira,
    maturity: Maturidade,
    dependency: DependenciaB2B,
) -> i32 {
    health_points(health) + maturity_points(maturity) + dependency_points(dependency)
}

pub fn risk_tier(score: i32) -> RiscoSantander {
    RISK_TIERS.classify(&score)
}

pub fn credit_opportunity(health: SaudeFinanceira, risk: RiscoSantander) -> OportunidadeCredito {
    let sound = matches!(
        health,
        SaudeFinanceira::Saudavel | SaudeFinanceira::AlavancagemEstrategica
    );
    let low_risk = matches!(risk, RiscoSantander::Baixo | RiscoSantander::MuitoBaixo);

    if sound && low_risk {
        OportunidadeCredito::Sim
    } else {
        OportunidadeCredito::Nao
    }
}

/// Builds one output row from a profile and its relationship, if any.
pub fn score_company(enriched: &EnrichedProfile, relationship: Option<&Relationship>) -> CompanyRecord {
    let (counts, intensity, dependency) = match relationship {
        Some(rel) => (rel.counts, rel.intensity, rel.dependency),
        None => (
            TransactionCounts::default(),
            IntensidadeB2B::NaoClassificado,
            DependenciaB2B::NaoClassificado,
        ),
    };

    let score = risk_score(enriched.health, enriched.maturity, dependency);
    let risk = risk_tier(score);
    let profile = &enriched.profile;

    CompanyRecord {
        id: profile.id.clone(),
        opened_on: profile.opened_at.date(),
        reference_on: profile.reference_at.map(|r| r.date()),
        cnae: profile.cnae.clone(),
        revenue: profile.revenue,
        balance: profile.balance,
        active_days: enriched.active_days,
        active_years: enriched.active_years,
        maturity: enriched.maturity,
        health: enriched.health,
        company_profile: enriched.company_profile.clone(),
        received: counts.received,
        paid: counts.paid,
        total_transactions: counts.total(),
        intensity,
        dependency,
        risk_score: score,
        risk,
        credit_opportunity: credit_opportunity(enriched.health, risk),
    }
}

/// Left-joins every enriched profile with its relationship and scores it.
///
/// Output follows profile order; companies without transactions get zero
/// counts and unclassified relationship labels.
pub fn merge_and_score(
    enriched: &[EnrichedProfile],
    relationships: &BTreeMap<String, Relationship>,
) -> Vec<CompanyRecord> {
    let records: Vec<CompanyRecord> = enriched
        .iter()
        .map(|e| score_company(e, relationships.get(&e.profile.id)))
        .collect();

    let unmatched = records
        .iter()
        .filter(|r| r.intensity == IntensidadeB2B::NaoClassificado)
        .count();
    if unmatched > 0 {
        tracing::debug!("{} compan(ies) without transactions", unmatched);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tier_boundaries() {
        assert_eq!(risk_tier(-6), RiscoSantander::MuitoBaixo);
        assert_eq!(risk_tier(-2), RiscoSantander::MuitoBaixo);
        assert_eq!(risk_tier(-1), RiscoSantander::Baixo);
        assert_eq!(risk_tier(0), RiscoSantander::Baixo);
        assert_eq!(risk_tier(1), RiscoSantander::Medio);
        assert_eq!(risk_tier(2), RiscoSantander::Medio);
        assert_eq!(risk_tier(3), RiscoSantander::Alto);
        assert_eq!(risk_tier(4), RiscoSantander::Alto);
        assert_eq!(risk_tier(5), RiscoSantander::MuitoAlto);
    }

    #[test]
    fn test_score_components() {
        assert_eq!(
            risk_score(
                SaudeFinanceira::Saudavel,
                Maturidade::Madura,
                DependenciaB2B::NaoClassificado
            ),
            -4
        );
        assert_eq!(
            risk_score(
                SaudeFinanceira::Endividada,
                Maturidade::Inicial,
                DependenciaB2B::DependenteDeFornecedores
            ),
            6
        );
        assert_eq!(
            risk_score(
                SaudeFinanceira::AlavancagemEstrategica,
                Maturidade::Inicial,
                DependenciaB2B::HubDePagamentos
            ),
            -1
        );
    }

    #[test]
    fn test_credit_opportunity_needs_sound_health_and_low_risk() {
        assert_eq!(
            credit_opportunity(SaudeFinanceira::Saudavel, RiscoSantander::MuitoBaixo),
            OportunidadeCredito::Sim
        );
        assert_eq!(
            credit_opportunity(SaudeFinanceira::AlavancagemEstrategica, RiscoSantander::Baixo),
            OportunidadeCredito::Sim
        );
        assert_eq!(
            credit_opportunity(SaudeFinanceira::Saudavel, RiscoSantander::Medio),
            OportunidadeCredito::Nao
        );
        assert_eq!(
            credit_opportunity(SaudeFinanceira::PontoDeAtencao, RiscoSantander::Baixo),
            OportunidadeCredito::Nao
        );
    }
}
