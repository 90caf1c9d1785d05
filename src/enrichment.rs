/// Company profile enrichment.
///
/// Derives, for every profile row and a given reference time:
/// 1. Years in activity (`Tempo_Atividade_Anos`)
/// 2. Maturity bucket (`Maturidade`)
/// 3. Financial health (`Saude_Financeira`)
/// 4. Combined profile label (`Perfil_da_Empresa`)
use crate::models::{CompanyProfile, EnrichedProfile, Maturidade, SaudeFinanceira};
use crate::rules::{Rule, RuleTable};
use chrono::NaiveDateTime;

pub const DAYS_PER_YEAR: f64 = 365.25;
pub const MATURITY_YEARS: f64 = 5.0;

const SECONDS_PER_DAY: i64 = 86_400;

/// Revenue and balance of one company, the inputs of the health table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSheet {
    pub revenue: f64,
    pub balance: f64,
}

impl BalanceSheet {
    /// Share of revenue that the negative balance represents.
    fn debt_ratio(&self) -> f64 {
        self.balance.abs() / self.revenue
    }
}

/// Health rules. Ratio rules only run once revenue is positive and the
/// balance negative, so the division is always well defined.
pub static HEALTH_RULES: RuleTable<BalanceSheet, SaudeFinanceira> = RuleTable {
    rules: &[
        Rule::new(SaudeFinanceira::Endividada, |b: &BalanceSheet| b.revenue <= 0.0 && b.balance < 0.0),
        Rule::new(SaudeFinanceira::Saudavel, |b: &BalanceSheet| b.revenue <= 0.0),
        Rule::new(SaudeFinanceira::Saudavel, |b: &BalanceSheet| b.balance >= 0.0),
        Rule::new(SaudeFinanceira::AlavancagemEstrategica, |b: &BalanceSheet| b.debt_ratio() < 0.05),
        Rule::new(SaudeFinanceira::PontoDeAtencao, |b: &BalanceSheet| b.debt_ratio() < 0.10),
    ],
    fallback: SaudeFinanceira::Endividada,
};

pub static MATURITY_RULES: RuleTable<f64, Maturidade> = RuleTable {
    rules: &[Rule::new(Maturidade::Madura, |years: &f64| *years > MATURITY_YEARS)],
    fallback: Maturidade::Inicial,
};

/// Whole days between two instants, floored like a calendar day count.
pub fn elapsed_days(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Years in activity at `reference`, rounded to one decimal (ties to even).
pub fn active_years(opened_at: NaiveDateTime, reference: NaiveDateTime) -> f64 {
    let years = elapsed_days(opened_at, reference) as f64 / DAYS_PER_YEAR;
    (years * 10.0).round_ties_even() / 10.0
}

pub fn classify_maturity(active_years: f64) -> Maturidade {
    MATURITY_RULES.classify(&active_years)
}

pub fn classify_health(revenue: f64, balance: f64) -> SaudeFinanceira {
    HEALTH_RULES.classify(&BalanceSheet { revenue, balance })
}

pub fn profile_label(maturity: Maturidade, health: SaudeFinanceira) -> String {
    format!("{} - {}", maturity, health)
}

/// Enriches one profile row.
pub fn enrich_profile(profile: &CompanyProfile, reference: NaiveDateTime) -> EnrichedProfile {
    let years = active_years(profile.opened_at, reference);
    let maturity = classify_maturity(years);
    let health = classify_health(profile.revenue, profile.balance);
    let active_days = profile
        .reference_at
        .map(|snapshot| elapsed_days(profile.opened_at, snapshot));

    EnrichedProfile {
        profile: profile.clone(),
        active_years: years,
        active_days,
        maturity,
        health,
        company_profile: profile_label(maturity, health),
    }
}

/// Enriches the whole profile table, preserving row order.
pub fn enrich_profiles(profiles: &[CompanyProfile], reference: NaiveDateTime) -> Vec<EnrichedProfile> {
    let enriched: Vec<EnrichedProfile> = profiles
        .iter()
        .map(|profile| enrich_profile(profile, reference))
        .collect();

    tracing::debug!(
        "Enriched {} profile(s), {} mature",
        enriched.len(),
        enriched
            .iter()
            .filter(|e| e.maturity == Maturidade::Madura)
            .count()
    );

    enriched
}
