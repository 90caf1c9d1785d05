use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ============ Classification Labels ============

/// Declares a closed set of labels that serialize as their Portuguese text.
macro_rules! labels {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every label, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

labels! {
    /// Age bucket of a company.
    pub enum Maturidade {
        Madura => "Madura",
        Inicial => "Inicial",
    }
}

labels! {
    /// Financial health derived from revenue and balance.
    pub enum SaudeFinanceira {
        Saudavel => "Saudável",
        AlavancagemEstrategica => "Alavancagem Estratégica",
        PontoDeAtencao => "Ponto de Atenção",
        Endividada => "Endividada",
    }
}

labels! {
    /// Bucket of the total number of B2B transactions.
    pub enum IntensidadeB2B {
        MuitoAlta => "Muito Alta",
        Alta => "Alta",
        Media => "Média",
        Baixa => "Baixa",
        MuitoBaixa => "Muito Baixa",
        /// Company has no transactions at all.
        NaoClassificado => "Não Classificado",
    }
}

labels! {
    /// Directional imbalance between paid and received transactions.
    pub enum DependenciaB2B {
        HubDePagamentos => "Hub de Pagamentos",
        ConcentradoraDeRecebimentos => "Concentradora de Recebimentos",
        DependenteDeClientes => "Dependente de Clientes",
        DependenteDeFornecedores => "Dependente de Fornecedores",
        RelacionamentoEquilibrado => "Relacionamento Equilibrado",
        /// Company has no transactions at all.
        NaoClassificado => "Não Classificado",
    }
}

labels! {
    /// Credit risk tier, from the aggregated integer score.
    pub enum RiscoSantander {
        MuitoBaixo => "Muito Baixo",
        Baixo => "Baixo",
        Medio => "Médio",
        Alto => "Alto",
        MuitoAlto => "Muito Alto",
    }
}

labels! {
    pub enum OportunidadeCredito {
        Sim => "Sim",
        Nao => "Não",
    }
}

// ============ Source Tables ============

/// A validated row of the company-profile table.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyProfile {
    /// Company identifier (CNPJ or similar), already normalized.
    pub id: String,
    /// Founding date (`DT_ABRT`).
    pub opened_at: NaiveDateTime,
    /// Snapshot reference date (`DT_REFE`), when the table carries one.
    pub reference_at: Option<NaiveDateTime>,
    /// Revenue (`VL_FATU`).
    pub revenue: f64,
    /// Balance (`VL_SLDO`).
    pub balance: f64,
    /// Sector classification (`DS_CNAE`).
    pub cnae: String,
}

/// A transaction row that survived null-ID filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Payer identifier (`ID_PGTO`).
    pub payer: String,
    /// Receiver identifier (`ID_RCBE`).
    pub receiver: String,
    /// Transaction value (`VL`). `None` when the cell was empty.
    pub value: Option<f64>,
}

// ============ Pipeline Stages ============

/// Profile row plus the labels derived from it alone.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedProfile {
    pub profile: CompanyProfile,
    pub active_years: f64,
    pub active_days: Option<i64>,
    pub maturity: Maturidade,
    pub health: SaudeFinanceira,
    pub company_profile: String,
}

/// Directional transaction counts of one company.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionCounts {
    pub received: u64,
    pub paid: u64,
}

impl TransactionCounts {
    pub fn total(&self) -> u64 {
        self.received + self.paid
    }
}

/// Classified B2B relationship of one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub counts: TransactionCounts,
    pub intensity: IntensidadeB2B,
    pub dependency: DependenciaB2B,
}

/// One row of the pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DT_ABRT")]
    pub opened_on: NaiveDate,
    #[serde(rename = "DT_REFE")]
    pub reference_on: Option<NaiveDate>,
    #[serde(rename = "DS_CNAE")]
    pub cnae: String,
    #[serde(rename = "VL_FATU")]
    pub revenue: f64,
    #[serde(rename = "VL_SLDO")]
    pub balance: f64,
    #[serde(rename = "Tempo_Atividade_dias")]
    pub active_days: Option<i64>,
    #[serde(rename = "Tempo_Atividade_Anos")]
    pub active_years: f64,
    #[serde(rename = "Maturidade")]
    pub maturity: Maturidade,
    #[serde(rename = "Saude_Financeira")]
    pub health: SaudeFinanceira,
    #[serde(rename = "Perfil_da_Empresa")]
    pub company_profile: String,
    #[serde(rename = "Transacoes_Recebidas")]
    pub received: u64,
    #[serde(rename = "Transacoes_Pagas")]
    pub paid: u64,
    #[serde(rename = "Total_Transacoes")]
    pub total_transactions: u64,
    #[serde(rename = "Intensidade_B2B")]
    pub intensity: IntensidadeB2B,
    #[serde(rename = "Dependencia_B2B")]
    pub dependency: DependenciaB2B,
    #[serde(rename = "Pontuacao_Risco")]
    pub risk_score: i32,
    #[serde(rename = "Risco_Santander")]
    pub risk: RiscoSantander,
    #[serde(rename = "Oportunidade_Credito")]
    pub credit_opportunity: OportunidadeCredito,
}

// ============ Query Models ============

/// Exact-match filters over the output table.
///
/// Each field accepts the short name or the output column name. A missing
/// field or the value `"Todos"` leaves that column unconstrained.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFilter {
    #[serde(alias = "DS_CNAE")]
    pub cnae: Option<String>,
    #[serde(alias = "Perfil_da_Empresa", alias = "estado", alias = "Estado_da_Empresa")]
    pub perfil: Option<String>,
    #[serde(alias = "Maturidade")]
    pub maturidade: Option<String>,
    #[serde(alias = "Saude_Financeira")]
    pub saude: Option<String>,
    #[serde(alias = "Intensidade_B2B")]
    pub intensidade: Option<String>,
    #[serde(alias = "Dependencia_B2B")]
    pub dependencia: Option<String>,
    #[serde(alias = "Risco_Santander")]
    pub risco: Option<String>,
    #[serde(alias = "Oportunidade_Credito")]
    pub oportunidade: Option<String>,
}

/// Explicit pagination cursor.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChainParams {
    pub top_n: Option<usize>,
}

/// One page of results plus the cursor to the next one.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub next_offset: Option<usize>,
}

/// Distinct values available for each filterable column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    #[serde(rename = "DS_CNAE")]
    pub cnae: Vec<String>,
    #[serde(rename = "Perfil_da_Empresa")]
    pub perfil: Vec<String>,
    #[serde(rename = "Maturidade")]
    pub maturidade: Vec<String>,
    #[serde(rename = "Saude_Financeira")]
    pub saude: Vec<String>,
    #[serde(rename = "Intensidade_B2B")]
    pub intensidade: Vec<String>,
    #[serde(rename = "Dependencia_B2B")]
    pub dependencia: Vec<String>,
    #[serde(rename = "Risco_Santander")]
    pub risco: Vec<String>,
    #[serde(rename = "Oportunidade_Credito")]
    pub oportunidade: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Company counts per (dependency, risk tier) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskDependencyPivot {
    /// Risk tiers, in tier order.
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub dependency: String,
    /// Counts aligned with `RiskDependencyPivot::columns`.
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_companies: usize,
    pub shown_companies: usize,
    pub by_profile: Vec<LabelCount>,
    pub by_risk: Vec<LabelCount>,
    pub risk_by_dependency: RiskDependencyPivot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "VL_FATU")]
    pub revenue: f64,
    #[serde(rename = "VL_SLDO")]
    pub balance: f64,
    #[serde(rename = "Risco_Santander")]
    pub risk: RiscoSantander,
}

/// A counterparty ranked by the value it moved with the analyzed company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterparty {
    pub id: String,
    pub total_value: f64,
    pub transactions: u64,
    #[serde(rename = "DS_CNAE")]
    pub cnae: Option<String>,
    #[serde(rename = "Saude_Financeira")]
    pub health: Option<SaudeFinanceira>,
    #[serde(rename = "Risco_Santander")]
    pub risk: Option<RiscoSantander>,
}

/// Top clients and suppliers of one company.
#[derive(Debug, Clone, Serialize)]
pub struct ChainAnalysis {
    pub company: CompanyRecord,
    /// Companies that paid the analyzed company.
    pub clients: Vec<Counterparty>,
    /// Companies the analyzed company paid.
    pub suppliers: Vec<Counterparty>,
}
