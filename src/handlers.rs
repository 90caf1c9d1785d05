use crate::cache::PipelineCache;
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::loader::read_table_bytes;
use crate::models::*;
use crate::pipeline::{reference_for, Dataset, SourceTables};
use crate::query::{self, Field};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Current pipeline output. Readers clone the `Arc`, reload swaps it.
    pub dataset: RwLock<Arc<Dataset>>,
    /// Memoized pipeline runs keyed by input content.
    pub pipeline_cache: PipelineCache,
}

impl AppState {
    /// Takes the cache that produced `dataset` so reloads can reuse it.
    pub fn new(config: Config, dataset: Arc<Dataset>, pipeline_cache: PipelineCache) -> Self {
        Self {
            config,
            dataset: RwLock::new(dataset),
            pipeline_cache,
        }
    }

    /// Snapshot of the current dataset.
    pub async fn current(&self) -> Arc<Dataset> {
        self.dataset.read().await.clone()
    }
}

/// Reads both configured tables and runs (or reuses) the pipeline.
pub async fn load_dataset(config: &Config, cache: &PipelineCache) -> Result<Arc<Dataset>, AppError> {
    let tables = SourceTables {
        profiles: read_table_bytes(&config.profile_csv_path).context("loading profile table")?,
        transactions: read_table_bytes(&config.transactions_csv_path)
            .context("loading transaction table")?,
    };

    cache
        .get_or_build(tables, reference_for(config.reference_date))
        .await
}

/// Routes without the rate limiter, which `main` adds on top.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/v1/companies", get(list_companies))
        .route("/api/v1/companies/:id", get(get_company))
        .route("/api/v1/companies/:id/chain", get(get_company_chain))
        .route("/api/v1/filters", get(get_filter_options))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/opportunities", get(list_opportunities))
        .route("/api/v1/charts/scatter", get(get_scatter))
        .route("/api/v1/reload", post(reload_dataset));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
}

/// Health check endpoint.
///
/// Returns the service status and the size of the loaded dataset.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let dataset = state.current().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-b2b-risk-api",
            "version": env!("CARGO_PKG_VERSION"),
            "companies": dataset.len(),
            "reference": dataset.reference.to_string(),
        })),
    )
}

/// GET /api/v1/companies
///
/// Classified companies matching the filters, one page at a time.
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CompanyFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<CompanyRecord>>, AppError> {
    tracing::info!("GET /companies - filter: {:?}, page: {:?}", filter, page);

    let dataset = state.current().await;
    let rows: Vec<CompanyRecord> = query::filter_companies(&dataset, &filter)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(query::paginate(
        &rows,
        page.offset,
        page.limit,
        state.config.default_page_size,
        state.config.max_page_size,
    )))
}

/// GET /api/v1/companies/:id
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompanyRecord>, AppError> {
    tracing::info!("GET /companies/{}", id);

    let dataset = state.current().await;
    dataset
        .get(id.trim())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))
}

/// GET /api/v1/companies/:id/chain
///
/// Top clients and suppliers of a company by summed transaction value.
pub async fn get_company_chain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ChainParams>,
) -> Result<Json<ChainAnalysis>, AppError> {
    let top_n = params.top_n.unwrap_or(state.config.chain_top_n);
    if top_n == 0 {
        return Err(AppError::BadRequest("top_n must be at least 1".to_string()));
    }

    tracing::info!("GET /companies/{}/chain - top_n: {}", id, top_n);

    let dataset = state.current().await;
    let analysis = query::chain_analysis(&dataset, id.trim(), top_n)?;
    Ok(Json(analysis))
}

/// GET /api/v1/filters
pub async fn get_filter_options(State(state): State<Arc<AppState>>) -> Json<FilterOptions> {
    let dataset = state.current().await;
    Json(query::filter_options(&dataset))
}

/// GET /api/v1/stats
///
/// Chart-ready aggregates over the filtered rows.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CompanyFilter>,
) -> Json<DashboardStats> {
    let dataset = state.current().await;
    let rows = query::filter_companies(&dataset, &filter);

    if rows.is_empty() {
        tracing::debug!("No companies match filter {:?}", filter);
    }

    Json(DashboardStats {
        total_companies: dataset.len(),
        shown_companies: rows.len(),
        by_profile: query::distribution(&rows, Field::Perfil),
        by_risk: query::distribution(&rows, Field::Risco),
        risk_by_dependency: query::risk_dependency_pivot(&rows),
    })
}

/// GET /api/v1/opportunities
///
/// Filtered companies flagged as credit opportunities.
pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CompanyFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<CompanyRecord>>, AppError> {
    let dataset = state.current().await;
    let rows = query::filter_companies(&dataset, &filter);
    let opportunities: Vec<CompanyRecord> = query::credit_opportunities(&rows)
        .into_iter()
        .cloned()
        .collect();

    tracing::info!(
        "GET /opportunities - {} of {} filtered companies",
        opportunities.len(),
        rows.len()
    );

    Ok(Json(query::paginate(
        &opportunities,
        page.offset,
        page.limit,
        state.config.default_page_size,
        state.config.max_page_size,
    )))
}

/// GET /api/v1/charts/scatter
pub async fn get_scatter(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CompanyFilter>,
) -> Json<Vec<ScatterPoint>> {
    let dataset = state.current().await;
    let rows = query::filter_companies(&dataset, &filter);
    Json(query::scatter_points(&rows))
}

/// POST /api/v1/reload
///
/// Re-reads the source tables and swaps in the new dataset. On failure the
/// previous dataset stays in place.
pub async fn reload_dataset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /reload");

    let dataset = load_dataset(&state.config, &state.pipeline_cache)
        .await
        .context("reloading dataset")?;

    let companies = dataset.len();
    *state.dataset.write().await = dataset;

    tracing::info!("✓ Dataset reloaded: {} companies", companies);

    Ok(Json(json!({
        "success": true,
        "companies": companies,
    })))
}
