/// HTTP API tests
/// Drives the router in-process with `tower::ServiceExt::oneshot`
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use rust_b2b_risk_api::cache::PipelineCache;
use rust_b2b_risk_api::config::Config;
use rust_b2b_risk_api::handlers::{load_dataset, router, AppState};
use rust_b2b_risk_api::pipeline::{Dataset, SourceTables};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const PROFILES: &str = "ID,DT_ABRT,VL_FATU,VL_SLDO,DS_CNAE\n\
    100,2010-05-01,2000000,500000,Comercio\n\
    200,2022-02-01,300000,-60000,Industria\n\
    300,2012-09-15,900000,-20000,Comercio\n\
    400,2023-06-30,-1000,-50,Servicos\n";

const TRANSACTIONS: &str = "ID_PGTO,ID_RCBE,VL\n\
    200,100,5000\n\
    300,100,12000\n\
    300,100,1000\n\
    100,400,700\n";

/// Helper function to create test config
fn create_test_config() -> Config {
    Config {
        port: 0,
        profile_csv_path: PathBuf::from("/nonexistent/Base1.csv"),
        transactions_csv_path: PathBuf::from("/nonexistent/Base2.csv"),
        chain_top_n: 10,
        default_page_size: 2,
        max_page_size: 3,
        pipeline_cache_ttl_secs: 60,
        pipeline_cache_capacity: 4,
        reference_date: NaiveDate::from_ymd_opt(2024, 1, 1),
    }
}

fn create_test_state() -> Arc<AppState> {
    let tables = SourceTables {
        profiles: PROFILES.as_bytes().to_vec(),
        transactions: TRANSACTIONS.as_bytes().to_vec(),
    };
    let reference = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let dataset = Dataset::build(&tables, reference).unwrap();
    let config = create_test_config();
    let cache = PipelineCache::from_config(&config);
    Arc::new(AppState::new(config, Arc::new(dataset), cache))
}

async fn send(state: Arc<AppState>, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router(state)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_dataset_size() {
    let (status, body) = send(create_test_state(), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companies"], 4);
}

#[tokio::test]
async fn test_list_companies_paginates() {
    let state = create_test_state();

    let (status, body) = send(state.clone(), "GET", "/api/v1/companies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["next_offset"], 2);
    assert_eq!(body["items"][0]["ID"], "100");

    let (_, body) = send(state, "GET", "/api/v1/companies?offset=2&limit=50").await;
    assert_eq!(body["limit"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["next_offset"], Value::Null);
}

#[tokio::test]
async fn test_filters_use_exact_labels() {
    let state = create_test_state();

    let (_, body) = send(
        state.clone(),
        "GET",
        "/api/v1/companies?DS_CNAE=Comercio&Risco_Santander=Muito%20Baixo",
    )
    .await;
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["ID"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["100", "300"]);

    let (status, body) = send(state, "GET", "/api/v1/companies?cnae=Agro").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_get_company_and_not_found() {
    let state = create_test_state();

    let (status, body) = send(state.clone(), "GET", "/api/v1/companies/200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Saude_Financeira"], "Endividada");
    assert_eq!(body["Maturidade"], "Inicial");
    assert_eq!(body["Perfil_da_Empresa"], "Inicial - Endividada");
    assert_eq!(body["Dependencia_B2B"], "Hub de Pagamentos");
    assert_eq!(body["Pontuacao_Risco"], 4);
    assert_eq!(body["Risco_Santander"], "Alto");
    assert_eq!(body["Oportunidade_Credito"], "Não");

    let (status, body) = send(state, "GET", "/api/v1/companies/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_chain_analysis_endpoint() {
    let state = create_test_state();

    let (status, body) = send(state.clone(), "GET", "/api/v1/companies/100/chain").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clients"][0]["id"], "300");
    assert_eq!(body["clients"][0]["total_value"], 13000.0);
    assert_eq!(body["clients"][0]["transactions"], 2);
    assert_eq!(body["clients"][1]["id"], "200");
    assert_eq!(body["suppliers"][0]["id"], "400");
    assert_eq!(body["suppliers"][0]["Saude_Financeira"], "Endividada");

    let (_, body) = send(state.clone(), "GET", "/api/v1/companies/100/chain?top_n=1").await;
    assert_eq!(body["clients"].as_array().unwrap().len(), 1);

    let (status, _) = send(state, "GET", "/api/v1/companies/100/chain?top_n=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_and_opportunities() {
    let state = create_test_state();

    let (_, stats) = send(state.clone(), "GET", "/api/v1/stats").await;
    assert_eq!(stats["total_companies"], 4);
    assert_eq!(stats["shown_companies"], 4);
    let risk_total: u64 = stats["by_risk"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["count"].as_u64().unwrap())
        .sum();
    assert_eq!(risk_total, 4);

    let (_, stats) = send(state.clone(), "GET", "/api/v1/stats?DS_CNAE=Nada").await;
    assert_eq!(stats["shown_companies"], 0);
    assert_eq!(stats["by_risk"].as_array().unwrap().len(), 0);

    let (_, opportunities) = send(state, "GET", "/api/v1/opportunities").await;
    let ids: Vec<&str> = opportunities["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["ID"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["100", "300"]);
}

#[tokio::test]
async fn test_filter_options_sorted() {
    let (_, body) = send(create_test_state(), "GET", "/api/v1/filters").await;
    assert_eq!(
        body["DS_CNAE"],
        serde_json::json!(["Comercio", "Industria", "Servicos"])
    );
    assert_eq!(body["Oportunidade_Credito"], serde_json::json!(["Sim", "Não"]));
}

#[tokio::test]
async fn test_reload_with_missing_files_keeps_dataset() {
    let state = create_test_state();

    let (status, body) = send(state.clone(), "POST", "/api/v1/reload").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Input missing"));

    let (_, health) = send(state, "GET", "/health").await;
    assert_eq!(health["companies"], 4);
}

#[tokio::test]
async fn test_reload_reuses_startup_cache() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config();
    config.profile_csv_path = dir.path().join("Base1.csv");
    config.transactions_csv_path = dir.path().join("Base2.csv");
    std::fs::write(&config.profile_csv_path, PROFILES).unwrap();
    std::fs::write(&config.transactions_csv_path, TRANSACTIONS).unwrap();

    let cache = PipelineCache::from_config(&config);
    let dataset = load_dataset(&config, &cache).await.unwrap();
    assert_eq!(cache.entry_count().await, 1);

    let state = Arc::new(AppState::new(config, dataset.clone(), cache));

    let (status, body) = send(state.clone(), "POST", "/api/v1/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companies"], 4);

    // Unchanged tables hit the entry built at startup
    assert_eq!(state.pipeline_cache.entry_count().await, 1);
    assert!(Arc::ptr_eq(&state.current().await, &dataset));
}
