//! B2B Company Risk Classification Library
//!
//! This library turns a company-profile table and a bilateral transaction
//! table into a scored, labeled company dataset, and serves read-only queries
//! over the result.
//!
//! # Modules
//!
//! - `aggregation`: Per-company directional transaction counts.
//! - `batch`: One-shot CSV classification behind `classify_companies`.
//! - `cache`: Pipeline memoization keyed by input fingerprints.
//! - `config`: Configuration management.
//! - `enrichment`: Age, maturity and financial-health labels.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `loader`: CSV table loading and validation.
//! - `models`: Core data models and classification labels.
//! - `pipeline`: Orchestration of the classification stages.
//! - `query`: Filters, pagination, aggregates and chain analysis.
//! - `relationship`: B2B intensity and dependency labels.
//! - `rules`: Ordered first-match classification tables.
//! - `scoring`: Merge, risk score, risk tier and credit opportunity.

pub mod aggregation;
pub mod batch;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod relationship;
pub mod rules;
pub mod scoring;

pub use errors::AppError;
pub use pipeline::{run_pipeline, Dataset, SourceTables};
