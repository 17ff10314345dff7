//! Analytics libraries for Bitcoin-like chains
//!
//! This crate scores transaction outputs with a weighted catalogue of
//! change-detection heuristics, folds per-address transaction streams into
//! wallet summaries and bounded histories, and resolves curated address
//! clusters with live balances.
//!
//! ## Features
//!
//! This crate provides several optional features:
//!
//! - `server`: Enables the axum HTTP transport and the `analytics_api` binary
//! - `storage`: Enables the SQLite-backed enrichment store
//!
//! Both are on by default. Without `storage`, enrichment annotations come
//! from the in-memory store only; without `server`, the crate is a plain
//! library.
//!
//! ```toml
//! [dependencies]
//! chain_analytics_libs = { version = "0.2", default-features = false }
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chain_analytics_libs::api::AnalyticsApi;
//! use chain_analytics_libs::chain::MemoryChainProvider;
//! use chain_analytics_libs::enrichment::MemoryEnrichmentStore;
//!
//! # fn main() -> chain_analytics_libs::errors::AnalyticsResult<()> {
//! let chain = Arc::new(MemoryChainProvider::from_file("chain.json".as_ref())?);
//! let store = Arc::new(MemoryEnrichmentStore::new());
//! let api = AnalyticsApi::with_defaults(chain, store)?;
//! let report = api.transaction_report("3e0b...")?;
//! println!("likely recipients: {:?}", report.likely_recipients);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod api;
pub mod chain;
pub mod cluster;
pub mod config;
pub mod data_structures;
pub mod enrichment;
pub mod errors;
pub mod heuristics;
pub mod scoring;

#[cfg(feature = "server")]
pub mod server;

pub use api::AnalyticsApi;
pub use config::EngineConfig;
pub use errors::{AnalyticsError, AnalyticsResult};
pub use heuristics::{HeuristicKind, HeuristicWeights, DEFAULT_SCORE_THRESHOLD};
pub use scoring::{ChangeClassifier, ScoreTable};
