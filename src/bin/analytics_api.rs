//! Chain Analytics HTTP Server
//!
//! Serves change-detection heuristics, wallet summaries and cluster lookups
//! over HTTP from an in-memory chain snapshot.
//!
//! ## Usage
//! ```bash
//! # Serve the bundled demo snapshot with the default catalogue on port 4000
//! cargo run --bin analytics_api -- --snapshot demos/sample_snapshot.json
//!
//! # Attach a SQLite enrichment database and raise the change threshold
//! cargo run --bin analytics_api -- --snapshot chain.json \
//!     --enrichment-db enrichment.db --threshold 10
//!
//! # Bind elsewhere and widen the aggregation worker pool
//! cargo run --bin analytics_api -- --snapshot chain.json \
//!     --bind 127.0.0.1:8080 --workers 16
//!
//! # Show help
//! cargo run --bin analytics_api -- --help
//! ```
//!
//! Log verbosity follows `RUST_LOG` when set and defaults to `info`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chain_analytics_libs::api::AnalyticsApi;
use chain_analytics_libs::chain::MemoryChainProvider;
use chain_analytics_libs::config::EngineConfig;
use chain_analytics_libs::enrichment::{
    EnrichmentStore, MemoryEnrichmentStore, SqliteEnrichmentStore,
};
use chain_analytics_libs::errors::{AnalyticsError, AnalyticsResult};
use chain_analytics_libs::server;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Address and port to listen on
    #[arg(long, default_value = "0.0.0.0:4000", help = "Address and port to listen on")]
    bind: String,

    /// Chain snapshot to serve
    #[arg(long, help = "Path to the JSON chain snapshot")]
    snapshot: PathBuf,

    /// Optional SQLite enrichment database
    #[arg(
        long,
        help = "SQLite database with profiles and clusters. Annotations stay empty when omitted"
    )]
    enrichment_db: Option<PathBuf>,

    /// Change score threshold override
    #[arg(long, help = "Score at or above which an output counts as change")]
    threshold: Option<u32>,

    /// Worker pool size override
    #[arg(long, help = "Number of aggregation worker threads")]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> AnalyticsResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let addr: SocketAddr = args.bind.parse().map_err(|e| {
        AnalyticsError::InvalidInput(format!("invalid bind address {}: {e}", args.bind))
    })?;

    let chain = Arc::new(MemoryChainProvider::from_file(&args.snapshot)?);
    info!(
        snapshot = %args.snapshot.display(),
        transactions = chain.transaction_count(),
        addresses = chain.address_count(),
        "chain snapshot loaded"
    );

    let store: Arc<dyn EnrichmentStore> = match &args.enrichment_db {
        Some(path) => {
            info!(database = %path.display(), "using sqlite enrichment store");
            Arc::new(SqliteEnrichmentStore::open(path)?)
        }
        None => {
            info!("no enrichment database given, annotations will stay empty");
            Arc::new(MemoryEnrichmentStore::new())
        }
    };

    let mut config = EngineConfig::default();
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let api = AnalyticsApi::new(chain, store, &config)?;
    server::serve(Arc::new(api), addr).await
}
