//! HTTP transport
//!
//! Thin axum layer over [`AnalyticsApi`]. Lookup keys arrive as query
//! parameters (`GET /info/addr?hash=...`) or, for bounded history, as a JSON
//! body on `POST /info/addr`. The engine is synchronous, so every operation
//! runs on the blocking pool. Input-shaped failures map to 404 with the
//! engine's message, backend failures to 500.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::AnalyticsApi;
use crate::errors::{AnalyticsError, AnalyticsResult};

const MISSING_QUERY: &str = "Query string not found.";

/// Assemble the router over a shared engine
pub fn router(api: Arc<AnalyticsApi>) -> Router {
    Router::new()
        .route("/info/addr", get(wallet_summary).post(wallet_history))
        .route("/info/txid", get(transaction_report))
        .route("/info/cluster", get(cluster_record))
        .route("/cluster", get(cluster_membership))
        .route("/heuristic", get(change_classification))
        .with_state(api)
}

/// Serve the router until SIGINT or SIGTERM
pub async fn serve(api: Arc<AnalyticsApi>, addr: SocketAddr) -> AnalyticsResult<()> {
    let app = router(api);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AnalyticsError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!(%addr, "analytics api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AnalyticsError::Internal(format!("server error: {e}")))?;
    info!("analytics api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

async fn wallet_summary(
    State(api): State<Arc<AnalyticsApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let address = match required_param(&params, "hash") {
        Ok(value) => value,
        Err(response) => return response,
    };
    run_blocking(move || api.wallet_summary(&address)).await
}

async fn wallet_history(
    State(api): State<Arc<AnalyticsApi>>,
    Json(body): Json<Value>,
) -> Response {
    let hash = match body.get("hash").and_then(Value::as_str) {
        Some(value) => value.to_string(),
        None => return bad_request("Missing or invalid 'hash'."),
    };
    let start = match body.get("start_date").and_then(Value::as_i64) {
        Some(value) => value,
        None => return bad_request("Missing or invalid 'start_date'."),
    };
    let end = match body.get("end_date").and_then(Value::as_i64) {
        Some(value) => value,
        None => return bad_request("Missing or invalid 'end_date'."),
    };
    run_blocking(move || api.wallet_history(&hash, start, end)).await
}

async fn transaction_report(
    State(api): State<Arc<AnalyticsApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let hash = match required_param(&params, "hash") {
        Ok(value) => value,
        Err(response) => return response,
    };
    run_blocking(move || api.transaction_report(&hash)).await
}

async fn change_classification(
    State(api): State<Arc<AnalyticsApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let hash = match required_param(&params, "hash") {
        Ok(value) => value,
        Err(response) => return response,
    };
    run_blocking(move || api.change_classification(&hash)).await
}

async fn cluster_record(
    State(api): State<Arc<AnalyticsApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let target = match required_param(&params, "target") {
        Ok(value) => value,
        Err(response) => return response,
    };
    run_blocking(move || api.cluster_record(&target)).await
}

async fn cluster_membership(
    State(api): State<Arc<AnalyticsApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let address = match required_param(&params, "hash") {
        Ok(value) => value,
        Err(response) => return response,
    };
    run_blocking(move || api.cluster_membership(&address)).await
}

fn required_param(params: &HashMap<String, String>, key: &str) -> Result<String, Response> {
    match params.get(key) {
        Some(value) => Ok(value.clone()),
        None => Err((StatusCode::BAD_REQUEST, MISSING_QUERY).into_response()),
    }
}

fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

async fn run_blocking<T, F>(op: F) -> Response
where
    T: serde::Serialize + Send + 'static,
    F: FnOnce() -> AnalyticsResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(Ok(payload)) => (StatusCode::OK, Json(payload)).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join) => error_response(&AnalyticsError::Internal(format!(
            "worker task failed: {join}"
        ))),
    }
}

fn error_response(err: &AnalyticsError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::{ChainSnapshot, MemoryChainProvider};
    use crate::data_structures::{
        AddressType, ClusterDocument, OutPoint, Transaction, TxInput, TxOutput,
    };
    use crate::enrichment::MemoryEnrichmentStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn output(index: u32, value: i64, address: &str) -> TxOutput {
        TxOutput {
            index,
            value,
            address: address.to_string(),
            address_type: AddressType::PubkeyHash,
            spent: false,
            spent_by: None,
        }
    }

    fn input(index: u32, spends: OutPoint, address: &str) -> TxInput {
        TxInput {
            index,
            value: 0,
            address: address.to_string(),
            address_type: AddressType::PubkeyHash,
            spends,
        }
    }

    fn tx(
        hash: &str,
        tx_index: u64,
        timestamp: i64,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
    ) -> Transaction {
        Transaction {
            hash: hash.to_string(),
            block_height: tx_index,
            timestamp,
            size: 250,
            version: 2,
            locktime: 0,
            coinbase: inputs.is_empty(),
            inputs,
            outputs,
            tx_index,
        }
    }

    fn test_router() -> Router {
        let coinbase = tx("c0", 1, 1_000, vec![], vec![output(0, 50_000, "alice")]);
        let pay_bob = tx(
            "a1",
            2,
            2_000,
            vec![input(0, OutPoint::new("c0", 0), "alice")],
            vec![output(0, 30_000, "bob"), output(1, 19_000, "alice")],
        );
        let chain = Arc::new(
            MemoryChainProvider::new(ChainSnapshot::new(vec![coinbase, pay_bob])).unwrap(),
        );
        let store = MemoryEnrichmentStore::new();
        store
            .insert_cluster(ClusterDocument::new(
                "507f1f77bcf86cd799439011",
                "miners",
                vec!["alice".to_string()],
            ))
            .unwrap();
        let api = AnalyticsApi::with_defaults(chain, Arc::new(store)).unwrap();
        router(Arc::new(api))
    }

    async fn get_response(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        decode(response).await
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        decode(response).await
    }

    async fn decode(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    #[tokio::test]
    async fn test_wallet_summary_endpoint() {
        let (status, body) = get_response(test_router(), "/info/addr?hash=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["n_tx"], 2);
        assert_eq!(body["final_balance"], 19_000);
        assert_eq!(body["cluster"]["name"], "miners");
        assert_eq!(body["first_seen_sending"], 2_000);
        // Idle directions serialize as explicit nulls
        assert!(body["last_seen_receiving"].is_number());
    }

    #[tokio::test]
    async fn test_missing_query_parameter_is_bad_request() {
        let (status, body) = get_response(test_router(), "/info/addr").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, Value::String("Query string not found.".to_string()));

        let (status, _) = get_response(test_router(), "/info/cluster?hash=miners").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_hash_maps_to_not_found() {
        let (status, body) = get_response(test_router(), "/info/txid?hash=deadbeef").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("deadbeef"));
    }

    #[tokio::test]
    async fn test_transaction_and_heuristic_endpoints() {
        let (status, body) = get_response(test_router(), "/info/txid?hash=a1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fee"], 1_000);
        assert_eq!(body["likely_recipients"], json!(["alice", "bob"]));

        let (status, body) = get_response(test_router(), "/heuristic?hash=a1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["threshold"], 8);
        assert_eq!(body["outputs"][1]["score"], 7);
    }

    #[tokio::test]
    async fn test_cluster_endpoints() {
        let (status, body) = get_response(test_router(), "/info/cluster?target=miners").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["n_wallet"], 1);
        assert_eq!(body["wallet"][0]["address"], "alice");

        let (status, body) = get_response(test_router(), "/cluster?hash=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cluster_name"], "miners");

        let (status, _) = get_response(test_router(), "/cluster?hash=bob").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_post_validates_fields() {
        let (status, body) = post_json(
            test_router(),
            "/info/addr",
            json!({"hash": "alice", "end_date": 3_000}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            Value::String("Missing or invalid 'start_date'.".to_string())
        );

        let (status, body) = post_json(
            test_router(),
            "/info/addr",
            json!({"hash": "alice", "start_date": 0, "end_date": 3_000}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["n_tx"], 2);
        assert_eq!(body["txs"][0]["txid"], "a1");
    }
}
