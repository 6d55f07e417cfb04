//! Data-source clients against an in-process stub server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rivalry_models::ToolsConfig;
use rivalry_tools::{
    QuoteSource, RetryPolicy, SearchSource, TavilyClient, ToolError, YahooFinanceClient,
};
use serde_json::{json, Value};

#[derive(Default)]
struct Stub {
    hits: AtomicUsize,
    fail_first: usize,
    crumb_fetches: AtomicUsize,
    /// Crumb the stub currently accepts; `None` rejects every crumb.
    valid_crumb: Mutex<Option<String>>,
    last_body: Mutex<Option<Value>>,
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base: &str) -> ToolsConfig {
    ToolsConfig {
        yahoo_base_url: base.to_string(),
        yahoo_cookie_url: format!("{base}/cookie"),
        tavily_base_url: base.to_string(),
        http_timeout_seconds: 5,
        ..Default::default()
    }
}

async fn session_cookie() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::SET_COOKIE, "A3=stub-session; Path=/")],
        "",
    )
}

async fn get_crumb(State(stub): State<Arc<Stub>>, headers: HeaderMap) -> (StatusCode, String) {
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("A3=stub-session"));
    if !has_session {
        return (StatusCode::FORBIDDEN, "no session".to_string());
    }
    let n = stub.crumb_fetches.fetch_add(1, Ordering::SeqCst) + 1;
    let crumb = format!("crumb{n}");
    *stub.valid_crumb.lock().unwrap() = Some(crumb.clone());
    (StatusCode::OK, crumb)
}

async fn quote_summary(
    State(stub): State<Arc<Stub>>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let n = stub.hits.fetch_add(1, Ordering::SeqCst);
    if n < stub.fail_first {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})));
    }
    let valid = stub.valid_crumb.lock().unwrap().clone();
    if valid.is_none() || params.get("crumb") != valid.as_ref() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"finance": {"result": null, "error": {
                "code": "Unauthorized",
                "description": "Invalid Crumb"
            }}})),
        );
    }
    if ticker != "DDOG" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"quoteSummary": {"result": null, "error": {
                "code": "Not Found",
                "description": "Quote not found for symbol"
            }}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"quoteSummary": {"result": [{
            "price": {"shortName": "Datadog, Inc.", "currency": "USD", "marketCap": {"raw": 45000000000u64}},
            "financialData": {"revenueGrowth": {"raw": 0.25}},
            "incomeStatementHistory": {"incomeStatementHistory": [
                {"endDate": {"raw": 1703980800}, "totalRevenue": {"raw": 2128359000u64}}
            ]}
        }], "error": null}})),
    )
}

fn yahoo_router(stub: Arc<Stub>) -> Router {
    Router::new()
        .route("/cookie", get(session_cookie))
        .route("/v1/test/getcrumb", get(get_crumb))
        .route("/v10/finance/quoteSummary/:ticker", get(quote_summary))
        .with_state(stub)
}

#[tokio::test]
async fn yahoo_snapshot_after_transient_failures() {
    let stub = Arc::new(Stub {
        fail_first: 2,
        ..Default::default()
    });
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base))
        .unwrap()
        .with_retry(RetryPolicy::fast());

    let snapshot = client.fetch_snapshot("DDOG").await.unwrap();
    assert_eq!(snapshot.company_name, "Datadog, Inc.");
    assert_eq!(snapshot.market_cap.map(|d| d.to_string()).as_deref(), Some("45000000000"));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn yahoo_unknown_ticker_is_not_retried() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base))
        .unwrap()
        .with_retry(RetryPolicy::fast());

    let err = client.fetch_snapshot("NOPE").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)), "got {err:?}");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn yahoo_gives_up_on_persistent_outage() {
    let stub = Arc::new(Stub {
        fail_first: usize::MAX,
        ..Default::default()
    });
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base))
        .unwrap()
        .with_retry(RetryPolicy::fast());

    let err = client.fetch_snapshot("DDOG").await.unwrap_err();
    assert!(matches!(err, ToolError::Status { status: 503, .. }), "got {err:?}");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn yahoo_revenue_history_reads_statement_years() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub)).await;
    let client = YahooFinanceClient::new(&config(&base)).unwrap();

    let history = client.fetch_revenue_history("DDOG").await.unwrap();
    assert_eq!(history.company_name, "Datadog, Inc.");
    assert_eq!(history.points.len(), 1);
    assert_eq!(history.points[0].year, 2023);
}

#[tokio::test]
async fn yahoo_empty_ticker_never_hits_network() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base)).unwrap();

    let err = client.fetch_snapshot("   ").await.unwrap_err();
    assert_eq!(err.to_string(), "Empty ticker symbol");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    assert_eq!(stub.crumb_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn yahoo_crumb_is_fetched_once_and_reused() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base)).unwrap();

    client.fetch_snapshot("DDOG").await.unwrap();
    client.fetch_revenue_history("DDOG").await.unwrap();

    assert_eq!(stub.crumb_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn yahoo_refreshes_rejected_crumb() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub.clone())).await;
    let client = YahooFinanceClient::new(&config(&base))
        .unwrap()
        .with_retry(RetryPolicy::fast());

    client.fetch_snapshot("DDOG").await.unwrap();
    // Session expires on the Yahoo side
    *stub.valid_crumb.lock().unwrap() = None;

    let snapshot = client.fetch_snapshot("DDOG").await.unwrap();
    assert_eq!(snapshot.company_name, "Datadog, Inc.");
    assert_eq!(stub.crumb_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn yahoo_without_session_cookie_reports_status() {
    let stub = Arc::new(Stub::default());
    let base = serve(yahoo_router(stub.clone())).await;
    let mut tools = config(&base);
    tools.yahoo_cookie_url = format!("{base}/missing");
    let client = YahooFinanceClient::new(&tools)
        .unwrap()
        .with_retry(RetryPolicy::fast());

    let err = client.fetch_snapshot("DDOG").await.unwrap_err();
    assert!(matches!(err, ToolError::Status { status: 403, .. }), "got {err:?}");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

async fn tavily_search(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Json<Value> {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    *stub.last_body.lock().unwrap() = Some(body);
    Json(json!({
        "query": "ignored",
        "results": [
            {"title": "Datadog", "url": "https://example.com/a", "content": "Monitoring", "score": 0.9},
            {"title": "Dynatrace", "url": "https://example.com/b", "content": "APM"}
        ]
    }))
}

#[tokio::test]
async fn tavily_posts_query_and_maps_results() {
    let stub = Arc::new(Stub::default());
    let base = serve(
        Router::new()
            .route("/search", post(tavily_search))
            .with_state(stub.clone()),
    )
    .await;
    let client = TavilyClient::new(&config(&base), Some("tvly-test".to_string())).unwrap();

    let hits = client.search("DataDog company overview", 5).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[1].url, "https://example.com/b");

    let body = stub.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["api_key"], "tvly-test");
    assert_eq!(body["query"], "DataDog company overview");
    assert_eq!(body["search_depth"], "advanced");
    assert_eq!(body["max_results"], 5);
}

#[tokio::test]
async fn tavily_without_key_fails_before_request() {
    let stub = Arc::new(Stub::default());
    let base = serve(
        Router::new()
            .route("/search", post(tavily_search))
            .with_state(stub.clone()),
    )
    .await;
    let client = TavilyClient::new(&config(&base), Some("  ".to_string())).unwrap();

    let err = client.search("anything", 5).await.unwrap_err();
    assert!(matches!(err, ToolError::MissingCredential("TAVILY_API_KEY")));
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[ignore] // Requires network access
async fn live_yahoo_snapshot() {
    let client = YahooFinanceClient::new(&ToolsConfig::default()).unwrap();
    let snapshot = client.fetch_snapshot("DDOG").await.unwrap();
    assert!(!snapshot.company_name.is_empty());
}
