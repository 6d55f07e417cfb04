//! Web API against an in-process server with a scripted pipeline.

use std::sync::Arc;
use std::time::Duration;

use rivalry::web::{self, AppState};
use rivalry_agents::test_support::{CannedSubAgent, ScriptedLlm};
use rivalry_agents::{Orchestrator, QueryParser, ReportGenerator};
use rivalry_models::{PipelineConfig, ServerConfig, SubAgentKind};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const PARSE_REPLY: &str = r#"{"companies": ["DataDog", "Dynatrace"], "tickers": ["DDOG", "DT"]}"#;

fn orchestrator(competitor_delay: Duration) -> Arc<Orchestrator> {
    let llm = Arc::new(
        ScriptedLlm::new()
            .then_text(PARSE_REPLY)
            .then_text("# Verdict\n\n## Executive Summary\n\nDataDog grows faster."),
    );
    let pipeline = PipelineConfig::default();
    Arc::new(Orchestrator::new(
        QueryParser::new(llm.clone(), pipeline.clone()),
        Arc::new(CannedSubAgent::new(SubAgentKind::Financial, "DDOG growth 25%")),
        Arc::new(
            CannedSubAgent::new(SubAgentKind::Competitor, "DT strong in enterprise")
                .with_delay(competitor_delay),
        ),
        ReportGenerator::new(llm),
        &pipeline,
    ))
}

async fn start(orchestrator: Option<Arc<Orchestrator>>, problems: Vec<String>) -> String {
    let server = ServerConfig {
        poll_interval_ms: 10,
        ..Default::default()
    };
    let state = Arc::new(AppState::new(orchestrator, problems, &server));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(web::serve(listener, state, CancellationToken::new()));
    format!("http://{addr}")
}

async fn new_session(client: &reqwest::Client, base: &str) -> String {
    let response = client
        .post(format!("{base}/api/sessions"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["session_id"].as_str().unwrap().to_string()
}

async fn wait_for_job(client: &reqwest::Client, base: &str, job_id: &str) -> Value {
    for _ in 0..200 {
        let job: Value = client
            .get(format!("{base}/api/jobs/{job_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if job["status"] != "running" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn research_round_trip() {
    let base = start(Some(orchestrator(Duration::ZERO)), vec![]).await;
    let client = reqwest::Client::new();
    let session = new_session(&client, &base).await;

    let response = client
        .post(format!("{base}/api/sessions/{session}/research"))
        .json(&json!({"query": "Compare DataDog and Dynatrace"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let job_id = response.json::<Value>().await.unwrap()["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let job = wait_for_job(&client, &base, &job_id).await;
    assert_eq!(job["status"], "done");
    assert_eq!(job["result"]["tickers"], json!(["DDOG", "DT"]));
    assert!(job["decision_tree"].as_str().unwrap().contains("Number Cruncher"));
    assert!(job["decision_tree_dot"]
        .as_str()
        .unwrap()
        .contains("financial -> fin_tc_0"));
    let stages: Vec<&str> = job["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["stage"].as_str().unwrap())
        .collect();
    assert!(stages.contains(&"parse") && stages.contains(&"synthesize"));

    let history: Value = client
        .get(format!("{base}/api/sessions/{session}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert!(messages[1]["content"].as_str().unwrap().contains("DataDog grows faster."));
    assert!(messages[1]["decision_tree"].as_str().unwrap().contains("Street Scout"));
    assert!(history["active_job"].is_null());
}

#[tokio::test]
async fn second_request_while_running_conflicts() {
    let base = start(Some(orchestrator(Duration::from_millis(500))), vec![]).await;
    let client = reqwest::Client::new();
    let session = new_session(&client, &base).await;
    let url = format!("{base}/api/sessions/{session}/research");

    let first = client.post(&url).json(&json!({"query": "q1"})).send().await.unwrap();
    assert_eq!(first.status(), 202);
    let second = client.post(&url).json(&json!({"query": "q2"})).send().await.unwrap();
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert!(body["job_id"].is_string());
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let base = start(Some(orchestrator(Duration::ZERO)), vec![]).await;
    let client = reqwest::Client::new();
    let session = new_session(&client, &base).await;

    let response = client
        .post(format!("{base}/api/sessions/{session}/research"))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn missing_credentials_refuse_research() {
    let problems = vec!["ANTHROPIC_API_KEY not set".to_string()];
    let base = start(None, problems).await;
    let client = reqwest::Client::new();

    let config: Value = client
        .get(format!("{base}/api/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["ready"], false);
    assert_eq!(config["problems"], json!(["ANTHROPIC_API_KEY not set"]));
    assert_eq!(config["examples"].as_array().unwrap().len(), 2);
    assert_eq!(config["poll_interval_ms"], 10);

    let session = new_session(&client, &base).await;
    let response = client
        .post(format!("{base}/api/sessions/{session}/research"))
        .json(&json!({"query": "Compare"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let base = start(None, vec![]).await;
    let client = reqwest::Client::new();
    let missing = uuid_like();

    let session = client
        .get(format!("{base}/api/sessions/{missing}"))
        .send()
        .await
        .unwrap();
    assert_eq!(session.status(), 404);

    let job = client.get(format!("{base}/api/jobs/{missing}")).send().await.unwrap();
    assert_eq!(job.status(), 404);
}

#[tokio::test]
async fn index_and_health() {
    let base = start(None, vec![]).await;
    let client = reqwest::Client::new();

    let page = client.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(page.contains("Research Agent Team"));
    assert!(page.contains("Behind the Scenes"));
    // Rendered markdown escapes quotes, so links cannot break out of href
    assert!(page.contains(r#".replace(/"/g, "&quot;")"#));
    assert!(page.contains(r#".replace(/'/g, "&#39;")"#));

    let health: Value = client
        .get(format!("{base}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["ready"], false);
}

fn uuid_like() -> &'static str {
    "00000000-0000-4000-8000-000000000000"
}
