//! Literal-input end-to-end scenarios from spec.md §8, driven over the real
//! HTTP surface (`POST /chat`) against a server bound to an ephemeral port.

use engine::llm::MockProvider;
use engine::ExecutorConfig;
use serde_json::{json, Value};

use super::common::{spawn_test_server, spawn_test_server_with_config};

/// S1 — Finish immediately: Router decides FINISH on the very first turn,
/// no agent ever runs.
#[tokio::test]
async fn s1_finish_immediately_runs_no_agent() {
    let provider = MockProvider::new("gpt-4o").with_structured_reply(json!({"next": "FINISH", "reasoning": "nothing to do"}));
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/chat"))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["next"], "FINISH");
    assert_eq!(body["turnCount"], 1);
    assert_eq!(body["result"], "hi", "result echoes the user message when no agent ever replied");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1, "only the opening user message, no agent reply");
}

/// S2 — Single agent round-trip: Router sends the request to Builder, Builder
/// answers "ok" with no tool calls, then the Router finishes.
#[tokio::test]
async fn s2_single_agent_round_trip_reaches_finish() {
    let provider = MockProvider::new("gpt-4o")
        .with_structured_reply(json!({"next": "Builder", "reasoning": "go"}))
        .with_plain_reply(engine::Message::agent("Builder", "ok"))
        .with_structured_reply(json!({"next": "FINISH", "reasoning": "done"}));
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/chat"))
        .json(&json!({"message": "build it"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["next"], "FINISH");
    assert_eq!(body["result"], "ok");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.last().unwrap()["content"], "ok");
}

/// S4 — Router fallback: both LLM paths fail, so the deterministic L3
/// keyword table takes over and "vulnerability" routes to Security.
#[tokio::test]
async fn s4_router_falls_back_to_keyword_rule_on_provider_failure() {
    let provider = MockProvider::erroring(engine::llm::GatewayError::ProviderError("down".into()));
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/chat"))
        .json(&json!({"message": "please review this for security vulnerabilities"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // The test registry only has a `Builder` agent, so the decided `Security`
    // name is unknown to it; the Router treats that as FINISH (spec.md §4.4
    // tie-break), but the point under test is that L3 ran at all rather than
    // the request surfacing a `ProviderFailure`.
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["next"], "FINISH");
}

/// S5 — Turn ceiling: with `max_turns=3` and a Router mock that always picks
/// Builder, the run must still terminate at `turnCount=3`, `next=FINISH`.
#[tokio::test]
async fn s5_turn_ceiling_forces_finish() {
    let provider = MockProvider::new("gpt-4o").with_structured_reply(json!({"next": "Builder", "reasoning": "go"}));
    let mut config = ExecutorConfig::default();
    config.max_turns = 3;
    let (base_url, _handle) = spawn_test_server_with_config(provider, config).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/chat"))
        .json(&json!({"message": "keep building"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["next"], "FINISH");
    assert_eq!(body["turnCount"], 3);
}

/// `GET /agents` lists the registered agent names (spec.md §6).
#[tokio::test]
async fn get_agents_lists_registered_names() {
    let provider = MockProvider::new("gpt-4o");
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{base_url}/agents")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let agents = body.as_array().unwrap();
    assert!(agents.iter().any(|a| a["name"] == "Builder"));
}

/// `GET /thread/{id}` returns 404 for a thread id with no checkpoint.
#[tokio::test]
async fn get_thread_unknown_id_is_not_found() {
    let provider = MockProvider::new("gpt-4o");
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{base_url}/thread/does-not-exist")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

/// `GET /health` reports ok.
#[tokio::test]
async fn health_check_reports_ok() {
    let provider = MockProvider::new("gpt-4o");
    let (base_url, _handle) = spawn_test_server(provider).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{base_url}/health")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}
