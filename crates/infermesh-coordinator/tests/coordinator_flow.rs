//! End-to-end coordinator scenarios over the assembled components and the
//! HTTP routers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use infermesh_auth::TokenSigner;
use infermesh_core::{Clock, IdGenerator, ManualClock, SequentialIdGenerator};
use infermesh_coordinator::{client_router, control_router, CoordinatorConfig, CoordinatorState};
use infermesh_registry::{
    AgentRegistration, AgentStatus, Heartbeat, InMemoryRegistry, Registry,
};
use infermesh_scheduler::McdaScheduler;

type TestState = CoordinatorState<InMemoryRegistry, McdaScheduler<InMemoryRegistry>>;

struct Harness {
    clock: Arc<ManualClock>,
    registry: Arc<InMemoryRegistry>,
    scheduler: Arc<McdaScheduler<InMemoryRegistry>>,
    signer: Arc<TokenSigner>,
    state: TestState,
}

fn harness() -> Harness {
    let config = CoordinatorConfig::default();
    let clock = Arc::new(ManualClock::starting_now());
    let registry = Arc::new(InMemoryRegistry::new(
        config.registry_config(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let scheduler = Arc::new(McdaScheduler::new(Arc::clone(&registry)));
    let signer = Arc::new(
        TokenSigner::new(
            config.token_config(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(SequentialIdGenerator::new("tok")),
        )
        .expect("key generation"),
    );
    let state = CoordinatorState::new(
        Arc::clone(&registry),
        Arc::clone(&scheduler),
        Arc::clone(&signer),
        Arc::new(SequentialIdGenerator::new("job")) as Arc<dyn IdGenerator>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        config,
    );
    Harness {
        clock,
        registry,
        scheduler,
        signer,
        state,
    }
}

fn registration(id: &str, total_vram: i64, max_jobs: i32, models: &[&str]) -> AgentRegistration {
    AgentRegistration {
        agent_id: id.to_string(),
        endpoint: format!("{id}.local:9000"),
        total_vram_mb: total_vram,
        total_ram_mb: 16_384,
        max_jobs,
        supported_models: models.iter().map(ToString::to_string).collect(),
        capabilities: HashMap::new(),
    }
}

fn heartbeat(id: &str, free_vram: i64, running: i32, cpu: f64, rtt: f64) -> Heartbeat {
    Heartbeat {
        agent_id: id.to_string(),
        free_vram_mb: free_vram,
        free_ram_mb: 12_000,
        running_jobs: running,
        queued_jobs: 0,
        cpu_percent: cpu,
        rtt_ms: rtt,
        timestamp: 0,
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_agent_happy_path() {
    let h = harness();
    let router = control_router(h.state.clone());

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/agents",
            json!({
                "agent_id": "A1",
                "endpoint": "a1.local:9000",
                "total_vram_mb": 8192,
                "total_ram_mb": 16384,
                "max_jobs": 4,
                "supported_models": ["llama3:7b"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["heartbeat_interval_seconds"], 15);

    h.registry
        .update_health(&heartbeat("A1", 7000, 1, 20.0, 5.0))
        .await
        .unwrap();

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({
                "client_id": "c1",
                "model": "llama3:7b",
                "prompt": "hello"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "A1");
    assert_eq!(body["agent_endpoint"], "a1.local:9000");

    let now = h.clock.now().timestamp();
    let expires_at = body["expires_at"].as_i64().unwrap();
    let ttl = 120;
    assert!(expires_at - now >= ttl - 2 && expires_at - now <= ttl);

    let claims = h
        .signer
        .verify(body["session_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.agent_id, "A1");
    assert_eq!(claims.client_id, "c1");
    assert_eq!(claims.model, "llama3:7b");
}

#[tokio::test]
async fn mcda_prefers_lower_load() {
    let h = harness();
    let router = control_router(h.state.clone());

    for id in ["A1", "A2"] {
        h.registry
            .register(registration(id, 8192, 4, &[]))
            .await
            .unwrap();
    }
    h.registry
        .update_health(&heartbeat("A1", 7000, 3, 20.0, 5.0))
        .await
        .unwrap();
    h.registry
        .update_health(&heartbeat("A2", 7000, 0, 20.0, 5.0))
        .await
        .unwrap();

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({"client_id": "c1", "model": "llama3:7b", "prompt": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "A2");
}

#[tokio::test]
async fn degraded_agent_loses_to_healthy_one() {
    let h = harness();
    let router = control_router(h.state.clone());

    for id in ["A1", "A2"] {
        h.registry
            .register(registration(id, 8192, 4, &[]))
            .await
            .unwrap();
    }
    // A2 would outscore A1, but a cpu spike pushes it into degraded and
    // halves its score.
    h.registry
        .update_health(&heartbeat("A1", 6000, 1, 20.0, 5.0))
        .await
        .unwrap();
    h.registry
        .update_health(&heartbeat("A2", 8000, 0, 95.0, 5.0))
        .await
        .unwrap();
    assert_eq!(
        h.registry.get_agent("A2").await.unwrap().status,
        AgentStatus::Degraded
    );

    let (_, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({"client_id": "c1", "model": "llama3:7b", "prompt": "hi"}),
        ),
    )
    .await;
    assert_eq!(body["agent_id"], "A1");
}

#[tokio::test]
async fn circuit_opens_after_threshold_failures() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();

    for _ in 0..3 {
        h.registry.record_failure("A1").await.unwrap();
    }
    assert_eq!(
        h.registry.get_circuit_state("A1").await.unwrap(),
        AgentStatus::Offline
    );

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({"client_id": "c1", "model": "llama3:7b", "prompt": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");
    assert_eq!(body["code"], 503);
}

#[tokio::test]
async fn half_open_agent_recovers_after_successes() {
    let h = harness();

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();
    for _ in 0..3 {
        h.registry.record_failure("A1").await.unwrap();
    }

    // Past next_retry_time, keeping the heartbeat fresh.
    h.clock.advance(chrono::Duration::seconds(30));
    h.registry
        .update_health(&heartbeat("A1", 7000, 0, 20.0, 5.0))
        .await
        .unwrap();
    h.registry.run_cleanup().await;
    assert_eq!(
        h.registry.get_circuit_state("A1").await.unwrap(),
        AgentStatus::HalfOpen
    );

    h.registry.record_success("A1").await.unwrap();
    h.registry.record_success("A1").await.unwrap();

    let agent = h.registry.get_agent("A1").await.unwrap();
    assert_eq!(agent.status, AgentStatus::Healthy);
    assert_eq!(agent.failure_count, 0);
}

#[tokio::test]
async fn dead_agent_is_removed_and_requests_fail() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();

    // heartbeat_timeout + cleanup_interval with no heartbeats.
    h.clock.advance(chrono::Duration::seconds(91));
    h.registry.run_cleanup().await;

    assert!(h.registry.list_all_agents().await.is_empty());

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({"client_id": "c1", "model": "anything", "prompt": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// Control surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_validation() {
    let h = harness();
    let router = control_router(h.state.clone());

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/agents",
            json!({"agent_id": "", "endpoint": "x:1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
    assert_eq!(body["code"], 400);

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/agents",
            json!({"agent_id": "A1", "endpoint": ""}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inference_validation() {
    let h = harness();
    let router = control_router(h.state.clone());

    for missing in [
        json!({"model": "m", "prompt": "p"}),
        json!({"client_id": "c", "prompt": "p"}),
        json!({"client_id": "c", "model": "m"}),
    ] {
        let (status, body) =
            send(&router, json_request(Method::POST, "/v1/inference", missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_argument");
    }
}

#[tokio::test]
async fn deregister_agent_flow() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/v1/agents/A1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/v1/agents/A1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn status_reports_counts_and_snapshot() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();
    h.registry
        .update_health(&heartbeat("A1", 7000, 2, 20.0, 5.0))
        .await
        .unwrap();

    let (status, body) = send(&router, get_request("/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_agents"], 1);
    assert_eq!(body["healthy_agents"], 1);
    assert!(body.get("agents").is_none());

    let (_, body) = send(&router, get_request("/v1/status?include_agents=true")).await;
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["agent_id"], "A1");
    assert_eq!(agents[0]["status"], "healthy");
    assert_eq!(agents[0]["free_vram_mb"], 7000);
    assert_eq!(agents[0]["running_jobs"], 2);
}

#[tokio::test]
async fn status_counts_active_tokens() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();
    h.registry
        .update_health(&heartbeat("A1", 7000, 0, 20.0, 5.0))
        .await
        .unwrap();

    let (_, body) = send(&router, get_request("/v1/status")).await;
    assert_eq!(body["active_tokens"], 0);

    let (_, _) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/inference",
            json!({"client_id": "c1", "model": "m", "prompt": "p"}),
        ),
    )
    .await;

    let (_, body) = send(&router, get_request("/v1/status")).await;
    assert_eq!(body["active_tokens"], 1);
}

#[tokio::test]
async fn public_key_endpoint_serves_pem() {
    let h = harness();
    let router = control_router(h.state.clone());

    let (status, body) = send(&router, get_request("/v1/public-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["algorithm"], "RS256");
    assert_eq!(body["issuer"], "infermesh-coordinator");
    assert!(body["public_key_pem"]
        .as_str()
        .unwrap()
        .starts_with("-----BEGIN PUBLIC KEY-----"));
    assert!(!body["key_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn performance_reports_feed_the_scheduler() {
    let h = harness();
    let router = control_router(h.state.clone());

    h.registry
        .register(registration("A1", 8192, 4, &[]))
        .await
        .unwrap();

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/agents/A1/performance",
            json!({"tokens_per_sec": 42.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(h.scheduler.performance("A1").await, Some(42.0));

    let (status, _) = send(
        &router,
        json_request(
            Method::POST,
            "/v1/agents/ghost/performance",
            json!({"tokens_per_sec": 42.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn liveness_probe() {
    let h = harness();
    let router = control_router(h.state.clone());

    let (status, body) = send(&router, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

// ---------------------------------------------------------------------------
// Client surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_surface_mirrors_control_plane() {
    let h = harness();
    let router = client_router(h.state.clone());

    let (status, body) = send(&router, get_request("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    h.registry
        .register(registration("A1", 8192, 4, &["llama3:7b"]))
        .await
        .unwrap();
    h.registry
        .update_health(&heartbeat("A1", 7000, 1, 20.0, 5.0))
        .await
        .unwrap();

    let (status, body) = send(&router, get_request("/api/v1/status?include_agents=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_agents"], 1);
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents[0]["id"], "A1");
    assert_eq!(agents[0]["endpoint"], "a1.local:9000");
    assert_eq!(agents[0]["max_jobs"], 4);

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/v1/inference/request",
            json!({"client_id": "c1", "model": "llama3:7b", "prompt": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "A1");
    assert!(h
        .signer
        .verify(body["session_token"].as_str().unwrap())
        .is_ok());
}

#[tokio::test]
async fn client_surface_error_shape() {
    let h = harness();
    let router = client_router(h.state.clone());

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/v1/inference/request",
            json!({"client_id": "", "model": "m", "prompt": "p"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
    assert_eq!(body["code"], 400);
    assert!(body["message"].as_str().unwrap().contains("client_id"));

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/v1/inference/request",
            json!({"client_id": "c", "model": "m", "prompt": "p"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);
}
