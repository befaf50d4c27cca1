// Shared mock generation service for integration tests

#![allow(dead_code)]

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Last request body received by the mock service
pub type Captured = Arc<Mutex<Option<Value>>>;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A local address nothing is listening on
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Two rules for REQ-1, one of them covered by a single test case
pub fn service_response() -> Value {
    json!({
        "interpretation": {
            "requirement_id": "REQ-1",
            "interpretation_status": "OK",
            "interpreted_requirement": "Alarm above 100 km/h",
            "rules": [
                {"rule_id": "R1", "condition": "speed > 100", "expected_behavior": "alarm on"},
                {"rule_id": "R2", "condition": "speed <= 100", "expected_behavior": "alarm off"}
            ],
            "ambiguities": []
        },
        "test_cases": [
            {
                "tc_id": "TC001",
                "rule_id": "R1",
                "test_type": "Boundary Value Analysis",
                "scenario": "Just above the limit",
                "inputs": {"speed": 101},
                "expected_output": {"alarm": true},
                "priority": "HIGH",
                "validity": "VALID",
                "traceability": {"requirement": "REQ-1", "rule": "R1"}
            }
        ],
        "generation_timestamp": "2026-01-01T00:00:00"
    })
}

/// Generation and health endpoints answering with `service_response`
pub fn mock_service(captured: Captured) -> Router {
    Router::new()
        .route(
            "/generate-test-cases",
            post(|State(captured): State<Captured>, Json(body): Json<Value>| async move {
                *captured.lock().unwrap() = Some(body);
                Json(service_response())
            }),
        )
        .route("/health", get(|| async { Json(json!({"status": "healthy"})) }))
        .with_state(captured)
}
