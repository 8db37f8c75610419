//! Router harness: posts reviews and decodes the responses.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use fleet_webhook::config::Config;
use fleet_webhook::health::HealthState;
use fleet_webhook::webhooks::{
    AuditEntry, AuditLog, RoutingTable, ValidationEngine, WebhookState, create_webhook_router,
};

/// Keeps every audit entry for inspection.
#[derive(Default)]
pub struct MemoryAuditLog(pub Mutex<Vec<AuditEntry>>);

impl AuditLog for MemoryAuditLog {
    fn record(&self, entry: &AuditEntry) {
        self.0.lock().unwrap().push(entry.clone());
    }
}

pub struct Harness {
    pub router: Router,
    pub audit: Arc<MemoryAuditLog>,
    pub health: Arc<HealthState>,
}

impl Harness {
    pub fn new(config: &Config) -> Self {
        let audit = Arc::new(MemoryAuditLog::default());
        let health = Arc::new(HealthState::new());
        let state = Arc::new(WebhookState::new(
            ValidationEngine::new(config, audit.clone()),
            health.clone(),
        ));
        let router = create_webhook_router(state, RoutingTable::from_config(config));
        Self {
            router,
            audit,
            health,
        }
    }

    /// POST `review` to `path`; returns the status and the `response` field.
    pub async fn post(&self, path: &str, review: Value) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(review.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body["response"].clone())
    }
}

/// `status.message` of a response, empty when allowed.
pub fn message(response: &Value) -> &str {
    response["status"]["message"].as_str().unwrap_or_default()
}

pub fn allowed(response: &Value) -> bool {
    response["allowed"].as_bool().unwrap()
}
