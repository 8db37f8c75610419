//! Admission webhook server.
//!
//! Every path in the [`RoutingTable`] is bound to one handler. A handler
//! decodes the review, asks the [`ValidationEngine`] (or the defaulter) for
//! an answer and returns it with the request uid echoed back.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::certs::ServerIdentity;
use crate::health::{HealthState, Outcome};
use crate::webhooks::defaulting;
use crate::webhooks::policies::{DecodeError, ValidationDecision, ValidationEngine, operation_name};
use crate::webhooks::routes::{Handler, RoutingTable};

/// Message returned for reviews that cannot be decoded. Details are logged.
pub const MALFORMED_REQUEST: &str = "malformed admission request";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub engine: ValidationEngine,
    pub health: Arc<HealthState>,
}

impl WebhookState {
    pub fn new(engine: ValidationEngine, health: Arc<HealthState>) -> Self {
        Self { engine, health }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[source] std::io::Error),

    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),
}

type ReviewResponse = (StatusCode, Json<AdmissionReview<DynamicObject>>);

/// Create the webhook router with one route per table entry.
pub fn create_webhook_router(state: Arc<WebhookState>, routes: RoutingTable) -> Router {
    let mut router = Router::new();
    for (path, handler) in routes.iter() {
        router = router.route(
            path,
            post(
                move |State(state): State<Arc<WebhookState>>,
                      Json(review): Json<AdmissionReview<DynamicObject>>| async move {
                    handle_review(&state, handler, review)
                },
            ),
        );
    }
    router.with_state(state)
}

fn handle_review(
    state: &WebhookState,
    handler: Handler,
    review: AdmissionReview<DynamicObject>,
) -> ReviewResponse {
    let metrics = &state.health.metrics;
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "Failed to extract admission request");
            metrics.record_decode_error(handler_kind(handler));
            return (
                StatusCode::BAD_REQUEST,
                Json(AdmissionResponse::invalid(MALFORMED_REQUEST).into_review()),
            );
        }
    };

    let started = Instant::now();
    let kind = match handler {
        Handler::GuardRail => request.kind.kind.clone(),
        _ => handler_kind(handler).to_string(),
    };
    let operation = operation_name(&request.operation);
    debug!(
        uid = %request.uid,
        kind = %kind,
        operation,
        namespace = ?request.namespace,
        name = %request.name,
        "Processing admission request"
    );

    let result = match handler {
        Handler::Validate(resource) => state
            .engine
            .review(resource, &request)
            .map(|decision| decision_response(&request, decision)),
        Handler::GuardRail => state
            .engine
            .review_guard_rail(&request)
            .map(|decision| decision_response(&request, decision)),
        Handler::Mutate(resource) => defaulting::mutate(resource, &request),
    };

    match result {
        Ok(response) => {
            let outcome = if response.allowed {
                Outcome::Allowed
            } else {
                Outcome::Denied
            };
            metrics.record_admission(
                &kind,
                operation,
                outcome,
                started.elapsed().as_secs_f64(),
            );
            (StatusCode::OK, Json(response.into_review()))
        }
        Err(e) => {
            warn!(uid = %request.uid, kind = %kind, error = %e, "Malformed admission request");
            metrics.record_decode_error(&kind);
            metrics.record_admission(
                &kind,
                operation,
                Outcome::Invalid,
                started.elapsed().as_secs_f64(),
            );
            (StatusCode::BAD_REQUEST, Json(invalid_response(&request, &e)))
        }
    }
}

fn handler_kind(handler: Handler) -> &'static str {
    match handler {
        Handler::Validate(kind) | Handler::Mutate(kind) => kind.kind(),
        Handler::GuardRail => "GuardRail",
    }
}

fn decision_response(
    request: &AdmissionRequest<DynamicObject>,
    decision: ValidationDecision,
) -> AdmissionResponse {
    if decision.allowed {
        info!(uid = %request.uid, reason = %decision.reason, "Admission request allowed");
        AdmissionResponse::from(request)
    } else {
        info!(uid = %request.uid, reason = %decision.reason, "Admission request denied");
        AdmissionResponse::from(request).deny(decision.reason)
    }
}

fn invalid_response(
    request: &AdmissionRequest<DynamicObject>,
    error: &DecodeError,
) -> AdmissionReview<DynamicObject> {
    debug!(uid = %request.uid, error = %error, "Rejecting undecodable object");
    let mut response = AdmissionResponse::invalid(MALFORMED_REQUEST);
    response.uid = request.uid.clone();
    response.into_review()
}

/// Run the webhook server with TLS on `0.0.0.0:{port}`.
///
/// Generated identities are handed to rustls from memory, mounted ones are
/// read from disk. The health state is marked ready once the listener is
/// configured.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    routes: RoutingTable,
    identity: &ServerIdentity,
    port: u16,
) -> Result<(), WebhookError> {
    let tls = match identity {
        ServerIdentity::Generated { cert_pem, key_pem } => {
            RustlsConfig::from_pem(cert_pem.clone(), key_pem.clone()).await
        }
        ServerIdentity::Mounted {
            cert_path,
            key_path,
        } => RustlsConfig::from_pem_file(cert_path, key_path).await,
    }
    .map_err(WebhookError::TlsConfig)?;

    let health = state.health.clone();
    let app = create_webhook_router(state, routes);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");
    health.set_ready(true).await;

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(WebhookError::Server)?;

    Ok(())
}
