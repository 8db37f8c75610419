//! Admission webhooks for fleet resources.
//!
//! - [`policies`]: the validation engine and per-kind policies
//! - [`defaulting`]: placement defaulting (mutating)
//! - [`routes`]: path to handler bindings derived from the descriptor sets
//! - [`server`]: the axum router and TLS listener

pub mod audit;
pub mod defaulting;
pub mod policies;
mod routes;
mod server;

pub use audit::{AuditEntry, AuditLog, TracingAuditLog};
pub use policies::{DecodeError, ValidationDecision, ValidationEngine};
pub use routes::{Handler, RoutingTable};
pub use server::{
    MALFORMED_REQUEST, WebhookError, WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
