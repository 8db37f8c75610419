//! Admission policies.
//!
//! [`ValidationEngine`] dispatches a request to the policy for its kind and
//! records every decision it returns:
//! - placements: the update pipeline in [`placement`] (deletion exception,
//!   immutability, toleration monotonicity) followed by static validation
//! - workloads: namespace checks
//! - member clusters and placement companions: the stored-object rule in
//!   [`stored`] followed by static validation
//! - guard rail: privilege checks for fleet-owned objects
//!
//! A payload that does not decode is a [`DecodeError`], never a policy
//! decision.

pub mod guard_rail;
pub mod immutability;
pub mod member_cluster;
pub mod placement;
pub mod placement_companions;
pub mod stored;
pub mod tolerations;
pub mod workload;

use std::fmt;
use std::sync::Arc;

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Config;
use crate::kinds::ResourceKind;
use crate::webhooks::audit::{AuditEntry, AuditLog};

pub use guard_rail::GuardRail;
pub use placement::{Placement, PlacementObject};

/// Outcome of a policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationDecision {
    pub allowed: bool,
    pub reason: String,
}

impl ValidationDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.allowed { "allowed" } else { "denied" };
        write!(f, "{}: {}", outcome, self.reason)
    }
}

/// Malformed admission payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{kind} {operation} request has no object")]
    MissingObject {
        kind: &'static str,
        operation: &'static str,
    },

    #[error("{kind} update request has no old object")]
    MissingOldObject { kind: &'static str },

    #[error("failed to decode {kind}: {source}")]
    Object {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode old {kind}: {source}")]
    OldObject {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire name of an admission operation.
pub fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

/// Convert a dynamic object into a typed one.
pub fn decode_as<K: DeserializeOwned>(
    object: &DynamicObject,
) -> Result<K, serde_json::Error> {
    serde_json::to_value(object).and_then(serde_json::from_value)
}

/// Decode `request.object` as `K`.
pub fn decode_object<K: DeserializeOwned>(
    kind: ResourceKind,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<K, DecodeError> {
    let object = request.object.as_ref().ok_or(DecodeError::MissingObject {
        kind: kind.kind(),
        operation: operation_name(&request.operation),
    })?;
    decode_as(object).map_err(|source| DecodeError::Object {
        kind: kind.kind(),
        source,
    })
}

/// Decode `request.old_object` as `K`.
pub fn decode_old_object<K: DeserializeOwned>(
    kind: ResourceKind,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<K, DecodeError> {
    let object = request
        .old_object
        .as_ref()
        .ok_or(DecodeError::MissingOldObject { kind: kind.kind() })?;
    decode_as(object).map_err(|source| DecodeError::OldObject {
        kind: kind.kind(),
        source,
    })
}

/// Per-kind decision automaton shared by all request handlers.
pub struct ValidationEngine {
    guard_rail: GuardRail,
    audit: Arc<dyn AuditLog>,
}

impl ValidationEngine {
    pub fn new(config: &Config, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            guard_rail: GuardRail::new(config),
            audit,
        }
    }

    /// Decide a request routed to the validating handler for `kind`.
    pub fn review(
        &self,
        kind: ResourceKind,
        request: &AdmissionRequest<DynamicObject>,
    ) -> Result<ValidationDecision, DecodeError> {
        let decision = match kind {
            ResourceKind::Pod | ResourceKind::ReplicaSet => workload::review(kind, request),
            ResourceKind::ClusterResourcePlacement | ResourceKind::ResourcePlacement => {
                placement::review(kind, request)?
            }
            ResourceKind::MemberCluster => member_cluster::review(request)?,
            ResourceKind::ClusterResourceOverride => {
                placement_companions::review_override(request)?
            }
            ResourceKind::ClusterResourcePlacementEviction => {
                placement_companions::review_eviction(request)?
            }
            ResourceKind::ClusterResourcePlacementDisruptionBudget => {
                placement_companions::review_disruption_budget(request)?
            }
        };
        self.record(kind.kind(), request, &decision);
        Ok(decision)
    }

    /// Decide a request routed to the guard rail handler.
    pub fn review_guard_rail(
        &self,
        request: &AdmissionRequest<DynamicObject>,
    ) -> Result<ValidationDecision, DecodeError> {
        let decision = self.guard_rail.review(request)?;
        self.record(&request.kind.kind, request, &decision);
        Ok(decision)
    }

    fn record(
        &self,
        kind: &str,
        request: &AdmissionRequest<DynamicObject>,
        decision: &ValidationDecision,
    ) {
        self.audit.record(&AuditEntry {
            uid: request.uid.clone(),
            operation: operation_name(&request.operation).to_string(),
            kind: kind.to_string(),
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            user: request.user_info.username.clone().unwrap_or_default(),
            groups: request.user_info.groups.clone().unwrap_or_default(),
            allowed: decision.allowed,
            reason: decision.reason.clone(),
        });
    }
}
