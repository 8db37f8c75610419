//! Workload policy for the hub cluster.
//!
//! The hub only stores resources to be placed; pods and replicasets may run
//! in the reserved namespaces alone (unless workloads are enabled, in which
//! case these handlers are not registered at all).

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};

use super::ValidationDecision;
use crate::kinds::ResourceKind;

const RESERVED_NAMESPACE_PREFIXES: &[&str] = &["fleet-", "kube-"];

/// `fleet-*` and `kube-*` namespaces belong to the control plane.
pub fn is_reserved_namespace(namespace: &str) -> bool {
    RESERVED_NAMESPACE_PREFIXES
        .iter()
        .any(|prefix| namespace.starts_with(prefix))
}

/// Allow workload creation only in reserved namespaces.
pub fn review(kind: ResourceKind, request: &AdmissionRequest<DynamicObject>) -> ValidationDecision {
    let namespace = request.namespace.as_deref().unwrap_or_default();
    if request.operation != Operation::Create {
        return ValidationDecision::allow(format!("{} {} is not validated", kind, namespace));
    }
    if is_reserved_namespace(namespace) {
        ValidationDecision::allow(format!(
            "{} {}/{} is in a reserved namespace",
            kind, namespace, request.name
        ))
    } else {
        ValidationDecision::deny(format!(
            "{} {}/{} is not allowed in a non-reserved namespace",
            kind, namespace, request.name
        ))
    }
}
