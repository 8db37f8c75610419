//! Policies for overrides, evictions and disruption budgets.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};
use kube::ResourceExt;

use super::stored::{field_decision, invalid_stored_object, stored_rule};
use super::{DecodeError, ValidationDecision, decode_object, decode_old_object, operation_name};
use crate::crd::{
    ClusterResourceOverride, ClusterResourcePlacementDisruptionBudget,
    ClusterResourcePlacementEviction,
};
use crate::kinds::ResourceKind;

fn skip(request: &AdmissionRequest<DynamicObject>) -> Option<ValidationDecision> {
    (!matches!(request.operation, Operation::Create | Operation::Update)).then(|| {
        ValidationDecision::allow(format!(
            "{} operation is not validated",
            operation_name(&request.operation)
        ))
    })
}

pub fn review_override(
    request: &AdmissionRequest<DynamicObject>,
) -> Result<ValidationDecision, DecodeError> {
    if let Some(skipped) = skip(request) {
        return Ok(skipped);
    }
    let kind = ResourceKind::ClusterResourceOverride;
    let cro: ClusterResourceOverride = decode_object(kind, request)?;
    if let Some(decision) = stored_rule(kind, request, &cro)? {
        return Ok(decision);
    }
    Ok(field_decision(kind, &cro))
}

/// Evictions are one-shot requests: the spec cannot change after creation.
pub fn review_eviction(
    request: &AdmissionRequest<DynamicObject>,
) -> Result<ValidationDecision, DecodeError> {
    if let Some(skipped) = skip(request) {
        return Ok(skipped);
    }
    let kind = ResourceKind::ClusterResourcePlacementEviction;
    let eviction: ClusterResourcePlacementEviction = decode_object(kind, request)?;
    if request.operation == Operation::Update {
        let old: ClusterResourcePlacementEviction = decode_old_object(kind, request)?;
        if let Some(decision) = invalid_stored_object(kind, &eviction, &old) {
            return Ok(decision);
        }
        if old.spec != eviction.spec {
            return Ok(ValidationDecision::deny(format!(
                "{} {} spec is immutable",
                kind,
                eviction.name_any()
            )));
        }
    }
    Ok(field_decision(kind, &eviction))
}

pub fn review_disruption_budget(
    request: &AdmissionRequest<DynamicObject>,
) -> Result<ValidationDecision, DecodeError> {
    if let Some(skipped) = skip(request) {
        return Ok(skipped);
    }
    let kind = ResourceKind::ClusterResourcePlacementDisruptionBudget;
    let budget: ClusterResourcePlacementDisruptionBudget = decode_object(kind, request)?;
    if let Some(decision) = stored_rule(kind, request, &budget)? {
        return Ok(decision);
    }
    Ok(field_decision(kind, &budget))
}
