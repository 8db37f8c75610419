//! Placement defaulting.
//!
//! Fills the optional fields of a ClusterResourcePlacement and answers with
//! the JSON patch from the submitted object to the defaulted one.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use tracing::error;

use crate::crd::{
    ApplyStrategy, ClusterResourcePlacement, PlacementPolicy, PlacementSpec, PlacementType,
    RollingUpdateConfig, RolloutStrategy, RolloutStrategyType,
};
use crate::kinds::ResourceKind;
use crate::webhooks::policies::{DecodeError, decode_object};

pub const DEFAULT_MAX_UNAVAILABLE: &str = "25%";
pub const DEFAULT_MAX_SURGE: &str = "25%";
pub const DEFAULT_UNAVAILABLE_PERIOD_SECONDS: i32 = 60;
pub const DEFAULT_APPLY_TYPE: &str = "ClientSideApply";
pub const DEFAULT_COMPARISON_OPTION: &str = "PartialComparison";
pub const DEFAULT_WHEN_TO_APPLY: &str = "Always";
pub const DEFAULT_WHEN_TO_TAKE_OVER: &str = "Always";
pub const DEFAULT_REVISION_HISTORY_LIMIT: i32 = 10;

/// Fill every unset optional field. Set fields are left alone.
pub fn apply_defaults(spec: &mut PlacementSpec) {
    spec.policy.get_or_insert_with(|| PlacementPolicy {
        placement_type: PlacementType::PickAll,
        ..Default::default()
    });

    let strategy = spec.strategy.get_or_insert_with(RolloutStrategy::default);
    let strategy_type = *strategy
        .strategy_type
        .get_or_insert(RolloutStrategyType::RollingUpdate);
    if strategy_type == RolloutStrategyType::RollingUpdate {
        let rolling = strategy
            .rolling_update
            .get_or_insert_with(RollingUpdateConfig::default);
        rolling
            .max_unavailable
            .get_or_insert_with(|| IntOrString::String(DEFAULT_MAX_UNAVAILABLE.to_string()));
        rolling
            .max_surge
            .get_or_insert_with(|| IntOrString::String(DEFAULT_MAX_SURGE.to_string()));
        rolling
            .unavailable_period_seconds
            .get_or_insert(DEFAULT_UNAVAILABLE_PERIOD_SECONDS);
    }

    let apply = strategy
        .apply_strategy
        .get_or_insert_with(ApplyStrategy::default);
    apply
        .apply_type
        .get_or_insert_with(|| DEFAULT_APPLY_TYPE.to_string());
    apply
        .comparison_option
        .get_or_insert_with(|| DEFAULT_COMPARISON_OPTION.to_string());
    apply
        .when_to_apply
        .get_or_insert_with(|| DEFAULT_WHEN_TO_APPLY.to_string());
    apply
        .when_to_take_over
        .get_or_insert_with(|| DEFAULT_WHEN_TO_TAKE_OVER.to_string());

    spec.revision_history_limit.get_or_insert(DEFAULT_REVISION_HISTORY_LIMIT);
}

/// Patch from `crp` to its defaulted form. Both sides go through the typed
/// projection, so fields unknown to it never show up as removals.
pub fn defaulting_patch(
    crp: &ClusterResourcePlacement,
) -> Result<json_patch::Patch, serde_json::Error> {
    let mut defaulted = crp.clone();
    apply_defaults(&mut defaulted.spec.placement);
    let before = serde_json::to_value(crp)?;
    let after = serde_json::to_value(&defaulted)?;
    Ok(json_patch::diff(&before, &after))
}

/// Answer a request routed to the mutating handler for `kind`.
pub fn mutate(
    kind: ResourceKind,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<AdmissionResponse, DecodeError> {
    let response = AdmissionResponse::from(request);
    if kind != ResourceKind::ClusterResourcePlacement
        || !matches!(request.operation, Operation::Create | Operation::Update)
    {
        return Ok(response);
    }

    let crp: ClusterResourcePlacement = decode_object(kind, request)?;
    let patch = match defaulting_patch(&crp) {
        Ok(patch) => patch,
        Err(e) => {
            error!(uid = %request.uid, error = %e, "Failed to compute defaulting patch");
            return Ok(response.deny(format!("failed to default {}: {}", kind, e)));
        }
    };
    if patch.0.is_empty() {
        return Ok(response);
    }

    match response.with_patch(patch) {
        Ok(patched) => Ok(patched),
        Err(e) => {
            error!(uid = %request.uid, error = %e, "Failed to serialize defaulting patch");
            Ok(AdmissionResponse::from(request).deny(format!("failed to default {}: {}", kind, e)))
        }
    }
}
