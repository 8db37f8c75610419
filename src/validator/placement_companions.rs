//! Rules for the kinds that accompany a placement: overrides, evictions and
//! disruption budgets.

use kube::ResourceExt;

use super::fields::check_int_or_percent;
use super::{ValidationError, Violations};
use crate::crd::{
    ClusterResourceOverride, ClusterResourcePlacementDisruptionBudget,
    ClusterResourcePlacementEviction, JsonPatchOverride,
};

/// Paths a JSON patch override may never touch.
const PROTECTED_PATCH_PATHS: &[&str] = &[
    "/kind",
    "/apiVersion",
    "/metadata/name",
    "/metadata/namespace",
    "/status",
];

const PATCH_OPS: &[&str] = &["add", "remove", "replace"];

/// Validate a ClusterResourceOverride.
pub fn validate_cluster_resource_override(
    cro: &ClusterResourceOverride,
) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    let spec = &cro.spec;

    if spec.cluster_resource_selectors.is_empty() {
        v.push("clusterResourceSelectors cannot be empty");
    }
    for (i, selector) in spec.cluster_resource_selectors.iter().enumerate() {
        if selector.name.is_none() {
            v.push(format!(
                "resource selector {} must select a resource by name",
                selector
            ));
        }
        if spec
            .cluster_resource_selectors
            .iter()
            .take(i)
            .any(|s| s == selector)
        {
            v.push(format!("resource selector {} is duplicated", selector));
        }
    }

    let rules = spec
        .policy
        .as_ref()
        .map(|p| p.override_rules.as_slice())
        .unwrap_or(&[]);
    if rules.is_empty() {
        v.push("policy must have at least one override rule");
    }
    for rule in rules {
        let delete = rule.override_type.as_deref() == Some("Delete");
        if delete && !rule.json_patch_overrides.is_empty() {
            v.push("jsonPatchOverrides must be empty when the override type is Delete");
        }
        if !delete && rule.json_patch_overrides.is_empty() {
            v.push("jsonPatchOverrides cannot be empty when the override type is JSONPatch");
        }
        for patch in &rule.json_patch_overrides {
            validate_patch(patch, &mut v);
        }
    }

    v.into_result()
}

fn validate_patch(patch: &JsonPatchOverride, v: &mut Violations) {
    if !PATCH_OPS.contains(&patch.op.as_str()) {
        v.push(format!("unsupported JSON patch operation {}", patch.op));
    }
    if !patch.path.starts_with('/') {
        v.push(format!("path {} must start with /", patch.path));
        return;
    }
    let protected = PROTECTED_PATCH_PATHS
        .iter()
        .any(|p| patch.path == *p || patch.path.starts_with(&format!("{}/", p)));
    if protected {
        v.push(format!("cannot override field {}", patch.path));
    }
    if patch.op == "remove" && patch.value.is_some() {
        v.push(format!("remove operation cannot have a value: {}", patch.path));
    }
}

/// Validate a ClusterResourcePlacementEviction.
pub fn validate_eviction(eviction: &ClusterResourcePlacementEviction) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    if eviction.spec.placement_name.is_empty() {
        v.push("placementName cannot be empty");
    }
    if eviction.spec.cluster_name.is_empty() {
        v.push("clusterName cannot be empty");
    }
    v.into_result()
}

/// Validate a ClusterResourcePlacementDisruptionBudget.
pub fn validate_disruption_budget(
    budget: &ClusterResourcePlacementDisruptionBudget,
) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    let spec = &budget.spec;

    match (&spec.max_unavailable, &spec.min_available) {
        (Some(_), Some(_)) => v.push(format!(
            "disruption budget {} cannot set both maxUnavailable and minAvailable",
            budget.name_any()
        )),
        (Some(max), None) => {
            if let Some(err) = check_int_or_percent("maxUnavailable", max, 0, 0) {
                v.push(err);
            }
        }
        (None, Some(min)) => {
            if let Some(err) = check_int_or_percent("minAvailable", min, 0, 0) {
                v.push(err);
            }
        }
        (None, None) => {}
    }

    v.into_result()
}
