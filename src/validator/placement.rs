//! Placement validation rules.
//!
//! Validates:
//! - Name length
//! - Resource selectors (present, unique, name XOR label selector)
//! - Policy fields allowed for the chosen placement type
//! - Tolerations and topology spread constraints
//! - Rollout strategy and revision history limit

use kube::ResourceExt;

use super::fields::{check_int_or_percent, is_qualified_name};
use super::{ValidationError, Violations};
use crate::crd::{
    ClusterResourcePlacement, PlacementPolicy, PlacementSpec, PlacementType, ResourcePlacement,
    RolloutStrategy, RolloutStrategyType, Toleration, TolerationOperator,
};

/// Maximum length of a placement name (it becomes a label value).
pub const MAX_PLACEMENT_NAME_LENGTH: usize = 63;
pub const MIN_REVISION_HISTORY_LIMIT: i32 = 1;
pub const MAX_REVISION_HISTORY_LIMIT: i32 = 1000;
pub const MIN_PREFERRED_WEIGHT: i32 = -100;
pub const MAX_PREFERRED_WEIGHT: i32 = 100;

/// Validate a ClusterResourcePlacement.
pub fn validate_cluster_resource_placement(
    crp: &ClusterResourcePlacement,
) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    validate_name(&crp.name_any(), &mut v);
    validate_spec(&crp.spec.placement, &mut v);
    v.into_result()
}

/// Validate a ResourcePlacement. Same rules as the cluster-scoped kind, and
/// selectors may not pick cluster-scoped namespaces.
pub fn validate_resource_placement(rp: &ResourcePlacement) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    validate_name(&rp.name_any(), &mut v);
    validate_spec(&rp.spec.placement, &mut v);
    for selector in &rp.spec.placement.resource_selectors {
        if selector.group.is_empty() && selector.kind == "Namespace" {
            v.push(format!(
                "resource selector {} selects a namespace, which is cluster scoped",
                selector
            ));
        }
    }
    v.into_result()
}

fn validate_name(name: &str, v: &mut Violations) {
    if name.len() > MAX_PLACEMENT_NAME_LENGTH {
        v.push(format!(
            "the name field cannot have length exceeding {}",
            MAX_PLACEMENT_NAME_LENGTH
        ));
    }
}

fn validate_spec(spec: &PlacementSpec, v: &mut Violations) {
    validate_resource_selectors(spec, v);
    if let Some(policy) = &spec.policy {
        validate_policy(policy, v);
    }
    if let Some(strategy) = &spec.strategy {
        validate_strategy(strategy, v);
    }
    if let Some(limit) = spec.revision_history_limit
        && !(MIN_REVISION_HISTORY_LIMIT..=MAX_REVISION_HISTORY_LIMIT).contains(&limit)
    {
        v.push(format!(
            "revisionHistoryLimit must be between {} and {}, got {}",
            MIN_REVISION_HISTORY_LIMIT, MAX_REVISION_HISTORY_LIMIT, limit
        ));
    }
}

fn validate_resource_selectors(spec: &PlacementSpec, v: &mut Violations) {
    if spec.resource_selectors.is_empty() {
        v.push("the resource selectors cannot be empty");
    }
    for (i, selector) in spec.resource_selectors.iter().enumerate() {
        if selector.kind.is_empty() || selector.version.is_empty() {
            v.push(format!(
                "resource selector {} must specify both version and kind",
                selector
            ));
        }
        if selector.name.is_some() && selector.label_selector.is_some() {
            v.push(format!(
                "the labelSelector and name fields are mutually exclusive in selector {}",
                selector
            ));
        }
        if spec
            .resource_selectors
            .iter()
            .take(i)
            .any(|earlier| earlier == selector)
        {
            v.push(format!(
                "resource selector {} already exists, and must be unique",
                selector
            ));
        }
    }
}

fn validate_policy(policy: &PlacementPolicy, v: &mut Violations) {
    match policy.placement_type {
        PlacementType::PickAll => {
            if !policy.cluster_names.is_empty() {
                v.push("cluster names must be empty for policy type PickAll");
            }
            if policy.number_of_clusters.is_some() {
                v.push("number of clusters must be nil for policy type PickAll");
            }
            if !policy.topology_spread_constraints.is_empty() {
                v.push("topology spread constraints needs to be empty for policy type PickAll");
            }
            let has_preferred = policy
                .affinity
                .as_ref()
                .and_then(|a| a.cluster_affinity.as_ref())
                .is_some_and(|ca| {
                    !ca.preferred_during_scheduling_ignored_during_execution
                        .is_empty()
                });
            if has_preferred {
                v.push(
                    "preferredDuringSchedulingIgnoredDuringExecution will be ignored for policy type PickAll",
                );
            }
        }
        PlacementType::PickN => {
            match policy.number_of_clusters {
                None => v.push("number of clusters cannot be nil for policy type PickN"),
                Some(n) if n < 0 => v.push(format!(
                    "number of clusters cannot be {} for policy type PickN",
                    n
                )),
                Some(_) => {}
            }
            if !policy.cluster_names.is_empty() {
                v.push("cluster names must be empty for policy type PickN");
            }
        }
        PlacementType::PickFixed => {
            if policy.cluster_names.is_empty() {
                v.push("cluster names cannot be empty for policy type PickFixed");
            }
            for (i, name) in policy.cluster_names.iter().enumerate() {
                if policy.cluster_names.iter().take(i).any(|n| n == name) {
                    v.push(format!(
                        "cluster name {} is duplicated for policy type PickFixed",
                        name
                    ));
                }
            }
            if policy.number_of_clusters.is_some() {
                v.push("number of clusters must be nil for policy type PickFixed");
            }
            if policy.affinity.is_some() {
                v.push("affinity must be nil for policy type PickFixed");
            }
            if !policy.topology_spread_constraints.is_empty() {
                v.push("topology spread constraints needs to be empty for policy type PickFixed");
            }
            if !policy.tolerations.is_empty() {
                v.push("tolerations needs to be empty for policy type PickFixed");
            }
        }
    }

    if let Some(ca) = policy
        .affinity
        .as_ref()
        .and_then(|a| a.cluster_affinity.as_ref())
    {
        for preferred in &ca.preferred_during_scheduling_ignored_during_execution {
            if !(MIN_PREFERRED_WEIGHT..=MAX_PREFERRED_WEIGHT).contains(&preferred.weight) {
                v.push(format!(
                    "affinity weight must be between {} and {}, got {}",
                    MIN_PREFERRED_WEIGHT, MAX_PREFERRED_WEIGHT, preferred.weight
                ));
            }
        }
    }

    for constraint in &policy.topology_spread_constraints {
        if let Some(skew) = constraint.max_skew
            && skew < 1
        {
            v.push(format!("maxSkew must be at least 1, got {}", skew));
        }
        if constraint.topology_key.is_empty() {
            v.push("topologyKey cannot be empty");
        }
        if let Some(action) = &constraint.when_unsatisfiable
            && action != "DoNotSchedule"
            && action != "ScheduleAnyway"
        {
            v.push(format!(
                "unknown unsatisfiable action {}, must be DoNotSchedule or ScheduleAnyway",
                action
            ));
        }
    }

    validate_tolerations(&policy.tolerations, v);
}

fn validate_tolerations(tolerations: &[Toleration], v: &mut Violations) {
    for (i, toleration) in tolerations.iter().enumerate() {
        if !toleration.key.is_empty() && !is_qualified_name(&toleration.key) {
            v.push(format!(
                "toleration key {} is not a valid qualified name",
                toleration.key
            ));
        }
        match toleration.operator {
            TolerationOperator::Exists => {
                if !toleration.value.is_empty() {
                    v.push(format!(
                        "toleration value needs to be empty, when operator is Exists: {}",
                        toleration
                    ));
                }
            }
            TolerationOperator::Equal => {
                if toleration.key.is_empty() {
                    v.push(format!(
                        "toleration key cannot be empty, when operator is Equal: {}",
                        toleration
                    ));
                }
            }
        }
        if let Some(effect) = &toleration.effect
            && effect != "NoSchedule"
        {
            v.push(format!(
                "toleration effect {} is not supported, only NoSchedule is allowed",
                effect
            ));
        }
        if tolerations.iter().take(i).any(|t| t == toleration) {
            v.push(format!(
                "toleration {} already exists, tolerations must be unique",
                toleration
            ));
        }
    }
}

fn validate_strategy(strategy: &RolloutStrategy, v: &mut Violations) {
    let strategy_type = strategy.strategy_type.unwrap_or_default();
    if strategy_type == RolloutStrategyType::External && strategy.rolling_update.is_some() {
        v.push("rollingUpdate config needs to be empty for rollout strategy type External");
    }
    if let Some(rolling) = &strategy.rolling_update {
        if let Some(max_unavailable) = &rolling.max_unavailable
            && let Some(err) = check_int_or_percent("maxUnavailable", max_unavailable, 1, 1)
        {
            v.push(err);
        }
        if let Some(max_surge) = &rolling.max_surge
            && let Some(err) = check_int_or_percent("maxSurge", max_surge, 0, 0)
        {
            v.push(err);
        }
        if let Some(period) = rolling.unavailable_period_seconds
            && period < 0
        {
            v.push(format!(
                "unavailablePeriodSeconds must be greater than or equal to 0, got {}",
                period
            ));
        }
    }
}
