//! Placement custom resources.
//!
//! `ClusterResourcePlacement` (cluster scoped) and `ResourcePlacement`
//! (namespaced) share one spec shape. Only the fields the admission webhooks
//! read or default are modelled; unknown fields are ignored on decode.

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// API group of every placement kind.
pub const PLACEMENT_GROUP: &str = "placement.kubernetes-fleet.io";
/// Served version of the placement kinds.
pub const PLACEMENT_VERSION: &str = "v1beta1";

/// ClusterResourcePlacement selects cluster-scoped resources (and whole
/// namespaces) and places them onto member clusters.
///
/// Example:
/// ```yaml
/// apiVersion: placement.kubernetes-fleet.io/v1beta1
/// kind: ClusterResourcePlacement
/// metadata:
///   name: app-crp
/// spec:
///   resourceSelectors:
///     - group: ""
///       version: v1
///       kind: Namespace
///       name: app
///   policy:
///     placementType: PickN
///     numberOfClusters: 2
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterResourcePlacement",
    plural = "clusterresourceplacements",
    shortname = "crp",
    schema = "disabled",
    derive = "Default",
    derive = "PartialEq"
)]
pub struct ClusterResourcePlacementSpec {
    #[serde(flatten)]
    pub placement: PlacementSpec,
}

/// ResourcePlacement is the namespaced counterpart of
/// [`ClusterResourcePlacement`]; it may only select namespaced resources.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ResourcePlacement",
    plural = "resourceplacements",
    shortname = "rp",
    namespaced,
    schema = "disabled",
    derive = "Default",
    derive = "PartialEq"
)]
pub struct ResourcePlacementSpec {
    #[serde(flatten)]
    pub placement: PlacementSpec,
}

/// Spec shared by both placement kinds.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSpec {
    /// Resources to place. Required, at least one.
    #[serde(default)]
    pub resource_selectors: Vec<ResourceSelector>,

    /// Scheduling policy. Absent means `PickAll`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PlacementPolicy>,

    /// Rollout strategy for changes to the selected resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RolloutStrategy>,

    /// Number of old policy snapshots to retain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i32>,
}

impl PlacementSpec {
    /// Effective placement type, treating an absent policy as `PickAll`.
    pub fn placement_type(&self) -> PlacementType {
        self.policy
            .as_ref()
            .map(|p| p.placement_type)
            .unwrap_or_default()
    }

    /// Tolerations of the policy, empty when no policy is set.
    pub fn tolerations(&self) -> &[Toleration] {
        self.policy
            .as_ref()
            .map(|p| p.tolerations.as_slice())
            .unwrap_or(&[])
    }
}

/// Selects resources by GVK and either name or label selector.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

impl fmt::Display for ResourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)?;
        if let Some(name) = &self.name {
            write!(f, " name={}", name)?;
        }
        Ok(())
    }
}

/// How member clusters are picked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PlacementType {
    /// Every cluster matching the affinity.
    #[default]
    PickAll,
    /// The N best-scoring clusters.
    PickN,
    /// An explicit list of cluster names.
    PickFixed,
}

impl fmt::Display for PlacementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementType::PickAll => write!(f, "PickAll"),
            PlacementType::PickN => write!(f, "PickN"),
            PlacementType::PickFixed => write!(f, "PickFixed"),
        }
    }
}

/// Scheduling policy of a placement.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPolicy {
    #[serde(default)]
    pub placement_type: PlacementType,

    /// Target clusters for `PickFixed`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_names: Vec<String>,

    /// Target count for `PickN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_clusters: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,

    /// Tolerations for tainted member clusters. Only additions are allowed
    /// once the placement exists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_affinity: Option<ClusterAffinity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAffinity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_during_scheduling_ignored_during_execution: Option<ClusterSelector>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_during_scheduling_ignored_during_execution: Vec<PreferredClusterSelector>,
}

/// A disjunction of cluster selector terms.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelector {
    #[serde(default)]
    pub cluster_selector_terms: Vec<ClusterSelectorTerm>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelectorTerm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredClusterSelector {
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub preference: ClusterSelectorTerm,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySpreadConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_skew: Option<i32>,
    #[serde(default)]
    pub topology_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_unsatisfiable: Option<String>,
}

/// Toleration of a member cluster taint.
///
/// Compared by whole-value equality; missing fields decode as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default)]
    pub operator: TolerationOperator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

impl fmt::Display for Toleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}:{}", self.key, self.operator, self.value)?;
        if let Some(effect) = &self.effect {
            write!(f, ":{}", effect)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TolerationOperator {
    #[default]
    Equal,
    Exists,
}

/// Rollout strategy of a placement.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutStrategy {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub strategy_type: Option<RolloutStrategyType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdateConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_strategy: Option<ApplyStrategy>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RolloutStrategyType {
    #[default]
    RollingUpdate,
    External,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_period_seconds: Option<i32>,
}

/// How resources are applied on member clusters.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyStrategy {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub apply_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_apply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_take_over: Option<String>,
}
