//! Resource kinds the webhooks are registered for.

use std::fmt;

use crate::crd::{CLUSTER_GROUP, PLACEMENT_GROUP, PLACEMENT_VERSION};

/// Whether a kind is cluster scoped or namespaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Cluster,
    Namespaced,
}

/// Every kind with a dedicated validating or mutating handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    ReplicaSet,
    ClusterResourcePlacement,
    ResourcePlacement,
    MemberCluster,
    ClusterResourceOverride,
    ClusterResourcePlacementEviction,
    ClusterResourcePlacementDisruptionBudget,
}

impl ResourceKind {
    /// API group, empty for the core group.
    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "",
            ResourceKind::ReplicaSet => "apps",
            ResourceKind::MemberCluster => CLUSTER_GROUP,
            ResourceKind::ClusterResourcePlacement
            | ResourceKind::ResourcePlacement
            | ResourceKind::ClusterResourceOverride
            | ResourceKind::ClusterResourcePlacementEviction
            | ResourceKind::ClusterResourcePlacementDisruptionBudget => PLACEMENT_GROUP,
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            ResourceKind::Pod | ResourceKind::ReplicaSet => "v1",
            _ => PLACEMENT_VERSION,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::ClusterResourcePlacement => "ClusterResourcePlacement",
            ResourceKind::ResourcePlacement => "ResourcePlacement",
            ResourceKind::MemberCluster => "MemberCluster",
            ResourceKind::ClusterResourceOverride => "ClusterResourceOverride",
            ResourceKind::ClusterResourcePlacementEviction => "ClusterResourcePlacementEviction",
            ResourceKind::ClusterResourcePlacementDisruptionBudget => {
                "ClusterResourcePlacementDisruptionBudget"
            }
        }
    }

    /// Plural resource name used in webhook rules.
    pub fn plural(&self) -> String {
        format!("{}s", self.kind().to_lowercase())
    }

    pub fn scope(&self) -> Scope {
        match self {
            ResourceKind::Pod | ResourceKind::ReplicaSet | ResourceKind::ResourcePlacement => {
                Scope::Namespaced
            }
            _ => Scope::Cluster,
        }
    }

    /// `{group}-{version}-{kind}` with dots replaced, group omitted for core.
    fn path_segment(&self) -> String {
        let kind = self.kind().to_lowercase();
        match self.group() {
            "" => format!("{}-{}", self.version(), kind),
            group => format!("{}-{}-{}", group.replace('.', "-"), self.version(), kind),
        }
    }

    /// Path of the validating handler.
    pub fn validation_path(&self) -> String {
        format!("/validate-{}", self.path_segment())
    }

    /// Path of the mutating handler.
    pub fn mutation_path(&self) -> String {
        format!("/mutate-{}", self.path_segment())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
