//! MemberCluster custom resource.
//!
//! Represents a cluster that joined the fleet. The hub-side webhooks only
//! look at the identity, heartbeat settings and taints.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// API group of the cluster-membership kinds.
pub const CLUSTER_GROUP: &str = "cluster.kubernetes-fleet.io";

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "cluster.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "MemberCluster",
    plural = "memberclusters",
    shortname = "mc",
    schema = "disabled",
    derive = "Default",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct MemberClusterSpec {
    /// Identity the member agent uses to talk to the hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Subject>,

    /// Seconds between agent heartbeats (default 60).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_period_seconds: Option<i32>,

    /// Taints that placements must tolerate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

/// RBAC subject of a member agent.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub effect: String,
}
