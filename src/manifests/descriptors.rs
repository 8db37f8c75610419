//! Webhook rule descriptors.
//!
//! Every builder is a pure function of [`Config`]: no I/O, no randomness,
//! fixed ordering. The same descriptors drive both the installed webhook
//! configurations and the server's routing table.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};

use crate::config::Config;
use crate::kinds::{ResourceKind, Scope};
use crate::webhooks::Handler;

/// Single path shared by every guard rail descriptor.
pub const GUARD_RAIL_PATH: &str = "/validate-v1-fleetresourcehandler";

/// Namespace label set by the API server on every namespace.
pub const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";
/// Label the hub puts on the per-member namespaces it creates.
pub const FLEET_MEMBER_NAMESPACE_LABEL: &str = "kubernetes-fleet.io/member-namespace";

pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

/// Webhook call timeout in seconds.
pub const WEBHOOK_TIMEOUT_SECONDS: i32 = 10;

/// Admission operation a rule matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleOperation {
    Create,
    Update,
    Delete,
}

impl RuleOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOperation::Create => "CREATE",
            RuleOperation::Update => "UPDATE",
            RuleOperation::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleScope {
    Cluster,
    Namespaced,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Cluster => "Cluster",
            RuleScope::Namespaced => "Namespaced",
        }
    }
}

impl From<Scope> for RuleScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Cluster => RuleScope::Cluster,
            Scope::Namespaced => RuleScope::Namespaced,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    #[default]
    Fail,
    Ignore,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Fail => "Fail",
            FailurePolicy::Ignore => "Ignore",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SideEffects {
    #[default]
    None,
    NoneOnDryRun,
}

impl SideEffects {
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEffects::None => "None",
            SideEffects::NoneOnDryRun => "NoneOnDryRun",
        }
    }
}

/// One webhook entry: where requests for a set of resources are sent and
/// how the API server treats failures.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookRuleDescriptor {
    /// Fully qualified webhook name (`<something>.kubernetes-fleet.io`).
    pub name: String,
    pub path: String,
    /// Handler the path is bound to.
    pub handler: Handler,
    pub api_groups: Vec<String>,
    pub api_versions: Vec<String>,
    pub resources: Vec<String>,
    pub operations: Vec<RuleOperation>,
    pub scope: RuleScope,
    pub failure_policy: FailurePolicy,
    pub side_effects: SideEffects,
    pub ca_bundle: Vec<u8>,
    pub namespace_selector: Option<LabelSelector>,
    pub timeout_seconds: Option<i32>,
}

const CREATE_UPDATE: &[RuleOperation] = &[RuleOperation::Create, RuleOperation::Update];
const ALL_OPERATIONS: &[RuleOperation] = &[
    RuleOperation::Create,
    RuleOperation::Update,
    RuleOperation::Delete,
];

impl WebhookRuleDescriptor {
    fn for_kind(
        config: &Config,
        kind: ResourceKind,
        handler: Handler,
        path: String,
        suffix: &str,
        operations: &[RuleOperation],
    ) -> Self {
        Self {
            name: format!("fleet.{}.{}", kind.kind().to_lowercase(), suffix),
            path,
            handler,
            api_groups: vec![kind.group().to_string()],
            api_versions: vec![kind.version().to_string()],
            resources: vec![kind.plural()],
            operations: operations.to_vec(),
            scope: kind.scope().into(),
            failure_policy: FailurePolicy::Fail,
            side_effects: SideEffects::None,
            ca_bundle: config.ca_pem.clone(),
            namespace_selector: None,
            timeout_seconds: Some(WEBHOOK_TIMEOUT_SECONDS),
        }
    }

    fn validating(config: &Config, kind: ResourceKind, operations: &[RuleOperation]) -> Self {
        Self::for_kind(
            config,
            kind,
            Handler::Validate(kind),
            kind.validation_path(),
            "validating.kubernetes-fleet.io",
            operations,
        )
    }

    fn guard_rail(
        config: &Config,
        name: &str,
        api_groups: &[&str],
        resources: &[&str],
        operations: &[RuleOperation],
        scope: RuleScope,
        namespace_selector: Option<LabelSelector>,
    ) -> Self {
        Self {
            name: format!("fleet.{}.guardrail.kubernetes-fleet.io", name),
            path: GUARD_RAIL_PATH.to_string(),
            handler: Handler::GuardRail,
            api_groups: api_groups.iter().map(|g| g.to_string()).collect(),
            api_versions: vec!["*".to_string()],
            resources: resources.iter().map(|r| r.to_string()).collect(),
            operations: operations.to_vec(),
            scope,
            failure_policy: FailurePolicy::Fail,
            side_effects: SideEffects::None,
            ca_bundle: config.ca_pem.clone(),
            namespace_selector,
            timeout_seconds: Some(WEBHOOK_TIMEOUT_SECONDS),
        }
    }
}

/// The mutating set: placement defaulting. Independent of every flag.
pub fn build_mutating(config: &Config) -> Vec<WebhookRuleDescriptor> {
    let kind = ResourceKind::ClusterResourcePlacement;
    vec![WebhookRuleDescriptor::for_kind(
        config,
        kind,
        Handler::Mutate(kind),
        kind.mutation_path(),
        "mutating.kubernetes-fleet.io",
        CREATE_UPDATE,
    )]
}

/// The validating set: eight descriptors, or six when workloads may run on
/// the hub (the pod and replicaset validators exist only to block them).
pub fn build_validating(config: &Config) -> Vec<WebhookRuleDescriptor> {
    let mut descriptors = Vec::with_capacity(8);
    if !config.enable_workload {
        descriptors.push(WebhookRuleDescriptor::validating(
            config,
            ResourceKind::Pod,
            &[RuleOperation::Create],
        ));
        descriptors.push(WebhookRuleDescriptor::validating(
            config,
            ResourceKind::ReplicaSet,
            &[RuleOperation::Create],
        ));
    }
    descriptors.extend([
        WebhookRuleDescriptor::validating(
            config,
            ResourceKind::ClusterResourcePlacement,
            CREATE_UPDATE,
        ),
        WebhookRuleDescriptor::validating(config, ResourceKind::ResourcePlacement, CREATE_UPDATE),
        WebhookRuleDescriptor::validating(config, ResourceKind::MemberCluster, CREATE_UPDATE),
        WebhookRuleDescriptor::validating(
            config,
            ResourceKind::ClusterResourceOverride,
            CREATE_UPDATE,
        ),
        WebhookRuleDescriptor::validating(
            config,
            ResourceKind::ClusterResourcePlacementEviction,
            CREATE_UPDATE,
        ),
        WebhookRuleDescriptor::validating(
            config,
            ResourceKind::ClusterResourcePlacementDisruptionBudget,
            CREATE_UPDATE,
        ),
    ]);
    descriptors
}

/// The guard rail set: always six descriptors. Whether it is installed at
/// all is decided by `enable_guard_rail` at install time.
pub fn build_guard_rail(config: &Config) -> Vec<WebhookRuleDescriptor> {
    let member_cluster_operations: &[RuleOperation] = if config.deny_modify_member_cluster_labels
    {
        ALL_OPERATIONS
    } else {
        &[RuleOperation::Create, RuleOperation::Delete]
    };

    vec![
        WebhookRuleDescriptor::guard_rail(
            config,
            "customresourcedefinition",
            &["apiextensions.k8s.io"],
            &["customresourcedefinitions"],
            ALL_OPERATIONS,
            RuleScope::Cluster,
            None,
        ),
        WebhookRuleDescriptor::guard_rail(
            config,
            "membercluster",
            &[crate::crd::CLUSTER_GROUP],
            &["memberclusters"],
            member_cluster_operations,
            RuleScope::Cluster,
            None,
        ),
        WebhookRuleDescriptor::guard_rail(
            config,
            "fleetmembernamespacedresources",
            &["*"],
            &["*"],
            ALL_OPERATIONS,
            RuleScope::Namespaced,
            Some(label_exists(FLEET_MEMBER_NAMESPACE_LABEL)),
        ),
        WebhookRuleDescriptor::guard_rail(
            config,
            "fleetsystemnamespacedresources",
            &["*"],
            &["*"],
            ALL_OPERATIONS,
            RuleScope::Namespaced,
            Some(namespace_named(&config.service_namespace)),
        ),
        WebhookRuleDescriptor::guard_rail(
            config,
            "kubesystemnamespacedresources",
            &["*"],
            &["*"],
            ALL_OPERATIONS,
            RuleScope::Namespaced,
            Some(namespace_named(KUBE_SYSTEM_NAMESPACE)),
        ),
        WebhookRuleDescriptor::guard_rail(
            config,
            "namespace",
            &[""],
            &["namespaces"],
            ALL_OPERATIONS,
            RuleScope::Cluster,
            None,
        ),
    ]
}

fn namespace_named(namespace: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(BTreeMap::from([(
            NAMESPACE_NAME_LABEL.to_string(),
            namespace.to_string(),
        )])),
        ..Default::default()
    }
}

fn label_exists(key: &str) -> LabelSelector {
    LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: key.to_string(),
            operator: "Exists".to_string(),
            values: None,
        }]),
        ..Default::default()
    }
}
