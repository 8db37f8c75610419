//! Test fixtures and builder patterns for placements and admission reviews.

use std::path::PathBuf;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;
use serde_json::{Value, json};

use fleet_webhook::config::{ClientConnectionType, Config};
use fleet_webhook::crd::{
    ClusterResourcePlacement, ClusterResourcePlacementSpec, PlacementPolicy, PlacementSpec,
    PlacementType, ResourcePlacement, ResourcePlacementSpec, ResourceSelector, Toleration,
    TolerationOperator,
};

/// Builder for placement test fixtures.
///
/// # Example
/// ```
/// let crp = PlacementBuilder::new("app-crp")
///     .placement_type(PlacementType::PickN)
///     .number_of_clusters(2)
///     .toleration(toleration("env", "prod"))
///     .build_crp();
/// ```
#[derive(Clone, Debug)]
pub struct PlacementBuilder {
    name: String,
    namespace: Option<String>,
    selectors: Vec<ResourceSelector>,
    placement_type: Option<PlacementType>,
    number_of_clusters: Option<i32>,
    cluster_names: Vec<String>,
    tolerations: Vec<Toleration>,
    deleting: bool,
}

impl PlacementBuilder {
    /// Create a new builder selecting the `app` namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            selectors: vec![namespace_selector("app")],
            placement_type: None,
            number_of_clusters: None,
            cluster_names: Vec::new(),
            tolerations: Vec::new(),
            deleting: false,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Replace the resource selectors.
    pub fn selectors(mut self, selectors: Vec<ResourceSelector>) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn placement_type(mut self, placement_type: PlacementType) -> Self {
        self.placement_type = Some(placement_type);
        self
    }

    pub fn number_of_clusters(mut self, n: i32) -> Self {
        self.number_of_clusters = Some(n);
        self
    }

    pub fn cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_names.push(name.into());
        self
    }

    pub fn toleration(mut self, toleration: Toleration) -> Self {
        self.tolerations.push(toleration);
        self
    }

    pub fn tolerations(mut self, tolerations: Vec<Toleration>) -> Self {
        self.tolerations.extend(tolerations);
        self
    }

    /// Set the deletion marker.
    pub fn deleting(mut self) -> Self {
        self.deleting = true;
        self
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: self.namespace.clone(),
            deletion_timestamp: self.deleting.then(|| Time(k8s_openapi::chrono::DateTime::UNIX_EPOCH)),
            ..Default::default()
        }
    }

    fn spec(&self) -> PlacementSpec {
        let has_policy = self.placement_type.is_some()
            || self.number_of_clusters.is_some()
            || !self.cluster_names.is_empty()
            || !self.tolerations.is_empty();
        PlacementSpec {
            resource_selectors: self.selectors.clone(),
            policy: has_policy.then(|| PlacementPolicy {
                placement_type: self.placement_type.unwrap_or_default(),
                cluster_names: self.cluster_names.clone(),
                number_of_clusters: self.number_of_clusters,
                tolerations: self.tolerations.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn build_crp(self) -> ClusterResourcePlacement {
        ClusterResourcePlacement {
            metadata: self.metadata(),
            spec: ClusterResourcePlacementSpec {
                placement: self.spec(),
            },
        }
    }

    pub fn build_rp(self) -> ResourcePlacement {
        ResourcePlacement {
            metadata: self.metadata(),
            spec: ResourcePlacementSpec {
                placement: self.spec(),
            },
        }
    }

    /// The ClusterResourcePlacement as it appears in an admission review.
    pub fn crp_json(self) -> Value {
        serde_json::to_value(self.build_crp()).expect("serializable placement")
    }

    /// The ResourcePlacement as it appears in an admission review.
    pub fn rp_json(self) -> Value {
        serde_json::to_value(self.build_rp()).expect("serializable placement")
    }
}

impl Default for PlacementBuilder {
    fn default() -> Self {
        Self::new("test-crp")
    }
}

/// Selector for a whole namespace.
pub fn namespace_selector(name: &str) -> ResourceSelector {
    ResourceSelector {
        group: String::new(),
        version: "v1".to_string(),
        kind: "Namespace".to_string(),
        name: Some(name.to_string()),
        label_selector: None,
    }
}

/// Selector for a namespaced resource by name.
pub fn config_map_selector(name: &str) -> ResourceSelector {
    ResourceSelector {
        group: String::new(),
        version: "v1".to_string(),
        kind: "ConfigMap".to_string(),
        name: Some(name.to_string()),
        label_selector: None,
    }
}

/// `key=value:NoSchedule` toleration.
pub fn toleration(key: &str, value: &str) -> Toleration {
    Toleration {
        key: key.to_string(),
        operator: TolerationOperator::Equal,
        value: value.to_string(),
        effect: Some("NoSchedule".to_string()),
    }
}

/// Configuration used across tests: service connection, everything off.
pub fn test_config() -> Config {
    Config {
        service_namespace: "fleet-system".to_string(),
        service_name: "fleetwebhook".to_string(),
        service_port: 9443,
        service_url: "https://fleetwebhook.fleet-system.svc:9443".to_string(),
        client_connection_type: ClientConnectionType::Service,
        enable_guard_rail: false,
        deny_modify_member_cluster_labels: false,
        enable_workload: false,
        use_cert_manager: false,
        cert_dir: PathBuf::from("/tmp/k8s-webhook-server/serving-certs"),
        webhook_cert_secret_name: "fleet-webhook-server-cert".to_string(),
        whitelisted_users: Vec::new(),
        ca_pem: b"test-ca".to_vec(),
    }
}

/// Builder for AdmissionReview request bodies.
#[derive(Clone, Debug)]
pub struct ReviewBuilder {
    uid: String,
    group: String,
    version: String,
    kind: String,
    resource: String,
    operation: String,
    object: Option<Value>,
    old_object: Option<Value>,
    username: String,
    groups: Vec<String>,
}

impl ReviewBuilder {
    pub fn new(group: &str, version: &str, kind: &str, resource: &str) -> Self {
        Self {
            uid: "0df28fbd-5f5f-11e8-b9ee-42010a800002".to_string(),
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            resource: resource.to_string(),
            operation: "CREATE".to_string(),
            object: None,
            old_object: None,
            username: "alice".to_string(),
            groups: vec!["system:authenticated".to_string()],
        }
    }

    /// Review for a ClusterResourcePlacement.
    pub fn crp() -> Self {
        Self::new(
            "placement.kubernetes-fleet.io",
            "v1beta1",
            "ClusterResourcePlacement",
            "clusterresourceplacements",
        )
    }

    /// Review for a ResourcePlacement.
    pub fn rp() -> Self {
        Self::new(
            "placement.kubernetes-fleet.io",
            "v1beta1",
            "ResourcePlacement",
            "resourceplacements",
        )
    }

    pub fn uid(mut self, uid: &str) -> Self {
        self.uid = uid.to_string();
        self
    }

    /// CREATE with `object`.
    pub fn create(mut self, object: Value) -> Self {
        self.operation = "CREATE".to_string();
        self.object = Some(object);
        self
    }

    /// UPDATE from `old` to `new`.
    pub fn update(mut self, old: Value, new: Value) -> Self {
        self.operation = "UPDATE".to_string();
        self.old_object = Some(old);
        self.object = Some(new);
        self
    }

    /// DELETE of `old`.
    pub fn delete(mut self, old: Value) -> Self {
        self.operation = "DELETE".to_string();
        self.old_object = Some(old);
        self.object = None;
        self
    }

    pub fn user(mut self, username: &str, groups: &[&str]) -> Self {
        self.username = username.to_string();
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn build(self) -> Value {
        let source = self.object.as_ref().or(self.old_object.as_ref());
        let name = source
            .and_then(|o| o.pointer("/metadata/name"))
            .cloned()
            .unwrap_or(json!(""));
        let namespace = source
            .and_then(|o| o.pointer("/metadata/namespace"))
            .cloned()
            .unwrap_or(Value::Null);
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": self.uid,
                "kind": {"group": self.group, "version": self.version, "kind": self.kind},
                "resource": {"group": self.group, "version": self.version, "resource": self.resource},
                "name": name,
                "namespace": namespace,
                "operation": self.operation,
                "userInfo": {"username": self.username, "groups": self.groups},
                "object": self.object,
                "oldObject": self.old_object,
                "dryRun": false
            }
        })
    }
}
