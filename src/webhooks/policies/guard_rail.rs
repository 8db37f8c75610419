//! Guard rail policy.
//!
//! Protects fleet-owned objects from non-privileged users:
//! - fleet CRDs
//! - MemberCluster objects (create/delete, spec changes, and label changes
//!   when label protection is on)
//! - reserved namespaces and the resources inside them
//!
//! Identity is taken from `userInfo` as supplied by the API server.

use k8s_openapi::api::authentication::v1::UserInfo;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};

use super::workload::is_reserved_namespace;
use super::{DecodeError, ValidationDecision, decode_object, decode_old_object, operation_name};
use crate::config::Config;
use crate::crd::{CLUSTER_GROUP, MemberCluster};
use crate::kinds::ResourceKind;

/// Groups whose members bypass the guard rail. Service accounts of the
/// install namespace are added per config.
const PRIVILEGED_GROUPS: &[&str] = &[
    "system:masters",
    "system:nodes",
    "system:serviceaccounts:kube-system",
];

/// Control plane users that bypass the guard rail.
const PRIVILEGED_USERS: &[&str] = &["system:kube-controller-manager", "system:kube-scheduler"];

/// Suffix shared by every fleet API group.
const FLEET_GROUP_SUFFIX: &str = "kubernetes-fleet.io";

const CRD_GROUP: &str = "apiextensions.k8s.io";

#[derive(Clone, Debug)]
pub struct GuardRail {
    whitelisted_users: Vec<String>,
    deny_modify_member_cluster_labels: bool,
    install_namespace: String,
    install_service_accounts: String,
}

impl GuardRail {
    pub fn new(config: &Config) -> Self {
        Self {
            whitelisted_users: config.whitelisted_users.clone(),
            deny_modify_member_cluster_labels: config.deny_modify_member_cluster_labels,
            install_namespace: config.service_namespace.clone(),
            install_service_accounts: format!(
                "system:serviceaccounts:{}",
                config.service_namespace
            ),
        }
    }

    /// Reserved prefixes plus the namespace the hub is installed in.
    fn is_protected_namespace(&self, namespace: &str) -> bool {
        is_reserved_namespace(namespace) || namespace == self.install_namespace
    }

    fn is_privileged(&self, user: &UserInfo) -> bool {
        let username = user.username.as_deref().unwrap_or_default();
        if PRIVILEGED_USERS.contains(&username) || self.whitelisted_users.iter().any(|u| u == username)
        {
            return true;
        }
        user.groups
            .iter()
            .flatten()
            .any(|g| {
                PRIVILEGED_GROUPS.contains(&g.as_str()) || *g == self.install_service_accounts
            })
    }

    pub fn review(
        &self,
        request: &AdmissionRequest<DynamicObject>,
    ) -> Result<ValidationDecision, DecodeError> {
        let username = request.user_info.username.as_deref().unwrap_or_default();
        let operation = operation_name(&request.operation);
        let kind = &request.kind;

        if self.is_privileged(&request.user_info) {
            return Ok(ValidationDecision::allow(format!(
                "user {} is privileged, {} {} {} allowed",
                username, operation, kind.kind, request.name
            )));
        }

        if kind.group == CRD_GROUP && kind.kind == "CustomResourceDefinition" {
            return Ok(if is_fleet_crd(&request.name) {
                ValidationDecision::deny(format!(
                    "user {} is not allowed to {} fleet CRD {}",
                    username, operation, request.name
                ))
            } else {
                ValidationDecision::allow(format!("CRD {} is not a fleet CRD", request.name))
            });
        }

        if kind.group == CLUSTER_GROUP && kind.kind == "MemberCluster" {
            return self.review_member_cluster(request, username);
        }

        if kind.group.is_empty() && kind.kind == "Namespace" {
            return Ok(if self.is_protected_namespace(&request.name) {
                ValidationDecision::deny(format!(
                    "user {} is not allowed to {} reserved namespace {}",
                    username, operation, request.name
                ))
            } else {
                ValidationDecision::allow(format!(
                    "namespace {} is not reserved",
                    request.name
                ))
            });
        }

        let namespace = request.namespace.as_deref().unwrap_or_default();
        Ok(if self.is_protected_namespace(namespace) {
            ValidationDecision::deny(format!(
                "user {} is not allowed to {} {} {}/{} in a reserved namespace",
                username, operation, kind.kind, namespace, request.name
            ))
        } else {
            ValidationDecision::allow(format!(
                "{} {}/{} is not in a reserved namespace",
                kind.kind, namespace, request.name
            ))
        })
    }

    fn review_member_cluster(
        &self,
        request: &AdmissionRequest<DynamicObject>,
        username: &str,
    ) -> Result<ValidationDecision, DecodeError> {
        if request.operation != Operation::Update {
            return Ok(ValidationDecision::deny(format!(
                "user {} is not allowed to {} member cluster {}",
                username,
                operation_name(&request.operation),
                request.name
            )));
        }

        let kind = ResourceKind::MemberCluster;
        let new: MemberCluster = decode_object(kind, request)?;
        let old: MemberCluster = decode_old_object(kind, request)?;

        if old.spec != new.spec {
            return Ok(ValidationDecision::deny(format!(
                "user {} is not allowed to update the spec of member cluster {}",
                username, request.name
            )));
        }
        if self.deny_modify_member_cluster_labels && old.metadata.labels != new.metadata.labels {
            return Ok(ValidationDecision::deny(format!(
                "user {} is not allowed to modify labels of member cluster {}",
                username, request.name
            )));
        }
        Ok(ValidationDecision::allow(format!(
            "member cluster {} update does not touch protected fields",
            request.name
        )))
    }
}

/// `<plural>.<group>` where the group is a fleet group.
fn is_fleet_crd(name: &str) -> bool {
    name.split_once('.')
        .is_some_and(|(_, group)| group == FLEET_GROUP_SUFFIX || group.ends_with(&format!(".{}", FLEET_GROUP_SUFFIX)))
}
