//! Updates to objects stored before their rules were enforced.
//!
//! An object whose stored form already fails validation may only move toward
//! deletion: the update that clears its finalizers must still be admitted,
//! anything else is denied.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;

use super::{DecodeError, ValidationDecision, decode_old_object};
use crate::crd::{
    ClusterResourceOverride, ClusterResourcePlacementDisruptionBudget,
    ClusterResourcePlacementEviction, MemberCluster,
};
use crate::kinds::ResourceKind;
use crate::validator::{
    ValidationError, validate_cluster_resource_override, validate_disruption_budget,
    validate_eviction, validate_member_cluster,
};

/// A fleet object with static field rules.
pub trait Validated: Resource + DeserializeOwned {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validated for MemberCluster {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_member_cluster(self)
    }
}

impl Validated for ClusterResourceOverride {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_cluster_resource_override(self)
    }
}

impl Validated for ClusterResourcePlacementEviction {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_eviction(self)
    }
}

impl Validated for ClusterResourcePlacementDisruptionBudget {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_disruption_budget(self)
    }
}

/// Decide an update whose old object fails validation. `None` when the old
/// object is valid and the regular rules apply.
pub fn invalid_stored_object<K: Validated>(
    kind: ResourceKind,
    new: &K,
    old: &K,
) -> Option<ValidationDecision> {
    let err = old.validate().err()?;
    Some(if new.meta().deletion_timestamp.is_some() {
        ValidationDecision::allow(format!(
            "allow update on old invalid {} {} with DeletionTimestamp set",
            kind,
            new.name_any()
        ))
    } else {
        ValidationDecision::deny(format!(
            "deny update on old invalid {} {} with DeletionTimestamp not set: {}",
            kind,
            new.name_any(),
            err
        ))
    })
}

/// On update, decode the old object and decide through
/// [`invalid_stored_object`]. `None` for creates.
pub fn stored_rule<K: Validated>(
    kind: ResourceKind,
    request: &AdmissionRequest<DynamicObject>,
    new: &K,
) -> Result<Option<ValidationDecision>, DecodeError> {
    if request.operation != Operation::Update {
        return Ok(None);
    }
    let old: K = decode_old_object(kind, request)?;
    Ok(invalid_stored_object(kind, new, &old))
}

/// Static validation of the new object.
pub fn field_decision<K: Validated>(kind: ResourceKind, object: &K) -> ValidationDecision {
    match object.validate() {
        Ok(()) => ValidationDecision::allow(format!(
            "{} {} has valid fields",
            kind,
            object.name_any()
        )),
        Err(err) => ValidationDecision::deny(format!(
            "{} {} has invalid fields: {}",
            kind,
            object.name_any(),
            err
        )),
    }
}
