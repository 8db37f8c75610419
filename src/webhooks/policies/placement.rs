//! Placement admission pipeline.
//!
//! Steps run in order and the first one that returns a decision wins:
//! 1. deletion exception: an old object that already fails validation may
//!    only move toward deletion
//! 2. placement type immutability
//! 3. toleration monotonicity
//! 4. static validation of the new object

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};
use kube::ResourceExt;

use super::{
    DecodeError, ValidationDecision, decode_object, decode_old_object, immutability, tolerations,
};
use crate::crd::{ClusterResourcePlacement, PlacementSpec, ResourcePlacement};
use crate::kinds::ResourceKind;
use crate::validator::{
    ValidationError, validate_cluster_resource_placement, validate_resource_placement,
};

/// Capabilities the pipeline needs from a placement kind.
pub trait Placement {
    /// Short kind name used in decision reasons (`CRP`, `RP`).
    fn abbreviation(&self) -> &'static str;
    fn placement_name(&self) -> String;
    fn placement_spec(&self) -> &PlacementSpec;
    fn deletion_timestamp(&self) -> Option<&Time>;
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Placement for ClusterResourcePlacement {
    fn abbreviation(&self) -> &'static str {
        "CRP"
    }

    fn placement_name(&self) -> String {
        self.name_any()
    }

    fn placement_spec(&self) -> &PlacementSpec {
        &self.spec.placement
    }

    fn deletion_timestamp(&self) -> Option<&Time> {
        self.metadata.deletion_timestamp.as_ref()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_cluster_resource_placement(self)
    }
}

impl Placement for ResourcePlacement {
    fn abbreviation(&self) -> &'static str {
        "RP"
    }

    fn placement_name(&self) -> String {
        self.name_any()
    }

    fn placement_spec(&self) -> &PlacementSpec {
        &self.spec.placement
    }

    fn deletion_timestamp(&self) -> Option<&Time> {
        self.metadata.deletion_timestamp.as_ref()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_resource_placement(self)
    }
}

/// Every placement kind the pipeline handles.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacementObject {
    Cluster(ClusterResourcePlacement),
    Namespaced(ResourcePlacement),
}

impl PlacementObject {
    fn as_placement(&self) -> &dyn Placement {
        match self {
            PlacementObject::Cluster(crp) => crp,
            PlacementObject::Namespaced(rp) => rp,
        }
    }

    fn decode(
        kind: ResourceKind,
        request: &AdmissionRequest<DynamicObject>,
        old: bool,
    ) -> Result<Self, DecodeError> {
        match (kind, old) {
            (ResourceKind::ResourcePlacement, false) => {
                decode_object(kind, request).map(PlacementObject::Namespaced)
            }
            (ResourceKind::ResourcePlacement, true) => {
                decode_old_object(kind, request).map(PlacementObject::Namespaced)
            }
            (_, false) => decode_object(kind, request).map(PlacementObject::Cluster),
            (_, true) => decode_old_object(kind, request).map(PlacementObject::Cluster),
        }
    }
}

impl Placement for PlacementObject {
    fn abbreviation(&self) -> &'static str {
        self.as_placement().abbreviation()
    }

    fn placement_name(&self) -> String {
        self.as_placement().placement_name()
    }

    fn placement_spec(&self) -> &PlacementSpec {
        self.as_placement().placement_spec()
    }

    fn deletion_timestamp(&self) -> Option<&Time> {
        self.as_placement().deletion_timestamp()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.as_placement().validate()
    }
}

/// Decode the request and run the pipeline.
pub fn review(
    kind: ResourceKind,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<ValidationDecision, DecodeError> {
    match request.operation {
        Operation::Create => {
            let new = PlacementObject::decode(kind, request, false)?;
            Ok(decide(&new, None))
        }
        Operation::Update => {
            let new = PlacementObject::decode(kind, request, false)?;
            let old = PlacementObject::decode(kind, request, true)?;
            Ok(decide(&new, Some(&old)))
        }
        _ => Ok(ValidationDecision::allow(format!(
            "{} operation is not validated",
            super::operation_name(&request.operation)
        ))),
    }
}

/// Run the pipeline on decoded objects. `old` is set for updates.
pub fn decide<P: Placement + ?Sized>(new: &P, old: Option<&P>) -> ValidationDecision {
    if let Some(old) = old {
        if let Some(decision) = deletion_exception(new, old) {
            return decision;
        }
        if let Some(decision) = immutability::check_placement_type(new, old) {
            return decision;
        }
        if let Some(decision) = tolerations::check_monotonic(new, old) {
            return decision;
        }
    }
    full_validation(new)
}

/// Step 1: an already-invalid stored object may only gain a deletion marker.
pub fn deletion_exception<P: Placement + ?Sized>(
    new: &P,
    old: &P,
) -> Option<ValidationDecision> {
    let err = old.validate().err()?;
    Some(if new.deletion_timestamp().is_some() {
        ValidationDecision::allow(format!(
            "allow update on old invalid v1beta1 {} with DeletionTimestamp set",
            old.abbreviation()
        ))
    } else {
        ValidationDecision::deny(format!(
            "deny update on old invalid v1beta1 {} with DeletionTimestamp not set {}",
            old.abbreviation(),
            err
        ))
    })
}

/// Step 4: static validation of the new object.
pub fn full_validation<P: Placement + ?Sized>(new: &P) -> ValidationDecision {
    match new.validate() {
        Ok(()) => ValidationDecision::allow(format!(
            "v1beta1 {} {} has valid fields",
            new.abbreviation(),
            new.placement_name()
        )),
        Err(err) => ValidationDecision::deny(format!(
            "deny create/update v1beta1 {} has invalid fields {}",
            new.abbreviation(),
            err
        )),
    }
}
