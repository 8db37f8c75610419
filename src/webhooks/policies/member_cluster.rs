//! MemberCluster policy.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};

use super::stored::{field_decision, stored_rule};
use super::{DecodeError, ValidationDecision, decode_object, operation_name};
use crate::crd::MemberCluster;
use crate::kinds::ResourceKind;

pub fn review(request: &AdmissionRequest<DynamicObject>) -> Result<ValidationDecision, DecodeError> {
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return Ok(ValidationDecision::allow(format!(
            "{} operation is not validated",
            operation_name(&request.operation)
        )));
    }

    let kind = ResourceKind::MemberCluster;
    let mc: MemberCluster = decode_object(kind, request)?;
    if let Some(decision) = stored_rule(kind, request, &mc)? {
        return Ok(decision);
    }
    Ok(field_decision(kind, &mc))
}
