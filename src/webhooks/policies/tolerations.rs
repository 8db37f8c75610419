//! Toleration monotonicity.
//!
//! Tolerations may only be added once a placement exists: every old
//! toleration must appear, unchanged, in the new list. Order is ignored and
//! entries are compared by whole-value equality.

use super::ValidationDecision;
use super::placement::Placement;
use crate::crd::Toleration;

pub const TOLERATIONS_ADDITIVE_ONLY: &str =
    "tolerations have been updated/deleted, only additions to tolerations are allowed";

/// Old tolerations missing from `new`, in their original order.
pub fn removed_or_changed<'a>(old: &'a [Toleration], new: &[Toleration]) -> Vec<&'a Toleration> {
    old.iter().filter(|t| !new.contains(t)).collect()
}

/// Deny when any old toleration was removed or altered.
pub fn check_monotonic<P: Placement + ?Sized>(new: &P, old: &P) -> Option<ValidationDecision> {
    let missing = removed_or_changed(
        old.placement_spec().tolerations(),
        new.placement_spec().tolerations(),
    );
    if missing.is_empty() {
        return None;
    }
    let missing: Vec<String> = missing.iter().map(|t| t.to_string()).collect();
    Some(ValidationDecision::deny(format!(
        "{}: {} {} no longer has [{}]",
        TOLERATIONS_ADDITIVE_ONLY,
        new.abbreviation(),
        new.placement_name(),
        missing.join(", ")
    )))
}
