//! Immutability policy.
//!
//! Only enforced on UPDATE operations.
//!
//! Validates:
//! - The placement type cannot be changed after creation (an absent policy
//!   counts as `PickAll`)

use super::ValidationDecision;
use super::placement::Placement;

pub const PLACEMENT_TYPE_IMMUTABLE: &str = "placement type is immutable";

/// Deny when the effective placement type differs between old and new.
pub fn check_placement_type<P: Placement + ?Sized>(
    new: &P,
    old: &P,
) -> Option<ValidationDecision> {
    let old_type = old.placement_spec().placement_type();
    let new_type = new.placement_spec().placement_type();
    (old_type != new_type).then(|| {
        ValidationDecision::deny(format!(
            "{}: {} {} changed from {} to {}",
            PLACEMENT_TYPE_IMMUTABLE,
            new.abbreviation(),
            new.placement_name(),
            old_type,
            new_type
        ))
    })
}
