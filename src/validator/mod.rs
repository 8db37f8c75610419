//! Static validation rules for fleet resources.
//!
//! Each validator checks a single object in isolation (no old object, no API
//! lookups) and reports every violation it finds, aggregated into one
//! [`ValidationError`].

mod fields;
mod member_cluster;
mod placement;
mod placement_companions;

pub use fields::{is_qualified_name, parse_percent};
pub use member_cluster::validate_member_cluster;
pub use placement::{validate_cluster_resource_placement, validate_resource_placement};
pub use placement_companions::{
    validate_cluster_resource_override, validate_disruption_budget, validate_eviction,
};

use std::fmt;

/// Aggregated field-level violations of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<String>,
}

impl ValidationError {
    /// All individual violations, in discovery order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [single] => write!(f, "{}", single),
            many => write!(f, "[{}]", many.join(", ")),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Collects violations while walking an object.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors: self.0 })
        }
    }
}
