//! Path to handler bindings.
//!
//! The routing table is derived from the same descriptor sets that are
//! installed in the API server, so every installed path has a handler.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::kinds::ResourceKind;
use crate::manifests::{WebhookConfigurations, build_guard_rail, build_mutating, build_validating};

/// What a webhook path does with a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handler {
    Validate(ResourceKind),
    Mutate(ResourceKind),
    GuardRail,
}

/// Distinct webhook paths and their handlers, in path order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<String, Handler>,
}

impl RoutingTable {
    pub fn from_config(config: &Config) -> Self {
        build_mutating(config)
            .into_iter()
            .chain(build_validating(config))
            .chain(build_guard_rail(config))
            .map(|d| (d.path, d.handler))
            .collect()
    }

    pub fn from_configurations(configurations: &WebhookConfigurations) -> Self {
        configurations
            .all()
            .map(|d| (d.path.clone(), d.handler))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<Handler> {
        self.routes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Handler)> {
        self.routes.iter().map(|(path, handler)| (path.as_str(), *handler))
    }
}

impl FromIterator<(String, Handler)> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = (String, Handler)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}
