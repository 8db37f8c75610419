// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for fleet-webhook.
//!
//! Uses proptest to generate random inputs and verify invariants.

#[path = "../common/mod.rs"]
mod common;

use proptest::prelude::*;

use fleet_webhook::config::ClientConnectionType;
use fleet_webhook::crd::{PlacementType, Toleration, TolerationOperator};
use fleet_webhook::manifests::{WebhookConfigurations, build_guard_rail, build_validating};
use fleet_webhook::webhooks::RoutingTable;
use fleet_webhook::webhooks::policies::placement::decide;
use fleet_webhook::webhooks::policies::tolerations::removed_or_changed;

use common::fixtures::{PlacementBuilder, test_config};

/// Strategy for generating well-formed tolerations.
fn any_toleration() -> impl Strategy<Value = Toleration> {
    (
        "[a-z]{1,8}",
        prop_oneof![Just(TolerationOperator::Equal), Just(TolerationOperator::Exists)],
        "[a-z0-9]{1,8}",
        prop_oneof![Just(None), Just(Some("NoSchedule".to_string()))],
    )
        .prop_map(|(key, operator, value, effect)| Toleration {
            key,
            value: if operator == TolerationOperator::Exists {
                String::new()
            } else {
                value
            },
            operator,
            effect,
        })
}

/// Unique tolerations (duplicates are rejected by static validation).
fn toleration_set() -> impl Strategy<Value = Vec<Toleration>> {
    prop::collection::hash_set(any_toleration(), 0..6).prop_map(|s| s.into_iter().collect())
}

fn any_connection_type() -> impl Strategy<Value = ClientConnectionType> {
    prop_oneof![
        Just(ClientConnectionType::Service),
        Just(ClientConnectionType::Url)
    ]
}

proptest! {
    /// Property: descriptor builders are pure and counts depend only on flags
    #[test]
    fn builders_are_deterministic(
        enable_workload in any::<bool>(),
        enable_guard_rail in any::<bool>(),
        deny_labels in any::<bool>(),
        connection in any_connection_type(),
        port in 1u16..=65535,
    ) {
        let mut config = test_config();
        config.enable_workload = enable_workload;
        config.enable_guard_rail = enable_guard_rail;
        config.deny_modify_member_cluster_labels = deny_labels;
        config.client_connection_type = connection;
        config.service_port = port;

        let first = WebhookConfigurations::build(&config).unwrap();
        let second = WebhookConfigurations::build(&config).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.mutating_configuration(), second.mutating_configuration());
        prop_assert_eq!(first.validating_configuration(), second.validating_configuration());

        prop_assert_eq!(build_validating(&config).len(), if enable_workload { 6 } else { 8 });
        prop_assert_eq!(build_guard_rail(&config).len(), 6);
        prop_assert_eq!(first.install_guard_rail, enable_guard_rail);
    }

    /// Property: every installed path has a route
    #[test]
    fn every_descriptor_is_routed(enable_workload in any::<bool>()) {
        let mut config = test_config();
        config.enable_workload = enable_workload;
        let configurations = WebhookConfigurations::build(&config).unwrap();
        let routes = RoutingTable::from_config(&config);
        for descriptor in configurations.all() {
            prop_assert_eq!(routes.get(&descriptor.path), Some(descriptor.handler));
        }
    }

    /// Property: adding tolerations never trips monotonicity
    #[test]
    fn additions_are_monotonic(old in toleration_set(), extra in toleration_set()) {
        let mut new: Vec<Toleration> = extra;
        new.extend(old.iter().cloned());
        prop_assert!(removed_or_changed(&old, &new).is_empty());
    }

    /// Property: removing any old toleration is reported
    #[test]
    fn removals_are_detected(old in toleration_set(), index in any::<prop::sample::Index>()) {
        prop_assume!(!old.is_empty());
        let removed = index.index(old.len());
        let new: Vec<Toleration> = old
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != removed)
            .map(|(_, t)| t.clone())
            .collect();
        let missing = removed_or_changed(&old, &new);
        prop_assert_eq!(missing, vec![&old[removed]]);
    }

    /// Property: a placement type change is always denied
    #[test]
    fn placement_type_is_immutable(
        from in prop_oneof![Just(PlacementType::PickAll), Just(PlacementType::PickN)],
        to in prop_oneof![Just(PlacementType::PickAll), Just(PlacementType::PickN)],
    ) {
        let build = |t: PlacementType| {
            let builder = PlacementBuilder::new("app").placement_type(t);
            match t {
                PlacementType::PickN => builder.number_of_clusters(1).build_crp(),
                _ => builder.build_crp(),
            }
        };
        let decision = decide(&build(to), Some(&build(from)));
        prop_assert_eq!(decision.allowed, from == to);
    }
}
