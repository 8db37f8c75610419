//! Placement admission scenarios through the router.

use axum::http::StatusCode;
use serde_json::json;

use fleet_webhook::crd::PlacementType;
use fleet_webhook::kinds::ResourceKind;
use fleet_webhook::webhooks::MALFORMED_REQUEST;

use crate::common::fixtures::{
    PlacementBuilder, ReviewBuilder, config_map_selector, namespace_selector, test_config,
    toleration,
};
use crate::{Harness, allowed, message};

fn crp_path() -> String {
    ResourceKind::ClusterResourcePlacement.validation_path()
}

#[tokio::test]
async fn test_create_valid_placement_allowed() {
    let harness = Harness::new(&test_config());
    let review = ReviewBuilder::crp()
        .uid("scenario-a")
        .create(PlacementBuilder::new("app-crp").crp_json())
        .build();

    let (status, response) = harness.post(&crp_path(), review).await;
    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&response));
    assert_eq!(response["uid"], json!("scenario-a"));
}

#[tokio::test]
async fn test_placement_type_change_denied() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("app-crp")
        .placement_type(PlacementType::PickN)
        .number_of_clusters(2)
        .crp_json();
    let new = PlacementBuilder::new("app-crp")
        .placement_type(PlacementType::PickFixed)
        .cluster_name("member-1")
        .crp_json();
    let review = ReviewBuilder::crp().update(old, new).build();

    let (status, response) = harness.post(&crp_path(), review).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!allowed(&response));
    assert!(message(&response).contains("placement type is immutable"));
}

#[tokio::test]
async fn test_invalid_stored_placement_may_be_deleted() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("broken").selectors(Vec::new()).crp_json();
    let new = PlacementBuilder::new("broken")
        .selectors(Vec::new())
        .deleting()
        .crp_json();
    let review = ReviewBuilder::crp().update(old, new).build();

    let (_, response) = harness.post(&crp_path(), review).await;
    assert!(allowed(&response));
}

#[tokio::test]
async fn test_invalid_stored_placement_cannot_be_edited() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("broken").selectors(Vec::new()).crp_json();
    let new = PlacementBuilder::new("broken")
        .selectors(vec![namespace_selector("app")])
        .crp_json();
    let review = ReviewBuilder::crp().update(old, new).build();

    let (_, response) = harness.post(&crp_path(), review).await;
    assert!(!allowed(&response));
    assert!(message(&response).contains("DeletionTimestamp not set"));
}

fn member_cluster(heartbeat: i32, deleting: bool) -> serde_json::Value {
    let mut member = json!({
        "apiVersion": "cluster.kubernetes-fleet.io/v1beta1",
        "kind": "MemberCluster",
        "metadata": {"name": "legacy-member", "finalizers": []},
        "spec": {
            "identity": {"kind": "ServiceAccount", "name": "agent", "namespace": "fleet-system"},
            "heartbeatPeriodSeconds": heartbeat
        }
    });
    if deleting {
        member["metadata"]["deletionTimestamp"] = json!("2024-01-01T00:00:00Z");
    }
    member
}

#[tokio::test]
async fn test_invalid_stored_member_cluster_may_finish_deleting() {
    let harness = Harness::new(&test_config());
    let path = ResourceKind::MemberCluster.validation_path();
    let builder = || {
        ReviewBuilder::new(
            "cluster.kubernetes-fleet.io",
            "v1beta1",
            "MemberCluster",
            "memberclusters",
        )
    };

    let review = builder()
        .update(member_cluster(0, true), member_cluster(0, true))
        .build();
    let (status, response) = harness.post(&path, review).await;
    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&response), "{}", message(&response));

    let review = builder()
        .update(member_cluster(0, false), member_cluster(30, false))
        .build();
    let (_, response) = harness.post(&path, review).await;
    assert!(!allowed(&response));
    assert!(message(&response).contains("DeletionTimestamp not set"));
}

#[tokio::test]
async fn test_toleration_removal_denied() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("app-crp")
        .toleration(toleration("env", "prod"))
        .toleration(toleration("tier", "gold"))
        .crp_json();
    let new = PlacementBuilder::new("app-crp")
        .toleration(toleration("env", "prod"))
        .crp_json();
    let review = ReviewBuilder::crp().update(old, new).build();

    let (_, response) = harness.post(&crp_path(), review).await;
    assert!(!allowed(&response));
    assert!(message(&response).contains("only additions to tolerations are allowed"));
}

#[tokio::test]
async fn test_toleration_addition_allowed() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("app-crp")
        .toleration(toleration("env", "prod"))
        .crp_json();
    let new = PlacementBuilder::new("app-crp")
        .toleration(toleration("tier", "gold"))
        .toleration(toleration("env", "prod"))
        .crp_json();
    let review = ReviewBuilder::crp().update(old, new).build();

    let (_, response) = harness.post(&crp_path(), review).await;
    assert!(allowed(&response));
}

#[tokio::test]
async fn test_resource_placement_has_its_own_path() {
    let harness = Harness::new(&test_config());
    let path = ResourceKind::ResourcePlacement.validation_path();
    assert_ne!(path, crp_path());

    let valid = ReviewBuilder::rp()
        .create(
            PlacementBuilder::new("app-rp")
                .namespace("app")
                .selectors(vec![config_map_selector("settings")])
                .rp_json(),
        )
        .build();
    let (_, response) = harness.post(&path, valid).await;
    assert!(allowed(&response));

    let cluster_scoped = ReviewBuilder::rp()
        .create(PlacementBuilder::new("app-rp").namespace("app").rp_json())
        .build();
    let (_, response) = harness.post(&path, cluster_scoped).await;
    assert!(!allowed(&response));
    assert!(message(&response).contains("RP"));
}

#[tokio::test]
async fn test_malformed_object_is_bad_request() {
    let harness = Harness::new(&test_config());
    let review = ReviewBuilder::crp()
        .uid("malformed")
        .create(json!({
            "apiVersion": "placement.kubernetes-fleet.io/v1beta1",
            "kind": "ClusterResourcePlacement",
            "metadata": {"name": "app-crp"},
            "spec": {"resourceSelectors": 42}
        }))
        .build();

    let (status, response) = harness.post(&crp_path(), review).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!allowed(&response));
    assert_eq!(response["uid"], json!("malformed"));
    assert_eq!(message(&response), MALFORMED_REQUEST);

    let metrics = harness.health.metrics.encode();
    assert!(metrics.contains("fleet_webhook_decode_errors"));
    assert!(harness.audit.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_allowed_without_object() {
    let harness = Harness::new(&test_config());
    let review = ReviewBuilder::crp()
        .delete(PlacementBuilder::new("app-crp").crp_json())
        .build();

    let (status, response) = harness.post(&crp_path(), review).await;
    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&response));
}

#[tokio::test]
async fn test_defaulting_returns_json_patch() {
    let harness = Harness::new(&test_config());
    let path = ResourceKind::ClusterResourcePlacement.mutation_path();
    let review = ReviewBuilder::crp()
        .create(PlacementBuilder::new("app-crp").crp_json())
        .build();

    let (status, response) = harness.post(&path, review).await;
    assert_eq!(status, StatusCode::OK);
    assert!(allowed(&response));
    assert_eq!(response["patchType"], json!("JSONPatch"));
    assert!(response["patch"].is_string());
}

#[tokio::test]
async fn test_decisions_are_audited_and_counted() {
    let harness = Harness::new(&test_config());
    let old = PlacementBuilder::new("app-crp")
        .placement_type(PlacementType::PickAll)
        .crp_json();
    let new = PlacementBuilder::new("app-crp")
        .placement_type(PlacementType::PickN)
        .number_of_clusters(1)
        .crp_json();
    let review = ReviewBuilder::crp()
        .user("bob", &["system:authenticated", "devs"])
        .update(old, new)
        .build();
    harness.post(&crp_path(), review).await;

    let entries = harness.audit.0.lock().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.kind, "ClusterResourcePlacement");
    assert_eq!(entry.operation, "UPDATE");
    assert_eq!(entry.name, "app-crp");
    assert_eq!(entry.user, "bob");
    assert_eq!(entry.groups, vec!["system:authenticated", "devs"]);
    assert!(!entry.allowed);

    let metrics = harness.health.metrics.encode();
    assert!(metrics.contains("outcome=\"denied\""));
}

#[tokio::test]
async fn test_workload_validators_follow_flag() {
    let pod = ReviewBuilder::new("", "v1", "Pod", "pods")
        .create(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "namespace": "app"}
        }))
        .build();

    let harness = Harness::new(&test_config());
    let (_, response) = harness.post("/validate-v1-pod", pod.clone()).await;
    assert!(!allowed(&response));

    let mut config = test_config();
    config.enable_workload = true;
    let harness = Harness::new(&config);
    let (status, _) = harness.post("/validate-v1-pod", pod).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
