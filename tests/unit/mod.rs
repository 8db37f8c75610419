// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for fleet-webhook.
//!
//! These tests run without a Kubernetes cluster and exercise the public API
//! of each component in isolation.

#[path = "../common/mod.rs"]
mod common;

mod config_tests {
    use clap::Parser;
    use fleet_webhook::config::{ClientConnectionType, Config, ConfigError, WebhookOptions};

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        webhook: WebhookOptions,
    }

    fn parse(args: &[&str]) -> WebhookOptions {
        let mut argv = vec!["fleet-webhook"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().webhook
    }

    #[test]
    fn test_url_connection_config() {
        let opts = parse(&[
            "--webhook-service-name",
            "test-url",
            "--webhook-port",
            "8080",
            "--webhook-client-connection-type",
            "url",
            "--enable-guard-rail",
        ]);
        let config = Config::from_options(&opts, "fleet-system").unwrap();
        assert_eq!(config.client_connection_type, ClientConnectionType::Url);
        assert_eq!(config.service_url, "https://test-url.fleet-system.svc:8080");
        assert!(config.enable_guard_rail);
        assert!(!config.enable_workload);
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let opts = parse(&[]);
        assert!(matches!(
            Config::from_options(&opts, ""),
            Err(ConfigError::MissingNamespace)
        ));
    }

    #[test]
    fn test_debug_redacts_ca() {
        let opts = parse(&[]);
        let config = Config::from_options(&opts, "fleet-system")
            .unwrap()
            .with_ca_pem(b"-----BEGIN CERTIFICATE-----secret".to_vec());
        assert!(!format!("{:?}", config).contains("BEGIN CERTIFICATE"));
    }
}

mod manifest_tests {
    use fleet_webhook::config::ClientConnectionType;
    use fleet_webhook::manifests::{
        GUARD_RAIL_PATH, MUTATING_WEBHOOK_COUNT, VALIDATING_WEBHOOK_COUNT,
        VALIDATING_WEBHOOK_COUNT_WITH_WORKLOAD, WebhookConfigurations, build_guard_rail,
        build_mutating, build_validating,
    };

    use crate::common::fixtures::test_config;

    #[test]
    fn test_descriptor_counts() {
        let mut config = test_config();
        assert_eq!(build_mutating(&config).len(), MUTATING_WEBHOOK_COUNT);
        assert_eq!(build_validating(&config).len(), VALIDATING_WEBHOOK_COUNT);
        assert_eq!(build_guard_rail(&config).len(), 6);

        config.enable_workload = true;
        assert_eq!(
            build_validating(&config).len(),
            VALIDATING_WEBHOOK_COUNT_WITH_WORKLOAD
        );
        assert_eq!(build_mutating(&config).len(), 1);
        assert_eq!(build_guard_rail(&config).len(), 6);
    }

    #[test]
    fn test_url_client_config() {
        let mut config = test_config();
        config.client_connection_type = ClientConnectionType::Url;
        config.service_url = "test-url".to_string();
        let configurations = WebhookConfigurations::build(&config).unwrap();

        let guard_rail = configurations.guard_rail_configuration();
        for webhook in guard_rail.webhooks.unwrap() {
            assert_eq!(
                webhook.client_config.url.as_deref(),
                Some(format!("test-url{}", GUARD_RAIL_PATH).as_str())
            );
            assert!(webhook.client_config.service.is_none());
        }
    }

    #[test]
    fn test_ca_bundle_propagates() {
        let configurations = WebhookConfigurations::build(&test_config()).unwrap();
        let validating = configurations.validating_configuration();
        for webhook in validating.webhooks.unwrap() {
            assert_eq!(
                webhook.client_config.ca_bundle.unwrap().0,
                b"test-ca".to_vec()
            );
        }
    }
}

mod cert_tests {
    use fleet_webhook::certs::{CertError, ProvisionError, load_external_ca, provision};

    use crate::common::fixtures::test_config;

    #[test]
    fn test_missing_and_empty_ca() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_external_ca(dir.path()).unwrap_err();
        assert!(matches!(err, CertError::CaMissing { .. }));
        assert!(err.to_string().contains("not found"));

        std::fs::write(dir.path().join("ca.crt"), b"").unwrap();
        let err = load_external_ca(dir.path()).unwrap_err();
        assert!(err.to_string().contains("empty"));

        std::fs::write(dir.path().join("ca.crt"), b"ca-bytes").unwrap();
        assert_eq!(load_external_ca(dir.path()).unwrap(), b"ca-bytes".to_vec());
    }

    #[test]
    fn test_provision_selects_one_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.cert_dir = dir.path().join("certs");
        config.use_cert_manager = true;

        let err = provision(&config).unwrap_err();
        assert!(matches!(err, ProvisionError::CertManager(_)));
        assert!(
            err.to_string()
                .contains("failed to load cert-manager CA certificate")
        );
        assert!(!config.cert_dir.join("tls.crt").exists());

        config.use_cert_manager = false;
        let material = provision(&config).unwrap();
        assert!(!material.ca_pem.is_empty());
        assert!(material.cert_pem().is_some());
        assert!(config.cert_dir.join("tls.crt").exists());
        assert!(config.cert_dir.join("tls.key").exists());
    }

    #[test]
    fn test_cert_manager_requires_serving_pair() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.cert_dir = dir.path().to_path_buf();
        config.use_cert_manager = true;
        std::fs::write(dir.path().join("ca.crt"), b"ca-bytes").unwrap();

        let err = provision(&config).unwrap_err();
        assert!(matches!(err, ProvisionError::CertManagerServing(_)));
        assert!(err.to_string().contains("tls.crt"));

        std::fs::write(dir.path().join("tls.crt"), b"cert").unwrap();
        let err = provision(&config).unwrap_err();
        assert!(err.to_string().contains("tls.key"));

        std::fs::write(dir.path().join("tls.key"), b"key").unwrap();
        let material = provision(&config).unwrap();
        assert_eq!(material.ca_pem, b"ca-bytes".to_vec());
        assert!(material.cert_pem().is_none());
    }
}

mod kind_tests {
    use fleet_webhook::kinds::ResourceKind;

    #[test]
    fn test_paths() {
        assert_eq!(
            ResourceKind::ClusterResourcePlacement.validation_path(),
            "/validate-placement-kubernetes-fleet-io-v1beta1-clusterresourceplacement"
        );
        assert_eq!(
            ResourceKind::ClusterResourcePlacement.mutation_path(),
            "/mutate-placement-kubernetes-fleet-io-v1beta1-clusterresourceplacement"
        );
        assert_eq!(ResourceKind::ReplicaSet.validation_path(), "/validate-apps-v1-replicaset");
    }
}

mod policy_tests {
    use fleet_webhook::crd::PlacementType;
    use fleet_webhook::webhooks::policies::placement::decide;
    use fleet_webhook::webhooks::policies::tolerations::TOLERATIONS_ADDITIVE_ONLY;

    use crate::common::fixtures::{PlacementBuilder, toleration};

    #[test]
    fn test_create_valid() {
        let crp = PlacementBuilder::new("app").build_crp();
        assert!(decide(&crp, None).allowed);
    }

    #[test]
    fn test_changed_toleration_denied() {
        let old = PlacementBuilder::new("app")
            .placement_type(PlacementType::PickAll)
            .toleration(toleration("env", "prod"))
            .build_crp();
        let new = PlacementBuilder::new("app")
            .placement_type(PlacementType::PickAll)
            .toleration(toleration("env", "staging"))
            .build_crp();
        let decision = decide(&new, Some(&old));
        assert!(!decision.allowed);
        assert!(decision.reason.contains(TOLERATIONS_ADDITIVE_ONLY));
    }
}
