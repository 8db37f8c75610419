//! Webhook configuration objects.
//!
//! [`descriptors`] builds the rule descriptors from [`Config`];
//! [`WebhookConfigurations`] turns them into the admissionregistration
//! objects the API server reads, and [`install`] applies them.

pub mod descriptors;
mod install;

pub use descriptors::{
    FailurePolicy, GUARD_RAIL_PATH, RuleOperation, RuleScope, SideEffects, WebhookRuleDescriptor,
    build_guard_rail, build_mutating, build_validating,
};
pub use install::{InstallError, install};

use std::collections::HashSet;

use k8s_openapi::ByteString;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    ValidatingWebhook, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use kube::api::ObjectMeta;
use thiserror::Error;

use crate::config::{ClientConnectionType, Config};

pub const MUTATING_CONFIGURATION_NAME: &str = "fleet-mutating-webhook-configuration";
pub const VALIDATING_CONFIGURATION_NAME: &str = "fleet-validating-webhook-configuration";
pub const GUARD_RAIL_CONFIGURATION_NAME: &str = "fleet-guard-rail-webhook-configuration";

/// Review versions the server understands.
pub const ADMISSION_REVIEW_VERSIONS: &[&str] = &["v1", "v1beta1"];

pub const MUTATING_WEBHOOK_COUNT: usize = 1;
pub const VALIDATING_WEBHOOK_COUNT: usize = 8;
pub const VALIDATING_WEBHOOK_COUNT_WITH_WORKLOAD: usize = 6;
pub const GUARD_RAIL_WEBHOOK_COUNT: usize = 6;

/// Descriptor sets that disagree with the flags they were built from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigBuildError {
    #[error("{set} webhooks: expected {expected} descriptors, built {actual}")]
    UnexpectedCount {
        set: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{set} webhooks: duplicate webhook name {name}")]
    DuplicateName { set: &'static str, name: String },
}

/// The three descriptor sets for one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookConfigurations {
    pub mutating: Vec<WebhookRuleDescriptor>,
    pub validating: Vec<WebhookRuleDescriptor>,
    pub guard_rail: Vec<WebhookRuleDescriptor>,
    /// Guard rail configuration is installed only when set.
    pub install_guard_rail: bool,
    client_connection_type: ClientConnectionType,
    service_namespace: String,
    service_name: String,
    service_port: u16,
    service_url: String,
}

impl WebhookConfigurations {
    /// Build and cross-check all descriptor sets.
    pub fn build(config: &Config) -> Result<Self, ConfigBuildError> {
        let configurations = Self {
            mutating: build_mutating(config),
            validating: build_validating(config),
            guard_rail: build_guard_rail(config),
            install_guard_rail: config.enable_guard_rail,
            client_connection_type: config.client_connection_type,
            service_namespace: config.service_namespace.clone(),
            service_name: config.service_name.clone(),
            service_port: config.service_port,
            service_url: config.service_url.clone(),
        };

        let expected_validating = if config.enable_workload {
            VALIDATING_WEBHOOK_COUNT_WITH_WORKLOAD
        } else {
            VALIDATING_WEBHOOK_COUNT
        };
        check_set("mutating", &configurations.mutating, MUTATING_WEBHOOK_COUNT)?;
        check_set("validating", &configurations.validating, expected_validating)?;
        check_set("guard rail", &configurations.guard_rail, GUARD_RAIL_WEBHOOK_COUNT)?;

        Ok(configurations)
    }

    /// Every descriptor the server must answer for, installed or not.
    pub fn all(&self) -> impl Iterator<Item = &WebhookRuleDescriptor> {
        self.mutating
            .iter()
            .chain(self.validating.iter())
            .chain(self.guard_rail.iter())
    }

    fn client_config(&self, descriptor: &WebhookRuleDescriptor) -> WebhookClientConfig {
        let ca_bundle = Some(ByteString(descriptor.ca_bundle.clone()));
        match self.client_connection_type {
            ClientConnectionType::Service => WebhookClientConfig {
                service: Some(ServiceReference {
                    namespace: self.service_namespace.clone(),
                    name: self.service_name.clone(),
                    path: Some(descriptor.path.clone()),
                    port: Some(i32::from(self.service_port)),
                }),
                ca_bundle,
                url: None,
            },
            ClientConnectionType::Url => WebhookClientConfig {
                service: None,
                ca_bundle,
                url: Some(format!("{}{}", self.service_url, descriptor.path)),
            },
        }
    }

    pub fn mutating_configuration(&self) -> MutatingWebhookConfiguration {
        MutatingWebhookConfiguration {
            metadata: metadata(MUTATING_CONFIGURATION_NAME),
            webhooks: Some(
                self.mutating
                    .iter()
                    .map(|d| MutatingWebhook {
                        name: d.name.clone(),
                        admission_review_versions: review_versions(),
                        client_config: self.client_config(d),
                        rules: Some(vec![rule(d)]),
                        failure_policy: Some(d.failure_policy.as_str().to_string()),
                        side_effects: d.side_effects.as_str().to_string(),
                        namespace_selector: d.namespace_selector.clone(),
                        timeout_seconds: d.timeout_seconds,
                        ..Default::default()
                    })
                    .collect(),
            ),
        }
    }

    pub fn validating_configuration(&self) -> ValidatingWebhookConfiguration {
        self.validating_object(VALIDATING_CONFIGURATION_NAME, &self.validating)
    }

    pub fn guard_rail_configuration(&self) -> ValidatingWebhookConfiguration {
        self.validating_object(GUARD_RAIL_CONFIGURATION_NAME, &self.guard_rail)
    }

    fn validating_object(
        &self,
        name: &str,
        descriptors: &[WebhookRuleDescriptor],
    ) -> ValidatingWebhookConfiguration {
        ValidatingWebhookConfiguration {
            metadata: metadata(name),
            webhooks: Some(
                descriptors
                    .iter()
                    .map(|d| ValidatingWebhook {
                        name: d.name.clone(),
                        admission_review_versions: review_versions(),
                        client_config: self.client_config(d),
                        rules: Some(vec![rule(d)]),
                        failure_policy: Some(d.failure_policy.as_str().to_string()),
                        side_effects: d.side_effects.as_str().to_string(),
                        namespace_selector: d.namespace_selector.clone(),
                        timeout_seconds: d.timeout_seconds,
                        ..Default::default()
                    })
                    .collect(),
            ),
        }
    }
}

fn check_set(
    set: &'static str,
    descriptors: &[WebhookRuleDescriptor],
    expected: usize,
) -> Result<(), ConfigBuildError> {
    if descriptors.len() != expected {
        return Err(ConfigBuildError::UnexpectedCount {
            set,
            expected,
            actual: descriptors.len(),
        });
    }
    let mut seen = HashSet::new();
    for d in descriptors {
        if !seen.insert(d.name.as_str()) {
            return Err(ConfigBuildError::DuplicateName {
                set,
                name: d.name.clone(),
            });
        }
    }
    Ok(())
}

fn metadata(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        labels: Some(
            [(
                "app.kubernetes.io/managed-by".to_string(),
                crate::FIELD_MANAGER.to_string(),
            )]
            .into(),
        ),
        ..Default::default()
    }
}

fn review_versions() -> Vec<String> {
    ADMISSION_REVIEW_VERSIONS
        .iter()
        .map(|v| v.to_string())
        .collect()
}

fn rule(d: &WebhookRuleDescriptor) -> RuleWithOperations {
    RuleWithOperations {
        api_groups: Some(d.api_groups.clone()),
        api_versions: Some(d.api_versions.clone()),
        resources: Some(d.resources.clone()),
        operations: Some(d.operations.iter().map(|o| o.as_str().to_string()).collect()),
        scope: Some(d.scope.as_str().to_string()),
    }
}
