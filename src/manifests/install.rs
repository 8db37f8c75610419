//! Server-side apply of the webhook configurations.

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::Client;
use thiserror::Error;
use tracing::{debug, info};

use super::{GUARD_RAIL_CONFIGURATION_NAME, WebhookConfigurations};
use crate::FIELD_MANAGER;

/// Errors while applying webhook configurations or the certificate secret
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to apply {kind} {name}: {source}")]
    Apply {
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to remove {kind} {name}: {source}")]
    Remove {
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Apply the mutating, validating and (when enabled) guard rail
/// configurations. A guard rail configuration left over from an earlier
/// run with the flag set is removed when the flag is off.
pub async fn install(
    client: &Client,
    configurations: &WebhookConfigurations,
) -> Result<(), InstallError> {
    let params = PatchParams::apply(FIELD_MANAGER).force();

    let mutating_api: Api<MutatingWebhookConfiguration> = Api::all(client.clone());
    let mutating = configurations.mutating_configuration();
    let name = mutating.metadata.name.clone().unwrap_or_default();
    mutating_api
        .patch(&name, &params, &Patch::Apply(&mutating))
        .await
        .map_err(|source| InstallError::Apply {
            kind: "MutatingWebhookConfiguration",
            name: name.clone(),
            source,
        })?;
    info!(name = %name, webhooks = configurations.mutating.len(), "Applied webhook configuration");

    let validating_api: Api<ValidatingWebhookConfiguration> = Api::all(client.clone());
    let mut validating = vec![configurations.validating_configuration()];
    if configurations.install_guard_rail {
        validating.push(configurations.guard_rail_configuration());
    }
    for object in &validating {
        let name = object.metadata.name.clone().unwrap_or_default();
        validating_api
            .patch(&name, &params, &Patch::Apply(object))
            .await
            .map_err(|source| InstallError::Apply {
                kind: "ValidatingWebhookConfiguration",
                name: name.clone(),
                source,
            })?;
        info!(
            name = %name,
            webhooks = object.webhooks.as_ref().map_or(0, Vec::len),
            "Applied webhook configuration"
        );
    }

    if !configurations.install_guard_rail {
        match validating_api
            .delete(GUARD_RAIL_CONFIGURATION_NAME, &DeleteParams::default())
            .await
        {
            Ok(_) => info!(
                name = GUARD_RAIL_CONFIGURATION_NAME,
                "Removed guard rail webhook configuration"
            ),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("Guard rail webhook configuration not present");
            }
            Err(source) => {
                return Err(InstallError::Remove {
                    kind: "ValidatingWebhookConfiguration",
                    name: GUARD_RAIL_CONFIGURATION_NAME.to_string(),
                    source,
                });
            }
        }
    }

    Ok(())
}
