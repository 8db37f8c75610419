//! Secret projection of the certificate material.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use tracing::info;

use super::{CA_CERT_FILE, CertMaterial, TLS_CERT_FILE, TLS_KEY_FILE};
use crate::FIELD_MANAGER;

const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

impl CertMaterial {
    /// Build the `kubernetes.io/tls` Secret carrying this material.
    ///
    /// Returns `None` for mounted identities: the external agent owns that
    /// secret and this process never holds the key.
    pub fn to_secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        let cert_pem = self.cert_pem()?;
        let key_pem = self.key_pem()?;

        let data = BTreeMap::from([
            (TLS_CERT_FILE.to_string(), ByteString(cert_pem.to_vec())),
            (TLS_KEY_FILE.to_string(), ByteString(key_pem.to_vec())),
            (CA_CERT_FILE.to_string(), ByteString(self.ca_pem.clone())),
        ]);

        Some(Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    "app.kubernetes.io/managed-by".to_string(),
                    FIELD_MANAGER.to_string(),
                )])),
                ..Default::default()
            },
            data: Some(data),
            type_: Some(TLS_SECRET_TYPE.to_string()),
            ..Default::default()
        })
    }
}

/// Server-side apply the certificate secret.
pub async fn apply_secret(client: &Client, secret: &Secret) -> Result<(), kube::Error> {
    let name = secret.metadata.name.clone().unwrap_or_default();
    let namespace = secret.metadata.namespace.clone().unwrap_or_default();

    let api: Api<Secret> = Api::namespaced(client.clone(), &namespace);
    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(secret),
    )
    .await?;

    info!(name = %name, namespace = %namespace, "Applied webhook certificate secret");
    Ok(())
}
