//! TLS identity for the webhook server.
//!
//! Exactly one sourcing strategy runs per process:
//! - self-signed: a CA and serving certificate are generated at start-up and
//!   written to the certificate directory
//! - cert-manager: the CA bundle and serving pair are read from a directory
//!   populated by an external certificate agent
//!
//! A failure in the selected strategy is fatal; the other strategy is never
//! tried as a fallback.

mod cert_manager;
mod secret;
mod self_signed;

pub use cert_manager::{load_external_ca, load_serving_pair};
pub use secret::apply_secret;
pub use self_signed::{CA_VALIDITY_YEARS, CERT_VALIDITY_YEARS, provision_self_signed};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::config::Config;

/// Serving certificate file name inside the certificate directory.
pub const TLS_CERT_FILE: &str = "tls.crt";
/// Serving key file name inside the certificate directory.
pub const TLS_KEY_FILE: &str = "tls.key";
/// CA bundle file name inside the certificate directory.
pub const CA_CERT_FILE: &str = "ca.crt";

/// Certificate errors
#[derive(Debug, Error)]
pub enum CertError {
    /// Key or certificate generation failed, or the result could not be persisted
    #[error("certificate generation failed: {0}")]
    CertGeneration(String),

    /// The CA file does not exist (not mounted yet)
    #[error("CA certificate not found at {}, the certificate agent may not have mounted it yet", path.display())]
    CaMissing { path: PathBuf },

    /// The CA file exists but has no content (issuer misconfigured)
    #[error("CA certificate at {} is empty, check the issuer configuration", path.display())]
    CaEmpty { path: PathBuf },

    /// The mounted serving certificate or key does not exist
    #[error("serving file not found at {}, the certificate agent may not have mounted it yet", path.display())]
    ServingFileMissing { path: PathBuf },

    /// The mounted serving certificate or key has no content
    #[error("serving file at {} is empty, check the issuer configuration", path.display())]
    ServingFileEmpty { path: PathBuf },

    /// Any other filesystem error
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Start-up provisioning errors, tagged with the strategy that failed
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to load cert-manager CA certificate: {0}")]
    CertManager(#[source] CertError),

    #[error("failed to load cert-manager serving certificate: {0}")]
    CertManagerServing(#[source] CertError),

    #[error("failed to generate self-signed certificate: {0}")]
    SelfSigned(#[source] CertError),
}

/// Where the server reads its certificate and key from.
#[derive(Clone)]
pub enum ServerIdentity {
    /// Generated in-process; handed to rustls from memory.
    Generated { cert_pem: Vec<u8>, key_pem: Vec<u8> },
    /// Mounted by an external agent; rustls reads the files.
    Mounted { cert_path: PathBuf, key_path: PathBuf },
}

impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerIdentity::Generated { cert_pem, .. } => f
                .debug_struct("Generated")
                .field("cert_pem_len", &cert_pem.len())
                .field("key_pem", &"<redacted>")
                .finish(),
            ServerIdentity::Mounted {
                cert_path,
                key_path,
            } => f
                .debug_struct("Mounted")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .finish(),
        }
    }
}

/// Provisioned TLS material: the CA bundle advertised to the API server and
/// the identity the webhook server presents.
#[derive(Clone, Debug)]
pub struct CertMaterial {
    pub ca_pem: Vec<u8>,
    pub identity: ServerIdentity,
}

impl CertMaterial {
    /// Serving certificate PEM, when generated in-process.
    pub fn cert_pem(&self) -> Option<&[u8]> {
        match &self.identity {
            ServerIdentity::Generated { cert_pem, .. } => Some(cert_pem),
            ServerIdentity::Mounted { .. } => None,
        }
    }

    /// Serving key PEM, when generated in-process.
    pub fn key_pem(&self) -> Option<&[u8]> {
        match &self.identity {
            ServerIdentity::Generated { key_pem, .. } => Some(key_pem),
            ServerIdentity::Mounted { .. } => None,
        }
    }
}

/// Run the certificate strategy selected by `config.use_cert_manager`.
pub fn provision(config: &Config) -> Result<CertMaterial, ProvisionError> {
    if config.use_cert_manager {
        let ca_pem = load_external_ca(&config.cert_dir).map_err(ProvisionError::CertManager)?;
        let identity =
            load_serving_pair(&config.cert_dir).map_err(ProvisionError::CertManagerServing)?;
        info!(
            cert_dir = %config.cert_dir.display(),
            "Loaded cert-manager CA bundle and serving certificate"
        );
        Ok(CertMaterial { ca_pem, identity })
    } else {
        let material = provision_self_signed(
            &config.service_name,
            &config.service_namespace,
            &config.webhook_cert_secret_name,
            &config.cert_dir,
        )
        .map_err(ProvisionError::SelfSigned)?;
        info!(
            cert_dir = %config.cert_dir.display(),
            service = %config.service_name,
            "Generated self-signed webhook certificate"
        );
        Ok(material)
    }
}
