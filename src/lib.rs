//! fleet-webhook library crate
//!
//! Admission control for a multi-cluster fleet hub: certificate
//! provisioning, webhook configuration manifests, the validation engine and
//! the HTTPS server that routes admission reviews to it.

pub mod certs;
pub mod config;
pub mod crd;
pub mod health;
pub mod kinds;
pub mod manifests;
pub mod validator;
pub mod webhooks;

pub use certs::{CertError, CertMaterial, ProvisionError, ServerIdentity, provision};
pub use config::{ClientConnectionType, Config, ConfigError, WebhookOptions};
pub use health::HealthState;
pub use kinds::ResourceKind;
pub use manifests::{ConfigBuildError, InstallError, WebhookConfigurations, install};
pub use webhooks::{
    RoutingTable, ValidationEngine, WebhookError, WebhookState, create_webhook_router,
    run_webhook_server,
};

/// Field manager for every object this crate applies.
pub const FIELD_MANAGER: &str = "fleet-webhook";
