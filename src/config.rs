//! Process configuration.
//!
//! Command-line flags (with environment fallbacks) are parsed by clap into
//! [`WebhookOptions`]; [`Config::from_options`] turns them into the immutable
//! [`Config`] the rest of the crate reads. The CA bundle is attached once
//! certificate provisioning has run.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use thiserror::Error;

/// Environment variable carrying the pod namespace (downward API).
pub const POD_NAMESPACE_ENV: &str = "POD_NAMESPACE";

/// Default webhook service name.
pub const DEFAULT_SERVICE_NAME: &str = "fleetwebhook";
/// Default webhook port.
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;
/// Default certificate directory.
pub const DEFAULT_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";
/// Default name of the secret holding the webhook certificate.
pub const DEFAULT_CERT_SECRET_NAME: &str = "fleet-webhook-server-cert";
/// Default health/metrics port.
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// How the API server reaches the webhook.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ClientConnectionType {
    /// Through the in-cluster service reference.
    #[default]
    #[value(name = "service")]
    Service,
    /// Through an explicit URL.
    #[value(name = "url")]
    Url,
}

impl fmt::Display for ClientConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientConnectionType::Service => write!(f, "service"),
            ClientConnectionType::Url => write!(f, "url"),
        }
    }
}

/// Webhook flags.
#[derive(Args, Clone, Debug)]
pub struct WebhookOptions {
    /// Name of the Service fronting the webhook server
    #[arg(long, env = "WEBHOOK_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
    pub webhook_service_name: String,

    /// Port the webhook server listens on and the Service exposes
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    pub webhook_port: u16,

    /// How the API server connects to the webhook
    #[arg(
        long,
        env = "WEBHOOK_CLIENT_CONNECTION_TYPE",
        value_enum,
        default_value_t = ClientConnectionType::Service
    )]
    pub webhook_client_connection_type: ClientConnectionType,

    /// Directory holding tls.crt, tls.key and ca.crt
    #[arg(long, env = "WEBHOOK_CERT_DIR", default_value = DEFAULT_CERT_DIR)]
    pub cert_dir: PathBuf,

    /// Install the guard rail webhook configuration
    #[arg(long, env = "ENABLE_GUARD_RAIL")]
    pub enable_guard_rail: bool,

    /// Deny label changes on MemberCluster objects by non-privileged users
    #[arg(long, env = "DENY_MODIFY_MEMBER_CLUSTER_LABELS")]
    pub deny_modify_member_cluster_labels: bool,

    /// Allow workloads (pods, replicasets) to run on the hub cluster
    #[arg(long, env = "ENABLE_WORKLOAD")]
    pub enable_workload: bool,

    /// Read the CA bundle from cert-manager instead of self-signing
    #[arg(long, env = "USE_CERT_MANAGER")]
    pub use_cert_manager: bool,

    /// Secret the webhook certificate is stored in
    #[arg(long, env = "WEBHOOK_CERT_SECRET_NAME", default_value = DEFAULT_CERT_SECRET_NAME)]
    pub webhook_cert_secret_name: String,

    /// Users allowed through the guard rail (comma separated)
    #[arg(long, env = "WHITELISTED_USERS", value_delimiter = ',')]
    pub whitelisted_users: Vec<String>,

    /// Port for /healthz, /readyz and /metrics
    #[arg(long, env = "HEALTH_PORT", default_value_t = DEFAULT_HEALTH_PORT)]
    pub health_port: u16,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{POD_NAMESPACE_ENV} is not set; the webhook must run in a namespace")]
    MissingNamespace,

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Immutable webhook configuration.
///
/// `ca_pem` is excluded from equality and redacted from `Debug`.
#[derive(Clone)]
pub struct Config {
    pub service_namespace: String,
    pub service_name: String,
    pub service_port: u16,
    pub service_url: String,
    pub client_connection_type: ClientConnectionType,
    pub enable_guard_rail: bool,
    pub deny_modify_member_cluster_labels: bool,
    pub enable_workload: bool,
    pub use_cert_manager: bool,
    pub cert_dir: PathBuf,
    pub webhook_cert_secret_name: String,
    pub whitelisted_users: Vec<String>,
    pub ca_pem: Vec<u8>,
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.service_namespace == other.service_namespace
            && self.service_name == other.service_name
            && self.service_port == other.service_port
            && self.service_url == other.service_url
            && self.client_connection_type == other.client_connection_type
            && self.enable_guard_rail == other.enable_guard_rail
            && self.deny_modify_member_cluster_labels == other.deny_modify_member_cluster_labels
            && self.enable_workload == other.enable_workload
            && self.use_cert_manager == other.use_cert_manager
            && self.cert_dir == other.cert_dir
            && self.webhook_cert_secret_name == other.webhook_cert_secret_name
            && self.whitelisted_users == other.whitelisted_users
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("service_namespace", &self.service_namespace)
            .field("service_name", &self.service_name)
            .field("service_port", &self.service_port)
            .field("service_url", &self.service_url)
            .field("client_connection_type", &self.client_connection_type)
            .field("enable_guard_rail", &self.enable_guard_rail)
            .field(
                "deny_modify_member_cluster_labels",
                &self.deny_modify_member_cluster_labels,
            )
            .field("enable_workload", &self.enable_workload)
            .field("use_cert_manager", &self.use_cert_manager)
            .field("cert_dir", &self.cert_dir)
            .field("webhook_cert_secret_name", &self.webhook_cert_secret_name)
            .field("whitelisted_users", &self.whitelisted_users)
            .field("ca_pem", &format_args!("<{} bytes>", self.ca_pem.len()))
            .finish()
    }
}

/// `https://{service}.{namespace}.svc:{port}`
pub fn service_url(service_name: &str, namespace: &str, port: u16) -> String {
    format!("https://{}.{}.svc:{}", service_name, namespace, port)
}

impl Config {
    /// Build the configuration for `namespace` from parsed flags.
    pub fn from_options(opts: &WebhookOptions, namespace: &str) -> Result<Self, ConfigError> {
        if namespace.is_empty() {
            return Err(ConfigError::MissingNamespace);
        }
        if opts.webhook_service_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "webhook-service-name",
                message: "must not be empty".to_string(),
            });
        }
        if opts.webhook_port == 0 {
            return Err(ConfigError::Invalid {
                field: "webhook-port",
                message: "must be non-zero".to_string(),
            });
        }
        if opts.webhook_cert_secret_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "webhook-cert-secret-name",
                message: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            service_namespace: namespace.to_string(),
            service_name: opts.webhook_service_name.clone(),
            service_port: opts.webhook_port,
            service_url: service_url(&opts.webhook_service_name, namespace, opts.webhook_port),
            client_connection_type: opts.webhook_client_connection_type,
            enable_guard_rail: opts.enable_guard_rail,
            deny_modify_member_cluster_labels: opts.deny_modify_member_cluster_labels,
            enable_workload: opts.enable_workload,
            use_cert_manager: opts.use_cert_manager,
            cert_dir: opts.cert_dir.clone(),
            webhook_cert_secret_name: opts.webhook_cert_secret_name.clone(),
            whitelisted_users: opts
                .whitelisted_users
                .iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            ca_pem: Vec::new(),
        })
    }

    /// Build the configuration with the namespace read from `POD_NAMESPACE`.
    pub fn from_env(opts: &WebhookOptions) -> Result<Self, ConfigError> {
        let namespace =
            std::env::var(POD_NAMESPACE_ENV).map_err(|_| ConfigError::MissingNamespace)?;
        Self::from_options(opts, &namespace)
    }

    /// Attach the CA bundle advertised to the API server.
    pub fn with_ca_pem(mut self, ca_pem: Vec<u8>) -> Self {
        self.ca_pem = ca_pem;
        self
    }
}
