//! fleet-webhook - admission webhooks for a multi-cluster fleet hub.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Provisions the TLS identity and CA bundle
//! - Builds the webhook configurations and the routing table from the flags
//! - Runs leader election; the leader installs the webhook configurations
//! - Starts the health server and the webhook server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::signal;
use tracing::{error, info, warn};

use fleet_webhook::certs::{CertMaterial, apply_secret};
use fleet_webhook::health::{HealthState, run_health_server};
use fleet_webhook::webhooks::TracingAuditLog;
use fleet_webhook::{
    Config, RoutingTable, ValidationEngine, WebhookConfigurations, WebhookOptions, WebhookState,
    install, provision, run_webhook_server,
};

/// Lease configuration
const LEASE_NAME: &str = "fleet-webhook-leader";
const LEASE_TTL_SECS: u64 = 15;
const LEASE_RENEW_INTERVAL_SECS: u64 = 5;

/// Grace period for in-flight admission requests during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[derive(Parser, Debug)]
#[command(name = "fleet-webhook", version, about = "Admission webhooks for the fleet hub")]
struct Cli {
    #[command(flatten)]
    webhook: WebhookOptions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleet_webhook=info".parse()?)
                .add_directive("kube=info".parse()?)
                .add_directive("kube_leader_election=info".parse()?),
        )
        .json()
        .init();

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting fleet-webhook");

    let config = Config::from_env(&cli.webhook)?;
    info!(config = ?config, "Loaded configuration");

    let material = provision(&config)?;
    let config = config.with_ca_pem(material.ca_pem.clone());

    let configurations = WebhookConfigurations::build(&config)?;
    let routes = RoutingTable::from_configurations(&configurations);
    info!(
        mutating = configurations.mutating.len(),
        validating = configurations.validating.len(),
        guard_rail = configurations.guard_rail.len(),
        install_guard_rail = configurations.install_guard_rail,
        routes = routes.len(),
        "Built webhook configurations"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    // Start health server immediately (liveness must work before TLS is up)
    let health_handle = {
        let health_state = health_state.clone();
        let port = cli.webhook.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Every replica serves; only the leader writes cluster objects
    let leader_handle = {
        let client = client.clone();
        let namespace = config.service_namespace.clone();
        let secret_name = config.webhook_cert_secret_name.clone();
        let material = material.clone();
        tokio::spawn(async move {
            run_leader(client, namespace, secret_name, material, configurations).await;
        })
    };

    let webhook_handle = {
        let state = Arc::new(WebhookState::new(
            ValidationEngine::new(&config, Arc::new(TracingAuditLog)),
            health_state.clone(),
        ));
        let identity = material.identity.clone();
        let port = config.service_port;
        tokio::spawn(async move { run_webhook_server(state, routes, &identity, port).await })
    };

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => {
            match result {
                Ok(Ok(())) => return Err("webhook server stopped unexpectedly".into()),
                Ok(Err(e)) => {
                    error!("Webhook server error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Webhook server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
                return Err(e.into());
            }
            return Err("health server stopped unexpectedly".into());
        }
        // The leader task loops forever, so this branch is only reached on panic
        Err(e) = leader_handle => {
            error!("Leader election task panicked: {}", e);
            return Err(e.into());
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready so the Service stops routing reviews here
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("fleet-webhook stopped");
    Ok(())
}

/// Hold the lease and install cluster objects each time leadership is
/// acquired. Failed installs are retried on the next renewal tick.
async fn run_leader(
    client: Client,
    namespace: String,
    secret_name: String,
    material: CertMaterial,
    configurations: WebhookConfigurations,
) {
    let holder_id = std::env::var("POD_NAME").unwrap_or_else(|_| {
        warn!("POD_NAME not set, using hostname");
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    });
    info!(
        holder_id = %holder_id,
        namespace = %namespace,
        lease_name = LEASE_NAME,
        "Initializing leader election"
    );

    let lease_lock = LeaseLock::new(
        client.clone(),
        &namespace,
        LeaseLockParams {
            holder_id,
            lease_name: LEASE_NAME.to_string(),
            lease_ttl: Duration::from_secs(LEASE_TTL_SECS),
        },
    );

    let mut installed = false;
    loop {
        match lease_lock.try_acquire_or_renew().await {
            Ok(result) if result.acquired_lease => {
                if !installed {
                    info!("Acquired leadership, installing webhook configurations");
                    installed = install_objects(
                        &client,
                        &namespace,
                        &secret_name,
                        &material,
                        &configurations,
                    )
                    .await;
                }
            }
            Ok(_) => {
                if installed {
                    warn!("Lost leadership");
                }
                installed = false;
            }
            Err(e) => {
                warn!("Failed to acquire lease: {}, retrying...", e);
            }
        }
        tokio::time::sleep(Duration::from_secs(LEASE_RENEW_INTERVAL_SECS)).await;
    }
}

async fn install_objects(
    client: &Client,
    namespace: &str,
    secret_name: &str,
    material: &CertMaterial,
    configurations: &WebhookConfigurations,
) -> bool {
    if let Some(secret) = material.to_secret(secret_name, namespace) {
        if let Err(e) = apply_secret(client, &secret).await {
            error!(secret = %secret_name, "Failed to apply certificate secret: {}", e);
            return false;
        }
    }
    match install(client, configurations).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to install webhook configurations: {}", e);
            false
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the process cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
