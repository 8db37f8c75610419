//! Audit trail of admission decisions.

use std::fmt;

use tracing::info;

/// One admission decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub uid: String,
    pub operation: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub user: String,
    pub groups: Vec<String>,
    pub allowed: bool,
    pub reason: String,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.allowed { "allowed" } else { "denied" };
        match &self.namespace {
            Some(ns) => write!(
                f,
                "{} {} {}/{} by {}: {}",
                outcome, self.operation, ns, self.name, self.user, self.reason
            ),
            None => write!(
                f,
                "{} {} {} by {}: {}",
                outcome, self.operation, self.name, self.user, self.reason
            ),
        }
    }
}

/// Sink for admission decisions.
pub trait AuditLog: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Emits each entry as a structured event on the `fleet_webhook::audit`
/// target so it can be routed separately from operational logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, entry: &AuditEntry) {
        info!(
            target: "fleet_webhook::audit",
            uid = %entry.uid,
            operation = %entry.operation,
            kind = %entry.kind,
            name = %entry.name,
            namespace = entry.namespace.as_deref().unwrap_or(""),
            user = %entry.user,
            groups = ?entry.groups,
            allowed = entry.allowed,
            reason = %entry.reason,
            "Admission decision"
        );
    }
}
