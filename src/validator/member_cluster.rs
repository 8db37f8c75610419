//! MemberCluster validation rules.

use super::fields::is_qualified_name;
use super::{ValidationError, Violations};
use crate::crd::MemberCluster;

pub const MIN_HEARTBEAT_PERIOD_SECONDS: i32 = 1;
pub const MAX_HEARTBEAT_PERIOD_SECONDS: i32 = 600;

const SUPPORTED_TAINT_EFFECT: &str = "NoSchedule";

/// Validate a MemberCluster.
pub fn validate_member_cluster(mc: &MemberCluster) -> Result<(), ValidationError> {
    let mut v = Violations::new();
    let spec = &mc.spec;

    match &spec.identity {
        Some(identity) if !identity.kind.is_empty() => {
            if identity.name.is_empty() {
                v.push("identity name cannot be empty");
            }
        }
        _ => v.push("identity kind cannot be empty"),
    }

    if let Some(period) = spec.heartbeat_period_seconds
        && !(MIN_HEARTBEAT_PERIOD_SECONDS..=MAX_HEARTBEAT_PERIOD_SECONDS).contains(&period)
    {
        v.push(format!(
            "heartbeatPeriodSeconds must be between {} and {}, got {}",
            MIN_HEARTBEAT_PERIOD_SECONDS, MAX_HEARTBEAT_PERIOD_SECONDS, period
        ));
    }

    for (i, taint) in spec.taints.iter().enumerate() {
        if !is_qualified_name(&taint.key) {
            v.push(format!("taint key {} is not a valid qualified name", taint.key));
        }
        if taint.effect != SUPPORTED_TAINT_EFFECT {
            v.push(format!(
                "taint effect {} is not supported, only NoSchedule is allowed",
                taint.effect
            ));
        }
        if spec.taints.iter().take(i).any(|t| t == taint) {
            v.push(format!(
                "taint {}={}:{} already exists, taints must be unique",
                taint.key, taint.value, taint.effect
            ));
        }
    }

    v.into_result()
}
