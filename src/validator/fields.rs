//! Field format helpers shared by the validators.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

const DNS1123_LABEL_MAX: usize = 63;
const DNS1123_SUBDOMAIN_MAX: usize = 253;

fn is_dns1123_label(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= DNS1123_LABEL_MAX
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

fn is_dns1123_subdomain(s: &str) -> bool {
    !s.is_empty() && s.len() <= DNS1123_SUBDOMAIN_MAX && s.split('.').all(is_dns1123_label)
}

/// Name part of a qualified name: alphanumerics with `-_.` inside.
fn is_qualified_name_part(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            s.len() <= DNS1123_LABEL_MAX
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}

/// Label / taint key format: `[prefix/]name`, prefix a DNS subdomain.
pub fn is_qualified_name(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => is_dns1123_subdomain(prefix) && is_qualified_name_part(name),
        None => is_qualified_name_part(key),
    }
}

/// Parses `"25%"` into `25`. Returns `None` for anything else.
pub fn parse_percent(value: &str) -> Option<i32> {
    value.strip_suffix('%')?.parse().ok()
}

/// Integer bound or percentage bound check for an `IntOrString` field.
pub(crate) fn check_int_or_percent(
    field: &str,
    value: &IntOrString,
    min_int: i32,
    min_percent: i32,
) -> Option<String> {
    match value {
        IntOrString::Int(n) if *n < min_int => Some(format!(
            "{} must be greater than or equal to {}, got `{}`",
            field, min_int, n
        )),
        IntOrString::Int(_) => None,
        IntOrString::String(s) => match parse_percent(s) {
            Some(p) if p < min_percent || p > 100 => Some(format!(
                "{} must be a percentage between {}% and 100%, got `{}`",
                field, min_percent, s
            )),
            Some(_) => None,
            None => Some(format!(
                "{} must be an integer or a percentage, got `{}`",
                field, s
            )),
        },
    }
}
