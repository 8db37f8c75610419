//! Self-signed CA and serving certificate for the webhook service.
//!
//! The certificates are regenerated on every start; there is no in-place
//! rotation. Validity is long enough that a running process never needs one.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use tracing::debug;

use super::{CA_CERT_FILE, CertError, CertMaterial, ServerIdentity, TLS_CERT_FILE, TLS_KEY_FILE};

/// Validity of the generated CA (10 years)
pub const CA_VALIDITY_YEARS: i64 = 10;

/// Validity of the serving certificate (10 years)
pub const CERT_VALIDITY_YEARS: i64 = 10;

const ORGANIZATION: &str = "kubernetes-fleet";

fn compute_validity(years: i64) -> (::time::OffsetDateTime, ::time::OffsetDateTime) {
    let now = ::time::OffsetDateTime::now_utc();
    let not_after = now + ::time::Duration::days(years * 365);
    (now, not_after)
}

/// In-cluster DNS names of the webhook service.
pub fn service_dns_names(service_name: &str, namespace: &str) -> Vec<String> {
    vec![
        format!("{}.{}.svc", service_name, namespace),
        format!("{}.{}.svc.cluster.local", service_name, namespace),
    ]
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );
    dn.push(
        DnType::OrganizationName,
        DnValue::Utf8String(ORGANIZATION.to_string()),
    );
    dn
}

/// Generate a CA and a serving certificate for `{service}.{namespace}.svc`,
/// write `tls.crt`, `tls.key` and `ca.crt` into `cert_dir`, and return the
/// material.
///
/// `secret_name` names the CA subject so the bundle can be traced back to
/// the secret it is published in.
pub fn provision_self_signed(
    service_name: &str,
    namespace: &str,
    secret_name: &str,
    cert_dir: &Path,
) -> Result<CertMaterial, CertError> {
    // CA
    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name = distinguished_name(&format!("{}-ca", secret_name));
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let (not_before, not_after) = compute_validity(CA_VALIDITY_YEARS);
    ca_params.not_before = not_before;
    ca_params.not_after = not_after;

    let ca_key = KeyPair::generate()
        .map_err(|e| CertError::CertGeneration(format!("failed to generate CA key: {}", e)))?;
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .map_err(|e| CertError::CertGeneration(format!("failed to create CA cert: {}", e)))?;
    let ca_pem = ca_cert.pem();
    let issuer = Issuer::new(ca_params, ca_key);

    // Serving certificate
    let dns_names = service_dns_names(service_name, namespace);
    let common_name = dns_names
        .first()
        .cloned()
        .unwrap_or_else(|| service_name.to_string());
    let mut params = CertificateParams::new(dns_names).map_err(|e| {
        CertError::CertGeneration(format!("invalid service DNS name: {}", e))
    })?;
    params.distinguished_name = distinguished_name(&common_name);
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let (not_before, not_after) = compute_validity(CERT_VALIDITY_YEARS);
    params.not_before = not_before;
    params.not_after = not_after;

    let key = KeyPair::generate()
        .map_err(|e| CertError::CertGeneration(format!("failed to generate server key: {}", e)))?;
    let cert = params
        .signed_by(&key, &issuer)
        .map_err(|e| CertError::CertGeneration(format!("failed to sign server cert: {}", e)))?;

    let cert_pem = cert.pem().into_bytes();
    let key_pem = key.serialize_pem().into_bytes();
    let ca_pem = ca_pem.into_bytes();

    write_material(cert_dir, &cert_pem, &key_pem, &ca_pem)?;
    debug!(
        cert_dir = %cert_dir.display(),
        common_name = %common_name,
        "Wrote self-signed certificate material"
    );

    Ok(CertMaterial {
        ca_pem,
        identity: ServerIdentity::Generated { cert_pem, key_pem },
    })
}

fn write_material(
    cert_dir: &Path,
    cert_pem: &[u8],
    key_pem: &[u8],
    ca_pem: &[u8],
) -> Result<(), CertError> {
    std::fs::create_dir_all(cert_dir).map_err(|e| {
        CertError::CertGeneration(format!(
            "failed to create certificate directory {}: {}",
            cert_dir.display(),
            e
        ))
    })?;
    write_file(&cert_dir.join(TLS_CERT_FILE), cert_pem, 0o644)?;
    write_file(&cert_dir.join(TLS_KEY_FILE), key_pem, 0o600)?;
    write_file(&cert_dir.join(CA_CERT_FILE), ca_pem, 0o644)?;
    Ok(())
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), CertError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).map_err(|e| {
        CertError::CertGeneration(format!("failed to open {}: {}", path.display(), e))
    })?;
    file.write_all(contents).map_err(|e| {
        CertError::CertGeneration(format!("failed to write {}: {}", path.display(), e))
    })
}
