//! Material issued by cert-manager.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::{CA_CERT_FILE, CertError, ServerIdentity, TLS_CERT_FILE, TLS_KEY_FILE};

/// Read `ca.crt` from a directory populated by an external certificate agent.
///
/// A missing file and an empty file are reported as different errors so an
/// operator can tell "not mounted yet" from "misconfigured issuer".
pub fn load_external_ca(cert_dir: &Path) -> Result<Vec<u8>, CertError> {
    let path = cert_dir.join(CA_CERT_FILE);
    let ca_pem = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(CertError::CaMissing { path }),
        Err(source) => return Err(CertError::Io { path, source }),
    };

    if ca_pem.is_empty() {
        return Err(CertError::CaEmpty { path });
    }

    debug!(path = %path.display(), bytes = ca_pem.len(), "Read CA bundle");
    Ok(ca_pem)
}

/// Check that the mounted `tls.crt` and `tls.key` are present and non-empty.
///
/// rustls only reads them once the listener starts, so a missing pair is
/// caught here instead of inside the server task.
pub fn load_serving_pair(cert_dir: &Path) -> Result<ServerIdentity, CertError> {
    let cert_path = cert_dir.join(TLS_CERT_FILE);
    let key_path = cert_dir.join(TLS_KEY_FILE);
    for path in [&cert_path, &key_path] {
        let len = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CertError::ServingFileMissing { path: path.clone() });
            }
            Err(source) => {
                return Err(CertError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };
        if len == 0 {
            return Err(CertError::ServingFileEmpty { path: path.clone() });
        }
    }
    Ok(ServerIdentity::Mounted {
        cert_path,
        key_path,
    })
}
