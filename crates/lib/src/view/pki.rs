//! Inlining of ACME-issued certificates into the `pki` projection.

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::warn;

use crate::constants::CERTBOT_DIR;

/// Rewrites certificate entries that are managed by an ACME client.
pub trait PkiRewriter: Send + Sync + std::fmt::Debug {
    /// Returns `entry` with the live certificate and key inlined.
    fn rewrite_acme(&self, name: &str, entry: Map<String, Value>) -> Map<String, Value>;
}

/// Reads certificates from the certbot `live` directory.
///
/// The PEM armor lines are stripped and the base64 body is stored under
/// `certificate` and `private.key`. An unreadable certificate leaves the
/// entry unchanged.
#[derive(Debug, Clone)]
pub struct AcmeFileRewriter {
    certbot_dir: PathBuf,
}

impl Default for AcmeFileRewriter {
    fn default() -> Self {
        Self::new(CERTBOT_DIR)
    }
}

impl AcmeFileRewriter {
    pub fn new(certbot_dir: impl Into<PathBuf>) -> Self {
        Self {
            certbot_dir: certbot_dir.into(),
        }
    }

    fn read_pem_body(&self, name: &str, file: &str) -> std::io::Result<String> {
        let path = self.certbot_dir.join("live").join(name).join(file);
        let text = fs::read_to_string(path)?;
        Ok(pem_body(&text))
    }
}

/// Joins the base64 lines of a PEM block, dropping the `-----` armor.
pub fn pem_body(pem: &str) -> String {
    pem.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect()
}

impl PkiRewriter for AcmeFileRewriter {
    fn rewrite_acme(&self, name: &str, mut entry: Map<String, Value>) -> Map<String, Value> {
        let cert = self.read_pem_body(name, "cert.pem");
        let key = self.read_pem_body(name, "privkey.pem");
        match (cert, key) {
            (Ok(cert), Ok(key)) => {
                entry.insert("certificate".to_string(), Value::String(cert));
                let mut private = Map::new();
                private.insert("key".to_string(), Value::String(key));
                entry.insert("private".to_string(), Value::Object(private));
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(certificate = name, error = %err, "Unable to read ACME certificate");
            }
        }
        entry
    }
}
