//! Credential store.
//!
//! Server identity material and the trust anchor used to validate client
//! certificates. Both are loaded once at startup, owned by the negotiator,
//! and never mutated afterwards.
//!
//! Credentials are held as PEM text and parsed when the negotiator is
//! configured, so a bad file fails startup rather than the first handshake.
//!
//! # Development Credentials
//!
//! When no certificate paths are configured, a self-signed certificate is
//! generated for server-only listeners. [`CertAuthority`] issues
//! dev/test certificates that chain to a generated root.

use std::path::Path;

use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair};
use rustls::RootCertStore;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::infrastructure::config::ConfigError;

/// Server identity: certificate chain plus private key, PEM-encoded.
#[derive(Clone)]
pub struct Credential {
    cert_pem: String,
    key_pem: String,
}

impl Credential {
    /// Create a credential from PEM strings.
    #[must_use]
    pub fn from_pem(cert_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Load a credential from PEM files.
    pub fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let cert_pem = read_pem(cert_path.as_ref())?;
        let key_pem = read_pem(key_path.as_ref())?;
        Ok(Self { cert_pem, key_pem })
    }

    /// Generate a self-signed credential for development.
    pub fn generate_self_signed(
        common_name: &str,
        san_dns_names: &[&str],
    ) -> Result<Self, ConfigError> {
        let key_pair = KeyPair::generate().map_err(certgen_error)?;

        let san_strings: Vec<String> = san_dns_names.iter().map(|s| (*s).to_string()).collect();
        let mut params = CertificateParams::new(san_strings).map_err(certgen_error)?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);

        let cert = params.self_signed(&key_pair).map_err(certgen_error)?;

        tracing::info!(
            common_name = %common_name,
            san_count = san_dns_names.len(),
            "Generated self-signed certificate"
        );

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// The certificate chain, PEM-encoded.
    #[must_use]
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// Parse the certificate chain into DER.
    pub(crate) fn cert_chain(&self) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
        let chain: Vec<CertificateDer<'static>> =
            CertificateDer::pem_slice_iter(self.cert_pem.as_bytes())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::InvalidPem(format!("certificate chain: {e}")))?;
        if chain.is_empty() {
            return Err(ConfigError::InvalidPem(
                "certificate chain contains no certificates".to_string(),
            ));
        }
        Ok(chain)
    }

    /// Parse the private key into DER.
    pub(crate) fn private_key(&self) -> Result<PrivateKeyDer<'static>, ConfigError> {
        PrivateKeyDer::from_pem_slice(self.key_pem.as_bytes())
            .map_err(|e| ConfigError::InvalidPem(format!("private key: {e}")))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("cert_pem", &format!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Closed-world trust anchor: the only issuers accepted when validating
/// client certificate chains. No system roots, no external CA lookup.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    roots: RootCertStore,
}

impl TrustAnchor {
    /// Build a trust anchor from a PEM CA bundle.
    pub fn from_pem(ca_pem: &str) -> Result<Self, ConfigError> {
        let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(ca_pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::InvalidPem(format!("trust anchor: {e}")))?;
        if certs.is_empty() {
            return Err(ConfigError::InvalidPem(
                "trust anchor contains no certificates".to_string(),
            ));
        }

        let mut roots = RootCertStore::empty();
        for cert in certs {
            roots
                .add(cert)
                .map_err(|e| ConfigError::InvalidPem(format!("trust anchor: {e}")))?;
        }
        Ok(Self { roots })
    }

    /// Load a trust anchor from a PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let pem = read_pem(path.as_ref())?;
        Self::from_pem(&pem)
    }

    /// Number of anchored issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the anchor is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub(crate) fn roots(&self) -> RootCertStore {
        self.roots.clone()
    }
}

/// A certificate plus its key, PEM-encoded, as issued by [`CertAuthority`].
#[derive(Debug, Clone)]
pub struct IssuedPem {
    /// Certificate, PEM-encoded.
    pub cert_pem: String,
    /// Private key, PEM-encoded.
    pub key_pem: String,
}

impl IssuedPem {
    /// Convert into a server [`Credential`].
    #[must_use]
    pub fn into_credential(self) -> Credential {
        Credential::from_pem(self.cert_pem, self.key_pem)
    }
}

/// A minimal issuing authority for development and test credentials.
///
/// Issued certificates chain to the authority's self-signed root, which can
/// serve as the [`TrustAnchor`] of a mutual-TLS listener.
pub struct CertAuthority {
    cert: Certificate,
    key: KeyPair,
}

impl CertAuthority {
    /// Generate a new root authority.
    pub fn new(common_name: &str) -> Result<Self, ConfigError> {
        let key = KeyPair::generate().map_err(certgen_error)?;
        let mut params = CertificateParams::new(Vec::new()).map_err(certgen_error)?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let cert = params.self_signed(&key).map_err(certgen_error)?;
        Ok(Self { cert, key })
    }

    /// The root certificate, PEM-encoded. Suitable as a trust anchor.
    #[must_use]
    pub fn ca_pem(&self) -> String {
        self.cert.pem()
    }

    /// Issue a server certificate with the given DNS names.
    pub fn issue_server(&self, common_name: &str, san_dns_names: &[&str]) -> Result<IssuedPem, ConfigError> {
        let san_strings: Vec<String> = san_dns_names.iter().map(|s| (*s).to_string()).collect();
        let mut params = CertificateParams::new(san_strings).map_err(certgen_error)?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        self.issue_with_params(params)
    }

    /// Issue a client certificate.
    pub fn issue_client(&self, common_name: &str) -> Result<IssuedPem, ConfigError> {
        let mut params = CertificateParams::new(Vec::new()).map_err(certgen_error)?;
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        self.issue_with_params(params)
    }

    /// Issue a certificate from caller-supplied parameters, signed by this
    /// authority. Lets callers control the validity window.
    pub fn issue_with_params(&self, params: CertificateParams) -> Result<IssuedPem, ConfigError> {
        let key = KeyPair::generate().map_err(certgen_error)?;
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .map_err(certgen_error)?;
        Ok(IssuedPem {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        })
    }
}

fn read_pem(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::CredentialRead(path.display().to_string(), e))
}

fn certgen_error(err: rcgen::Error) -> ConfigError {
    ConfigError::CertificateGeneration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_self_signed_parses() {
        let credential =
            Credential::generate_self_signed("test-server", &["localhost", "127.0.0.1"]).unwrap();

        assert!(credential.cert_pem().contains("-----BEGIN CERTIFICATE-----"));
        assert_eq!(credential.cert_chain().unwrap().len(), 1);
        assert!(credential.private_key().is_ok());
    }

    #[test]
    fn credential_debug_redacts_key() {
        let credential = Credential::generate_self_signed("test", &["localhost"]).unwrap();
        let debug = format!("{credential:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn invalid_pem_is_a_config_error() {
        let credential = Credential::from_pem("not a certificate", "not a key");
        assert!(credential.cert_chain().is_err());
        assert!(credential.private_key().is_err());
    }

    #[test]
    fn authority_issues_chaining_certificates() {
        let ca = CertAuthority::new("test-root").unwrap();
        let anchor = TrustAnchor::from_pem(&ca.ca_pem()).unwrap();
        assert_eq!(anchor.len(), 1);

        let server = ca.issue_server("gateway", &["localhost"]).unwrap();
        assert!(server.cert_pem.contains("-----BEGIN CERTIFICATE-----"));

        let client = ca.issue_client("client-1").unwrap();
        let credential = client.into_credential();
        assert!(credential.private_key().is_ok());
    }

    #[test]
    fn empty_trust_anchor_rejected() {
        assert!(matches!(
            TrustAnchor::from_pem(""),
            Err(ConfigError::InvalidPem(_))
        ));
    }
}
