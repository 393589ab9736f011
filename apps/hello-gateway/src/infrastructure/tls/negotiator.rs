//! Transport security negotiator.
//!
//! Terminates TLS on inbound connections and enforces the configured trust
//! policy before any application data is exposed. In mutual mode the client
//! certificate chain is validated against the trust anchor: chain of trust
//! and validity window only — there is deliberately no hostname or CN match
//! against the client identity. Trust is closed-world: a chain validates iff
//! it reaches the configured anchor; no external CA lookup occurs.
//!
//! Every handshake failure closes the connection without handing it to the
//! gateway. There is no partial or degraded mode.

use std::sync::Arc;
use std::time::Duration;

use rustls::server::WebPkiClientVerifier;
use rustls::{CertificateError, ServerConfig};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use crate::infrastructure::config::ConfigError;

use super::credential::{Credential, TrustAnchor};

/// Transport trust policy of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    /// The server presents a certificate; clients are anonymous.
    #[default]
    ServerOnly,
    /// Both sides present certificates; the client chain must validate
    /// against the trust anchor.
    Mutual,
}

impl SecurityMode {
    /// Parse a mode label. Returns `None` for unknown labels so the caller
    /// can fail configuration instead of silently defaulting.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "server-only" => Some(Self::ServerOnly),
            "mutual" => Some(Self::Mutual),
            _ => None,
        }
    }

    /// The mode label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ServerOnly => "server-only",
            Self::Mutual => "mutual",
        }
    }

    /// Whether client certificates are demanded and validated.
    #[must_use]
    pub const fn is_mutual(&self) -> bool {
        matches!(self, Self::Mutual)
    }
}

/// Per-connection record of the negotiated session.
///
/// Created at handshake completion, read-only thereafter, dropped when the
/// connection closes.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Negotiated protocol version (e.g. `TLSv1_3`).
    pub protocol_version: String,
    /// Negotiated cipher suite.
    pub cipher_suite: String,
    /// Subject DN of the validated peer certificate; `None` outside mutual
    /// mode.
    pub peer_subject: Option<String>,
}

impl ConnectionContext {
    fn from_session(conn: &rustls::ServerConnection) -> Self {
        let protocol_version = conn
            .protocol_version()
            .map_or_else(|| "unknown".to_string(), |v| format!("{v:?}"));
        let cipher_suite = conn
            .negotiated_cipher_suite()
            .map_or_else(|| "unknown".to_string(), |s| format!("{:?}", s.suite()));
        let peer_subject = conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .and_then(|leaf| {
                x509_parser::parse_x509_certificate(leaf.as_ref())
                    .ok()
                    .map(|(_, cert)| cert.subject().to_string())
            });

        Self {
            protocol_version,
            cipher_suite,
            peer_subject,
        }
    }
}

/// Handshake failures. Each terminates its connection only, never the
/// process, and none of them reaches the operation registry.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// Mutual mode is active and the peer presented no certificate.
    #[error("client certificate required but none was presented")]
    NoClientCert,

    /// The presented chain does not validate against the trust anchor.
    #[error("client certificate chain not trusted: {0}")]
    UntrustedChain(String),

    /// A certificate in the chain is outside its validity window.
    #[error("certificate outside its validity window")]
    Expired,

    /// The peer offered no supported protocol parameters.
    #[error("incompatible TLS parameters: {0}")]
    ProtocolMismatch(String),

    /// The handshake did not complete within the configured window.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure below the TLS layer.
    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminates TLS and enforces the trust policy for one listener.
#[derive(Clone)]
pub struct TlsNegotiator {
    acceptor: TlsAcceptor,
    mode: SecurityMode,
    handshake_timeout: Duration,
}

impl TlsNegotiator {
    /// Build a negotiator for the given credential and trust policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTrustAnchor`] when `mode` is
    /// [`SecurityMode::Mutual`] and no trust anchor is supplied, and
    /// [`ConfigError::InvalidPem`] / [`ConfigError::Tls`] when the
    /// credential material cannot be parsed or assembled.
    pub fn configure(
        credential: &Credential,
        mode: SecurityMode,
        trust_anchor: Option<&TrustAnchor>,
        handshake_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let cert_chain = credential.cert_chain()?;
        let key = credential.private_key()?;

        let config = match mode {
            SecurityMode::ServerOnly => ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(cert_chain, key)
                .map_err(|e| ConfigError::Tls(e.to_string()))?,
            SecurityMode::Mutual => {
                let anchor = trust_anchor.ok_or(ConfigError::MissingTrustAnchor)?;
                let verifier = WebPkiClientVerifier::builder(Arc::new(anchor.roots()))
                    .build()
                    .map_err(|e| ConfigError::Tls(e.to_string()))?;
                ServerConfig::builder()
                    .with_client_cert_verifier(verifier)
                    .with_single_cert(cert_chain, key)
                    .map_err(|e| ConfigError::Tls(e.to_string()))?
            }
        };

        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(config)),
            mode,
            handshake_timeout,
        })
    }

    /// The configured trust policy.
    #[must_use]
    pub const fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Complete the TLS handshake on an accepted connection.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] when the handshake fails or exceeds the
    /// configured window. The connection is dropped in either case.
    pub async fn accept(
        &self,
        stream: TcpStream,
    ) -> Result<(TlsStream<TcpStream>, ConnectionContext), HandshakeError> {
        let stream = tokio::time::timeout(self.handshake_timeout, self.acceptor.accept(stream))
            .await
            .map_err(|_| HandshakeError::Timeout(self.handshake_timeout))?
            .map_err(classify_handshake_error)?;

        let context = ConnectionContext::from_session(stream.get_ref().1);
        Ok((stream, context))
    }
}

impl std::fmt::Debug for TlsNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsNegotiator")
            .field("mode", &self.mode)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

/// Map a handshake I/O failure onto the failure taxonomy.
fn classify_handshake_error(err: std::io::Error) -> HandshakeError {
    if let Some(classified) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .and_then(classify_tls_error)
    {
        return classified;
    }
    HandshakeError::Io(err)
}

fn classify_tls_error(err: &rustls::Error) -> Option<HandshakeError> {
    match err {
        rustls::Error::NoCertificatesPresented => Some(HandshakeError::NoClientCert),
        rustls::Error::InvalidCertificate(cert_err) => Some(match cert_err {
            CertificateError::Expired
            | CertificateError::ExpiredContext { .. }
            | CertificateError::NotValidYet
            | CertificateError::NotValidYetContext { .. } => HandshakeError::Expired,
            other => HandshakeError::UntrustedChain(format!("{other:?}")),
        }),
        rustls::Error::PeerIncompatible(reason) => {
            Some(HandshakeError::ProtocolMismatch(format!("{reason:?}")))
        }
        _ => None,
    }
}
