//! Gateway configuration.
//!
//! Static startup configuration loaded from environment variables: listener
//! ports, security mode, and credential file paths. Nothing here is
//! renegotiated at runtime.
//!
//! # Environment Variables
//!
//! - `GATEWAY_PORT`: primary listener port (default: 8443)
//! - `GATEWAY_TLS_MODE`: `server-only` | `mutual` (default: server-only)
//! - `GATEWAY_TLS_CERT_PATH`: server certificate chain, PEM
//! - `GATEWAY_TLS_KEY_PATH`: server private key, PEM
//! - `GATEWAY_TLS_CA_PATH`: trust anchor for client verification, PEM
//! - `GATEWAY_MTLS_PORT`: optional second listener, always mutual mode
//! - `GATEWAY_HANDSHAKE_TIMEOUT_SECS`: handshake window (default: 10)
//! - `GATEWAY_SHUTDOWN_GRACE_SECS`: drain period (default: 30)
//!
//! When no certificate paths are provided, server-only listeners fall back
//! to a generated self-signed certificate for development. Mutual-mode
//! listeners never auto-generate: a trust anchor nobody holds a key for
//! would make every client unverifiable, so missing files fail startup.

use std::collections::HashSet;
use std::time::Duration;

use crate::infrastructure::tls::SecurityMode;

/// Default primary listener port.
const DEFAULT_PORT: u16 = 8443;

/// Default handshake window.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default shutdown drain period.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Configuration errors. All fatal: startup aborts, nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A credential file could not be read.
    #[error("failed to read credential file {0}: {1}")]
    CredentialRead(String, #[source] std::io::Error),

    /// Credential material did not parse as PEM.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// Self-signed generation failed.
    #[error("failed to generate certificate: {0}")]
    CertificateGeneration(String),

    /// Mutual mode configured without a trust anchor.
    #[error("mutual TLS requires a trust anchor (GATEWAY_TLS_CA_PATH)")]
    MissingTrustAnchor,

    /// Mutual mode configured without explicit credential files.
    #[error("mutual TLS requires explicit credential files: {0}")]
    MissingCredential(String),

    /// Two listeners claim the same port.
    #[error("duplicate listener port: {0}")]
    DuplicatePort(u16),

    /// Unrecognized security mode label.
    #[error("unknown security mode {0:?} (expected \"server-only\" or \"mutual\")")]
    InvalidMode(String),

    /// TLS configuration could not be assembled.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// One listener: a port bound to a trust policy and credential material,
/// serving both protocol adapters.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    /// Listener port.
    pub port: u16,
    /// Trust policy.
    pub mode: SecurityMode,
    /// Server certificate chain path (PEM). `None` = dev self-signed.
    pub cert_path: Option<String>,
    /// Server private key path (PEM). `None` = dev self-signed.
    pub key_path: Option<String>,
    /// Trust anchor path (PEM); required in mutual mode.
    pub trust_anchor_path: Option<String>,
}

impl ListenerSettings {
    /// A server-only listener with dev credentials.
    #[must_use]
    pub const fn server_only(port: u16) -> Self {
        Self {
            port,
            mode: SecurityMode::ServerOnly,
            cert_path: None,
            key_path: None,
            trust_anchor_path: None,
        }
    }

    /// Check internal consistency of this listener.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.is_mutual() {
            if self.trust_anchor_path.is_none() {
                return Err(ConfigError::MissingTrustAnchor);
            }
            if self.cert_path.is_none() || self.key_path.is_none() {
                return Err(ConfigError::MissingCredential(
                    "GATEWAY_TLS_CERT_PATH and GATEWAY_TLS_KEY_PATH".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listeners to bind. Ports must be unique.
    pub listeners: Vec<ListenerSettings>,
    /// Handshake window enforced by the negotiator.
    pub handshake_timeout: Duration,
    /// Drain period on shutdown.
    pub shutdown_grace: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown security mode or a
    /// contradictory listener set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match std::env::var("GATEWAY_TLS_MODE") {
            Ok(value) => SecurityMode::parse(&value).ok_or(ConfigError::InvalidMode(value))?,
            Err(_) => SecurityMode::ServerOnly,
        };

        let cert_path = std::env::var("GATEWAY_TLS_CERT_PATH").ok();
        let key_path = std::env::var("GATEWAY_TLS_KEY_PATH").ok();
        let trust_anchor_path = std::env::var("GATEWAY_TLS_CA_PATH").ok();

        let mut listeners = vec![ListenerSettings {
            port: parse_env_u16("GATEWAY_PORT", DEFAULT_PORT),
            mode,
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
            trust_anchor_path: trust_anchor_path.clone(),
        }];

        // Optional second listener, always mutual: mirrors running the
        // one-way and client-auth variants side by side.
        if let Some(mtls_port) = std::env::var("GATEWAY_MTLS_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
        {
            listeners.push(ListenerSettings {
                port: mtls_port,
                mode: SecurityMode::Mutual,
                cert_path,
                key_path,
                trust_anchor_path,
            });
        }

        let config = Self {
            listeners,
            handshake_timeout: parse_env_duration_secs(
                "GATEWAY_HANDSHAKE_TIMEOUT_SECS",
                DEFAULT_HANDSHAKE_TIMEOUT,
            ),
            shutdown_grace: parse_env_duration_secs(
                "GATEWAY_SHUTDOWN_GRACE_SECS",
                DEFAULT_SHUTDOWN_GRACE,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the whole listener set: per-listener consistency plus unique
    /// ports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ports = HashSet::new();
        for listener in &self.listeners {
            listener.validate()?;
            if !ports.insert(listener.port) {
                return Err(ConfigError::DuplicatePort(listener.port));
            }
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listeners: vec![ListenerSettings::server_only(DEFAULT_PORT)],
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

// Note: from_env itself is not unit-tested here because Rust 2024 edition
// requires unsafe blocks for env var modification and this crate forbids
// unsafe code. Validation is covered on constructed settings instead.
#[cfg(test)]
mod tests {
    use super::*;

    fn mutual_listener(port: u16) -> ListenerSettings {
        ListenerSettings {
            port,
            mode: SecurityMode::Mutual,
            cert_path: Some("server.crt".to_string()),
            key_path: Some("server.key".to_string()),
            trust_anchor_path: Some("ca.crt".to_string()),
        }
    }

    #[test]
    fn defaults_are_server_only() {
        let config = GatewayConfig::default();
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].mode, SecurityMode::ServerOnly);
        assert_eq!(config.listeners[0].port, 8443);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn mutual_without_anchor_fails_validation() {
        let mut listener = mutual_listener(8444);
        listener.trust_anchor_path = None;
        assert!(matches!(
            listener.validate(),
            Err(ConfigError::MissingTrustAnchor)
        ));
    }

    #[test]
    fn mutual_without_credential_files_fails_validation() {
        let mut listener = mutual_listener(8444);
        listener.cert_path = None;
        assert!(matches!(
            listener.validate(),
            Err(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn duplicate_ports_fail_validation() {
        let config = GatewayConfig {
            listeners: vec![ListenerSettings::server_only(8443), mutual_listener(8443)],
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePort(8443))
        ));
    }

    #[test]
    fn distinct_ports_validate() {
        let config = GatewayConfig {
            listeners: vec![ListenerSettings::server_only(8443), mutual_listener(8444)],
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
