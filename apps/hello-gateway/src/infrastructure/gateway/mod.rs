//! Gateway.
//!
//! Owns the listener set: binds each configured port to a transport
//! security negotiator, dispatches accepted connections to the protocol
//! adapter whose path prefix matches, and drains in-flight requests within a
//! bounded grace period on shutdown.
//!
//! Routing is static and prefix-based; unmatched paths get a `404 Not
//! Found`, never a crash. Handshake failures are logged and terminate only
//! their own connection — nothing below a completed handshake reaches the
//! router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::StatusCode, response::IntoResponse};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::ports::ProtocolAdapter;
use crate::infrastructure::config::{ConfigError, GatewayConfig, ListenerSettings};
use crate::infrastructure::health;
use crate::infrastructure::tls::{Credential, TlsNegotiator, TrustAnchor};

/// Gateway startup errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration is missing or contradictory. Fatal, aborts startup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A listener port could not be bound.
    #[error("failed to bind port {port}: {source}")]
    Bind {
        /// The configured port.
        port: u16,
        /// Underlying bind failure.
        source: std::io::Error,
    },
}

/// One bound listener with its negotiator.
#[derive(Debug)]
struct BoundListener {
    listener: TcpListener,
    negotiator: Arc<TlsNegotiator>,
}

/// The gateway: bound listeners plus the shared adapter router.
#[derive(Debug)]
pub struct Gateway {
    listeners: Vec<BoundListener>,
    router: Router,
    shutdown_grace: std::time::Duration,
}

impl Gateway {
    /// Validate the configuration, load credential material, configure one
    /// negotiator per listener, and bind every port.
    ///
    /// # Errors
    ///
    /// Fails fast with [`GatewayError::Config`] before any bind when the
    /// listener set is contradictory (duplicate ports, mutual mode without a
    /// trust anchor), and with [`GatewayError::Bind`] when a port is taken.
    pub async fn bind(
        config: &GatewayConfig,
        adapters: &[&dyn ProtocolAdapter],
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let router = build_router(adapters);

        let mut listeners = Vec::with_capacity(config.listeners.len());
        for settings in &config.listeners {
            let negotiator = build_negotiator(settings, config)?;
            let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| GatewayError::Bind {
                    port: settings.port,
                    source,
                })?;

            tracing::info!(
                port = settings.port,
                mode = settings.mode.as_str(),
                "Listener bound"
            );
            listeners.push(BoundListener {
                listener,
                negotiator: Arc::new(negotiator),
            });
        }

        Ok(Self {
            listeners,
            router,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Actual bound addresses, in listener order. Useful when ports were
    /// configured as 0.
    pub fn local_addrs(&self) -> std::io::Result<Vec<SocketAddr>> {
        self.listeners
            .iter()
            .map(|bound| bound.listener.local_addr())
            .collect()
    }

    /// Accept connections until `cancel` fires, then drain in-flight
    /// connections within the configured grace period.
    pub async fn run(self, cancel: CancellationToken) {
        let tracker = TaskTracker::new();

        let mut accept_loops = Vec::with_capacity(self.listeners.len());
        for bound in self.listeners {
            accept_loops.push(tokio::spawn(accept_loop(
                bound,
                self.router.clone(),
                tracker.clone(),
                cancel.clone(),
            )));
        }
        for handle in accept_loops {
            let _ = handle.await;
        }

        // No new connections past this point; drain what is in flight.
        tracker.close();
        if tokio::time::timeout(self.shutdown_grace, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                grace_secs = self.shutdown_grace.as_secs(),
                "Drain period expired with connections still in flight"
            );
        }
        tracing::info!("Gateway stopped");
    }
}

/// The static route set: every adapter mounted at its prefix, the health
/// collaborator at the root, and a 404 fallback.
fn build_router(adapters: &[&dyn ProtocolAdapter]) -> Router {
    let mut router = Router::new();
    for adapter in adapters {
        tracing::info!(prefix = adapter.path_prefix(), "Mounting protocol adapter");
        router = router.nest(adapter.path_prefix(), adapter.routes());
    }
    router.merge(health::routes()).fallback(not_found)
}

/// Build the negotiator for one listener, falling back to a generated
/// self-signed credential when none is configured (server-only mode only;
/// mutual mode fails validation without explicit files).
fn build_negotiator(
    settings: &ListenerSettings,
    config: &GatewayConfig,
) -> Result<TlsNegotiator, ConfigError> {
    let credential = match (&settings.cert_path, &settings.key_path) {
        (Some(cert_path), Some(key_path)) => {
            tracing::info!(
                port = settings.port,
                cert_path = %cert_path,
                key_path = %key_path,
                "Loading credential from files"
            );
            Credential::from_pem_files(cert_path, key_path)?
        }
        _ => {
            tracing::warn!(
                port = settings.port,
                "No credential paths configured, generating self-signed certificate for development"
            );
            Credential::generate_self_signed("hello-gateway", &["localhost", "127.0.0.1", "::1"])?
        }
    };

    let trust_anchor = settings
        .trust_anchor_path
        .as_ref()
        .map(TrustAnchor::from_pem_file)
        .transpose()?;

    TlsNegotiator::configure(
        &credential,
        settings.mode,
        trust_anchor.as_ref(),
        config.handshake_timeout,
    )
}

/// Accept connections on one listener until cancelled.
async fn accept_loop(
    bound: BoundListener,
    router: Router,
    tracker: TaskTracker,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            accepted = bound.listener.accept() => {
                match accepted {
                    Ok((stream, remote)) => {
                        let negotiator = Arc::clone(&bound.negotiator);
                        let router = router.clone();
                        tracker.spawn(serve_connection(negotiator, stream, remote, router));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                }
            }
            () = cancel.cancelled() => {
                tracing::info!("Listener stopped accepting");
                break;
            }
        }
    }
}

/// Negotiate TLS on one accepted connection, then serve HTTP/1.1 over it.
async fn serve_connection(
    negotiator: Arc<TlsNegotiator>,
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
) {
    match negotiator.accept(stream).await {
        Ok((tls_stream, context)) => {
            tracing::debug!(
                %remote,
                protocol = %context.protocol_version,
                cipher = %context.cipher_suite,
                peer_subject = ?context.peer_subject,
                "TLS handshake complete"
            );

            let service = TowerToHyperService::new(router);
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(tls_stream), service)
                .await
            {
                tracing::debug!(%remote, error = %e, "Connection closed with error");
            }
        }
        Err(e) => {
            // Terminates this connection only; the gateway never sees it.
            tracing::warn!(%remote, error = %e, "TLS handshake rejected");
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found\n")
}
