//! Hello Gateway Binary
//!
//! Starts the dual-protocol secure demo service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hello-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_PORT`: primary listener port (default: 8443)
//! - `GATEWAY_TLS_MODE`: server-only | mutual (default: server-only)
//! - `GATEWAY_TLS_CERT_PATH`: server certificate chain, PEM
//! - `GATEWAY_TLS_KEY_PATH`: server private key, PEM
//! - `GATEWAY_TLS_CA_PATH`: trust anchor for client verification, PEM
//! - `GATEWAY_MTLS_PORT`: optional second listener, always mutual mode
//! - `GATEWAY_HANDSHAKE_TIMEOUT_SECS`: handshake window (default: 10)
//! - `GATEWAY_SHUTDOWN_GRACE_SECS`: drain period (default: 30)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;

use hello_gateway::domain::operations::OperationRegistry;
use hello_gateway::infrastructure::config::GatewayConfig;
use hello_gateway::infrastructure::gateway::Gateway;
use hello_gateway::infrastructure::rest::RestAdapter;
use hello_gateway::infrastructure::soap::SoapAdapter;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS operations
    #[allow(clippy::expect_used)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let _ = dotenvy::dotenv();
    init_tracing();

    tracing::info!("Starting Hello Gateway");

    let config = GatewayConfig::from_env()?;
    log_config(&config);

    // Explicit construction: registry, both adapters, then the gateway.
    // No registration happens at runtime.
    let registry = Arc::new(OperationRegistry::new());
    let rest = RestAdapter::new(Arc::clone(&registry));
    let soap = SoapAdapter::new(registry);

    let gateway = Gateway::bind(&config, &[&soap, &rest]).await?;
    for addr in gateway.local_addrs()? {
        tracing::info!(%addr, "Serving");
    }
    tracing::info!("Endpoints:");
    tracing::info!("  POST /soap/HelloWorldService");
    tracing::info!("  GET  /soap/HelloWorldService?wsdl");
    tracing::info!("  GET  /api/hello/say/{{name}}");
    tracing::info!("  POST /api/hello/say");
    tracing::info!("  GET  /api/hello/time");
    tracing::info!("  GET  /api/hello/echo?message=");
    tracing::info!("  POST /api/hello/echo");
    tracing::info!("  GET  /health");

    let cancel = CancellationToken::new();
    let shutdown = tokio::spawn(shutdown_signal(cancel.clone()));

    gateway.run(cancel).await;
    shutdown.abort();

    tracing::info!("Hello Gateway stopped");
    Ok(())
}

/// Initialize the tracing subscriber with environment filter.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "hello_gateway=info"
                    .parse()
                    .expect("static directive 'hello_gateway=info' is valid"),
            ),
        )
        .init();
}

/// Log the parsed configuration.
fn log_config(config: &GatewayConfig) {
    for listener in &config.listeners {
        tracing::info!(
            port = listener.port,
            mode = listener.mode.as_str(),
            trust_anchor = ?listener.trust_anchor_path,
            "Listener configured"
        );
    }
    tracing::info!(
        handshake_timeout_secs = config.handshake_timeout.as_secs(),
        shutdown_grace_secs = config.shutdown_grace.as_secs(),
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel the gateway.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed: a process that cannot
/// respond to termination signals should fail at startup, not hang.
#[allow(clippy::expect_used)]
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    cancel.cancel();
}
