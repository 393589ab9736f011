#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Hello Gateway - Dual-Protocol Secure Demo Service
//!
//! One set of business operations (greet, echo, server time) exposed over
//! two wire encodings — a SOAP-style RPC endpoint and a REST/JSON endpoint —
//! behind a configurable transport security posture (server-only TLS or
//! mutual TLS with client-certificate verification).
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: The operation registry — wire-format-independent business
//!   semantics.
//!   - `operations`: `OperationRequest`/`OperationResponse` and the three
//!     registered operations
//!
//! - **Application**: Port definitions.
//!   - `ports`: the `ProtocolAdapter` capability both wire adapters implement
//!
//! - **Infrastructure**: Adapters and transport.
//!   - `tls`: credential store and the transport security negotiator
//!   - `soap`: structured-RPC adapter (envelope decode/encode, faults, WSDL)
//!   - `rest`: resource adapter (JSON envelope routes)
//!   - `gateway`: listeners, dispatch, graceful shutdown
//!   - `config`: startup configuration surface
//!   - `health`: health/info endpoint
//!
//! # Request Flow
//!
//! ```text
//! TCP connect ──► TlsNegotiator ──► Gateway router ──┬──► SoapAdapter ──┐
//!                 (handshake,                        │                  ├──► OperationRegistry
//!                  client-cert policy)               └──► RestAdapter ──┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Operation registry with no wire-format dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Protocol adapters and transport.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::operations::{
    OperationError, OperationRegistry, OperationRequest, OperationResponse, OperationStatus,
};

// Ports
pub use application::ports::ProtocolAdapter;

// Transport security
pub use infrastructure::tls::{
    ConnectionContext, Credential, HandshakeError, SecurityMode, TlsNegotiator, TrustAnchor,
};

// Protocol adapters
pub use infrastructure::rest::RestAdapter;
pub use infrastructure::soap::SoapAdapter;

// Gateway
pub use infrastructure::gateway::{Gateway, GatewayError};

// Configuration
pub use infrastructure::config::{ConfigError, GatewayConfig, ListenerSettings};
