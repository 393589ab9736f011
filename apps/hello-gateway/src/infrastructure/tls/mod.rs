//! Transport security.
//!
//! The credential store and the transport security negotiator. Credential
//! material is loaded once at startup and shared read-only; the negotiator
//! terminates TLS on inbound connections and enforces the configured trust
//! policy before any application data reaches the gateway.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Credential     - server identity (chain + private key)  │
//! │  TrustAnchor    - closed-world roots for client chains   │
//! │  TlsNegotiator  - handshake, policy, failure taxonomy    │
//! │  ConnectionContext - negotiated session facts            │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod credential;
mod negotiator;

pub use credential::{CertAuthority, Credential, IssuedPem, TrustAnchor};
pub use negotiator::{ConnectionContext, HandshakeError, SecurityMode, TlsNegotiator};
