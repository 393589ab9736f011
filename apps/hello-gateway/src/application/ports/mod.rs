//! Port definitions.
//!
//! The seam between the wire-format adapters and the gateway: every adapter
//! translates its own encoding to and from the protocol-agnostic operation
//! request/response pair and exposes its routes for the gateway to mount.

use axum::Router;

/// A protocol adapter translates between one wire encoding and the
/// operation registry.
///
/// Implementations decode their wire-specific requests into
/// [`crate::domain::operations::OperationRequest`], invoke the registry, and
/// encode the [`crate::domain::operations::OperationResponse`] back without
/// loss. Decode failures must be answered in the adapter's own wire format
/// (a protocol fault, a client-error envelope) and must never reach the
/// registry.
pub trait ProtocolAdapter: Send + Sync {
    /// Path prefix the gateway mounts this adapter under. Routing is static:
    /// the prefix is fixed at construction and never re-registered at
    /// runtime.
    fn path_prefix(&self) -> &'static str;

    /// The adapter's wire routes over the shared registry.
    fn routes(&self) -> Router;
}
