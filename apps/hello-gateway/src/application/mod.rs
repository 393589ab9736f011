//! Application layer.
//!
//! Port definitions sitting between the domain and the infrastructure
//! adapters.

pub mod ports;
