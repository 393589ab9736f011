//! Operation Registry
//!
//! The single source of truth for business semantics. Operations take zero
//! or one string parameter and return a string; none of them retain state
//! across invocations. `serverTime` reads the wall clock at invocation and
//! is the only operation that is not referentially transparent.
//!
//! Protocol adapters must translate their wire requests into an
//! [`OperationRequest`] before invoking the registry, and translate the
//! [`OperationResponse`] back without loss.

use chrono::Local;

/// Timestamp format used by the `serverTime` operation.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical greeting suffix, shared by every wire encoding.
const GREETING_SUFFIX: &str = "Welcome to the secure hello service!";

/// Protocol-agnostic operation request.
///
/// `arg: None` and `arg: Some(String::new())` are distinct: the `echo`
/// operation answers differently depending on whether the parameter was
/// present at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    /// Registered operation name (`greet`, `echo`, `serverTime`).
    pub name: String,
    /// The single optional string parameter.
    pub arg: Option<String>,
}

impl OperationRequest {
    /// Create a request for a named operation.
    #[must_use]
    pub fn new(name: impl Into<String>, arg: Option<String>) -> Self {
        Self {
            name: name.into(),
            arg,
        }
    }
}

/// Outcome status of a dispatched operation.
///
/// Currently every dispatched operation succeeds; failures before dispatch
/// travel as [`OperationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation completed.
    Success,
}

impl OperationStatus {
    /// Wire-level status label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
        }
    }
}

/// Protocol-agnostic operation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResponse {
    /// Result text, identical across wire encodings for identical inputs.
    pub result: String,
    /// Invocation timestamp, set only by the `serverTime` operation.
    pub timestamp: Option<String>,
    /// Outcome status.
    pub status: OperationStatus,
}

impl OperationResponse {
    fn success(result: String) -> Self {
        Self {
            result,
            timestamp: None,
            status: OperationStatus::Success,
        }
    }
}

/// Operation dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The request named an operation that is not registered.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

/// The fixed set of business operations, decoupled from any wire format.
///
/// Stateless and side-effect-free apart from reading the clock; safe to
/// share across connection handlers without locking.
#[derive(Debug, Default, Clone)]
pub struct OperationRegistry;

impl OperationRegistry {
    /// Create the registry.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Dispatch a request to the named operation.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnknownOperation`] when `request.name` does
    /// not match a registered operation.
    pub fn invoke(&self, request: &OperationRequest) -> Result<OperationResponse, OperationError> {
        match request.name.as_str() {
            "greet" => Ok(Self::greet(request.arg.as_deref())),
            "echo" => Ok(Self::echo(request.arg.as_deref())),
            "serverTime" => Ok(Self::server_time()),
            other => Err(OperationError::UnknownOperation(other.to_string())),
        }
    }

    /// Names of the registered operations, in declaration order.
    #[must_use]
    pub const fn operation_names() -> [&'static str; 3] {
        ["greet", "serverTime", "echo"]
    }

    /// Greeting; blank or absent names fall back to "World".
    fn greet(name: Option<&str>) -> OperationResponse {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => "World",
        };
        OperationResponse::success(format!("Hello, {name}! {GREETING_SUFFIX}"))
    }

    /// Echo. An absent parameter yields the literal "Echo: null" while an
    /// empty string yields "Echo: " — presence changes the output, not just
    /// its content.
    fn echo(message: Option<&str>) -> OperationResponse {
        match message {
            Some(m) => OperationResponse::success(format!("Echo: {m}")),
            None => OperationResponse::success("Echo: null".to_string()),
        }
    }

    /// Current server time, read from the wall clock at invocation. Not
    /// deterministic, never cached.
    fn server_time() -> OperationResponse {
        let timestamp = Local::now().format(TIME_FORMAT).to_string();
        OperationResponse {
            result: format!("Current server time: {timestamp}"),
            timestamp: Some(timestamp),
            status: OperationStatus::Success,
        }
    }
}
