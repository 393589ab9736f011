//! Resource adapter.
//!
//! Maps HTTP verb + path combinations under `/api/hello` onto the operation
//! registry and wraps every answer in the uniform JSON envelope
//! `{result, timestamp?, status}`. Decode failures are answered with a
//! client-error envelope without invoking the registry.
//!
//! # Endpoints
//!
//! - `GET  /say/{name}` - greeting for a path-supplied name
//! - `POST /say` - greeting for a body-supplied name
//! - `GET  /time` - current server time (envelope carries `timestamp`)
//! - `GET  /echo?message=` - echo of a query-supplied message
//! - `POST /echo` - echo of a body-supplied message

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::application::ports::ProtocolAdapter;
use crate::domain::operations::{OperationRegistry, OperationRequest, OperationResponse};

/// Wire request body for the POST endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HelloRequest {
    /// Name to greet (`POST /say`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Message to echo (`POST /echo`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Uniform wire response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    /// Operation result text.
    pub result: String,
    /// Invocation timestamp; present for the time endpoint only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// `"SUCCESS"`, or a client-error status when decoding failed.
    pub status: String,
}

impl From<OperationResponse> for HelloResponse {
    fn from(op: OperationResponse) -> Self {
        Self {
            result: op.result,
            timestamp: op.timestamp,
            status: op.status.as_str().to_string(),
        }
    }
}

/// Query parameters of `GET /echo`.
#[derive(Debug, Deserialize)]
struct EchoParams {
    message: Option<String>,
}

/// The resource-oriented protocol adapter.
#[derive(Clone)]
pub struct RestAdapter {
    registry: Arc<OperationRegistry>,
}

impl RestAdapter {
    /// Create the adapter over the shared registry.
    #[must_use]
    pub const fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }
}

impl ProtocolAdapter for RestAdapter {
    fn path_prefix(&self) -> &'static str {
        "/api/hello"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/say/{name}", get(say_get))
            .route("/say", post(say_post))
            .route("/time", get(time_get))
            .route("/echo", get(echo_get).post(echo_post))
            .with_state(Arc::clone(&self.registry))
    }
}

async fn say_get(
    State(registry): State<Arc<OperationRegistry>>,
    Path(name): Path<String>,
) -> Response {
    respond(&registry, &OperationRequest::new("greet", Some(name)))
}

async fn say_post(
    State(registry): State<Arc<OperationRegistry>>,
    payload: Result<Json<HelloRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => respond(&registry, &OperationRequest::new("greet", request.name)),
        Err(rejection) => decode_failure(&rejection),
    }
}

async fn time_get(State(registry): State<Arc<OperationRegistry>>) -> Response {
    respond(&registry, &OperationRequest::new("serverTime", None))
}

async fn echo_get(
    State(registry): State<Arc<OperationRegistry>>,
    Query(params): Query<EchoParams>,
) -> Response {
    respond(&registry, &OperationRequest::new("echo", params.message))
}

async fn echo_post(
    State(registry): State<Arc<OperationRegistry>>,
    payload: Result<Json<HelloRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => respond(&registry, &OperationRequest::new("echo", request.message)),
        Err(rejection) => decode_failure(&rejection),
    }
}

fn respond(registry: &OperationRegistry, request: &OperationRequest) -> Response {
    match registry.invoke(request) {
        Ok(op) => (StatusCode::OK, Json(HelloResponse::from(op))).into_response(),
        Err(err) => {
            // Routes are static, so dispatch cannot name an unregistered
            // operation; still surfaced as a structured fault, never a panic.
            tracing::warn!(error = %err, "operation dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HelloResponse {
                    result: err.to_string(),
                    timestamp: None,
                    status: "ERROR".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Client-error envelope for a request whose body failed to decode. The
/// registry is never invoked on this path.
fn decode_failure(rejection: &JsonRejection) -> Response {
    tracing::debug!(error = %rejection, "request body rejected");
    (
        StatusCode::BAD_REQUEST,
        Json(HelloResponse {
            result: rejection.to_string(),
            timestamp: None,
            status: "BAD_REQUEST".to_string(),
        }),
    )
        .into_response()
}
