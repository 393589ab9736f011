//! Health and service-info endpoint.
//!
//! Static responders used by orchestrators and for manual inspection. Not
//! part of the operation surface: nothing here touches the registry.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON service status
//! - `GET /health/info` - plain-text service banner

use axum::{Json, Router, routing::get};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"UP"` while the process serves requests.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Current time.
    pub timestamp: String,
    /// Mount point of the structured-RPC adapter.
    pub soap_endpoint: String,
    /// Interface description URL.
    pub wsdl_url: String,
    /// Whether transport security is active (always true: every listener
    /// terminates TLS).
    pub tls_enabled: bool,
}

/// Health routes, mounted at the listener root.
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/info", get(info_handler))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        service: "hello-gateway".to_string(),
        timestamp: Local::now().to_rfc3339(),
        soap_endpoint: "/soap".to_string(),
        wsdl_url: "/soap/HelloWorldService?wsdl".to_string(),
        tls_enabled: true,
    })
}

async fn info_handler() -> &'static str {
    "hello-gateway\n\
     \n\
     SOAP endpoint: /soap/HelloWorldService\n\
     WSDL:          /soap/HelloWorldService?wsdl\n\
     REST base:     /api/hello\n\
     Health check:  /health\n\
     \n\
     Operations:\n\
     - greet(name): greeting message\n\
     - serverTime(): current server time\n\
     - echo(message): echoes the input message\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_up() {
        let response = routes()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "UP");
        assert!(body.tls_enabled);
    }

    #[tokio::test]
    async fn info_lists_operations() {
        let response = routes()
            .oneshot(
                Request::builder()
                    .uri("/health/info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("greet"));
        assert!(body.contains("serverTime"));
        assert!(body.contains("echo"));
    }
}
