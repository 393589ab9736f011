//! Cross-adapter equivalence tests.
//!
//! Both protocol adapters sit over the same operation registry, so for the
//! same logical input they must produce identical `result` text. These tests
//! drive both routers in-process; transport security is orthogonal and
//! covered by the gateway tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use hello_gateway::{OperationRegistry, ProtocolAdapter, RestAdapter, SoapAdapter};
use tower::ServiceExt;

fn routers() -> (Router, Router) {
    let registry = Arc::new(OperationRegistry::new());
    let rest = RestAdapter::new(Arc::clone(&registry));
    let soap = SoapAdapter::new(registry);
    (
        Router::new().nest(rest.path_prefix(), rest.routes()),
        Router::new().nest(soap.path_prefix(), soap.routes()),
    )
}

async fn body_string(router: Router, request: Request<Body>) -> String {
    let response = router.oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Result text reported by the resource adapter for a GET endpoint.
async fn rest_result(router: Router, uri: &str) -> String {
    let body = body_string(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    let envelope: serde_json::Value = serde_json::from_str(&body).unwrap();
    envelope["result"].as_str().unwrap().to_string()
}

/// Result text reported by the resource adapter for a POST endpoint.
async fn rest_post_result(router: Router, uri: &str, body: &str) -> String {
    let body = body_string(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    let envelope: serde_json::Value = serde_json::from_str(&body).unwrap();
    envelope["result"].as_str().unwrap().to_string()
}

/// Result text reported by the structured-RPC adapter for one call element.
async fn soap_result(router: Router, call: &str) -> String {
    let envelope = format!(
        "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body>{call}</soapenv:Body>\
         </soapenv:Envelope>"
    );
    let body = body_string(
        router,
        Request::builder()
            .method("POST")
            .uri("/soap/HelloWorldService")
            .header("content-type", "text/xml; charset=utf-8")
            .body(Body::from(envelope))
            .unwrap(),
    )
    .await;

    let start = body.find("<return>").expect("response carries a return element") + "<return>".len();
    let end = body.find("</return>").unwrap();
    quick_xml::escape::unescape(&body[start..end])
        .unwrap()
        .into_owned()
}

#[tokio::test]
async fn greet_results_are_identical() {
    let (rest, soap) = routers();

    let via_rest = rest_result(rest, "/api/hello/say/Ada").await;
    let via_soap = soap_result(soap, "<greet><name>Ada</name></greet>").await;

    assert_eq!(via_rest, via_soap);
    assert!(via_rest.starts_with("Hello, Ada!"));
}

#[tokio::test]
async fn blank_names_default_to_world_in_both_adapters() {
    let (rest, soap) = routers();

    let via_rest = rest_post_result(rest, "/api/hello/say", r#"{"name":"  "}"#).await;
    let via_soap = soap_result(soap, "<greet><name>  </name></greet>").await;

    assert_eq!(via_rest, via_soap);
    assert!(via_rest.contains("World"));
}

#[tokio::test]
async fn echo_results_are_identical() {
    let (rest, soap) = routers();

    let via_rest = rest_result(rest.clone(), "/api/hello/echo?message=ping").await;
    let via_soap = soap_result(soap.clone(), "<echo><message>ping</message></echo>").await;
    assert_eq!(via_rest, via_soap);
    assert_eq!(via_rest, "Echo: ping");

    let empty_rest = rest_post_result(rest, "/api/hello/echo", r#"{"message":""}"#).await;
    let empty_soap = soap_result(soap, "<echo><message></message></echo>").await;
    assert_eq!(empty_rest, empty_soap);
    assert_eq!(empty_rest, "Echo: ");
}

#[tokio::test]
async fn absent_echo_parameter_is_null_in_both_adapters() {
    let (rest, soap) = routers();

    let via_rest = rest_result(rest, "/api/hello/echo").await;
    let via_soap = soap_result(soap, "<echo/>").await;

    assert_eq!(via_rest, via_soap);
    assert_eq!(via_rest, "Echo: null");
}

#[tokio::test]
async fn server_time_has_the_same_shape_in_both_adapters() {
    let (rest, soap) = routers();

    // The clock moves between invocations, so only the shape is comparable.
    let pattern =
        regex::Regex::new(r"^Current server time: \d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();

    let via_rest = rest_result(rest, "/api/hello/time").await;
    let via_soap = soap_result(soap, "<serverTime/>").await;

    assert!(pattern.is_match(&via_rest), "rest: {via_rest}");
    assert!(pattern.is_match(&via_soap), "soap: {via_soap}");
}
