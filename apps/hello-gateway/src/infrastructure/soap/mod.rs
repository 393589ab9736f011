//! Structured-RPC adapter.
//!
//! One enveloped exchange per request at `POST /soap/HelloWorldService`: the
//! first element inside the SOAP `Body` names the operation, its first child
//! element carries the single optional parameter. Responses are wrapped in a
//! matching `{operation}Response` envelope. Malformed envelopes and unknown
//! operations are answered with a protocol-level `Fault` body (HTTP 500 per
//! the SOAP 1.1 binding), never a bare transport error.
//!
//! `GET ?wsdl` serves the interface description: `greet(name) -> string`,
//! `serverTime() -> string`, `echo(message) -> string`.

use std::sync::Arc;

use axum::{
    Router,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::application::ports::ProtocolAdapter;
use crate::domain::operations::{OperationRegistry, OperationRequest};

/// SOAP 1.1 envelope namespace.
const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Service namespace used in responses and the WSDL.
const SERVICE_NS: &str = "http://example.org/";

/// Envelope decode failures. Each yields a `Fault` response for its request
/// only; the registry is never invoked.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The request body is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(String),

    /// The envelope carries no `Body` element.
    #[error("missing SOAP Body element")]
    MissingBody,

    /// The `Body` element names no operation.
    #[error("empty SOAP Body: no operation element")]
    MissingOperation,
}

/// The structured-RPC protocol adapter.
#[derive(Clone)]
pub struct SoapAdapter {
    registry: Arc<OperationRegistry>,
}

impl SoapAdapter {
    /// Create the adapter over the shared registry.
    #[must_use]
    pub const fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }
}

impl ProtocolAdapter for SoapAdapter {
    fn path_prefix(&self) -> &'static str {
        "/soap"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/HelloWorldService", get(service_get).post(service_post))
            .with_state(Arc::clone(&self.registry))
    }
}

/// `GET ?wsdl` serves the interface description.
async fn service_get(RawQuery(query): RawQuery) -> Response {
    if query.as_deref().is_some_and(|q| q.split('&').any(|p| p == "wsdl")) {
        return xml_response(StatusCode::OK, wsdl());
    }
    (
        StatusCode::BAD_REQUEST,
        "HelloWorldService: POST a SOAP envelope, or GET ?wsdl for the interface description\n",
    )
        .into_response()
}

/// One enveloped exchange.
async fn service_post(
    State(registry): State<Arc<OperationRegistry>>,
    body: String,
) -> Response {
    let request = match decode_envelope(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "envelope rejected");
            return fault_response(&err.to_string());
        }
    };

    match registry.invoke(&request) {
        Ok(response) => xml_response(
            StatusCode::OK,
            encode_envelope(&request.name, &response.result),
        ),
        Err(err) => {
            tracing::warn!(operation = %request.name, "unknown operation requested");
            fault_response(&err.to_string())
        }
    }
}

/// Decode a SOAP envelope into the protocol-agnostic request shape.
///
/// The first element inside `Body` names the operation; its first child
/// element (whatever its name) carries the parameter. A parameter element
/// that is present but empty decodes to `Some("")`, an absent one to `None` —
/// the distinction is observable through the `echo` operation.
pub(crate) fn decode_envelope(body: &str) -> Result<OperationRequest, DecodeError> {
    let mut reader = Reader::from_str(body);

    let mut in_body = false;
    let mut operation: Option<String> = None;
    let mut param_open: Option<String> = None;
    let mut param: Option<String> = None;

    loop {
        match reader.read_event() {
            Err(e) => return Err(DecodeError::Xml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let local = local_name(e.local_name().as_ref());
                if !in_body {
                    if local == "Body" {
                        in_body = true;
                    }
                } else if operation.is_none() {
                    operation = Some(local);
                } else if param.is_none() && param_open.is_none() {
                    param_open = Some(local);
                    param = Some(String::new());
                }
            }
            Ok(Event::Empty(e)) => {
                let local = local_name(e.local_name().as_ref());
                if in_body {
                    if operation.is_none() {
                        // Self-closing call element: no parameter follows.
                        operation = Some(local);
                        break;
                    }
                    if param.is_none() && param_open.is_none() {
                        // <name/> is a present-but-empty parameter.
                        param = Some(String::new());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if param_open.is_some() {
                    let text = e
                        .unescape()
                        .map_err(|err| DecodeError::Xml(err.to_string()))?;
                    if let Some(value) = param.as_mut() {
                        value.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if param_open.is_some()
                    && let Some(value) = param.as_mut()
                {
                    value.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let local = local_name(e.local_name().as_ref());
                if param_open.as_deref() == Some(local.as_str()) {
                    param_open = None;
                } else if operation.as_deref() == Some(local.as_str()) {
                    // The exchange carries a single call; stop at its end.
                    break;
                }
            }
            Ok(_) => {}
        }
    }

    if !in_body {
        return Err(DecodeError::MissingBody);
    }
    let name = operation.ok_or(DecodeError::MissingOperation)?;
    Ok(OperationRequest { name, arg: param })
}

/// Wrap a result in the matching response envelope.
pub(crate) fn encode_envelope(operation: &str, result: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <soap:Envelope xmlns:soap=\"{SOAP_ENV_NS}\">\
         <soap:Body>\
         <tns:{operation}Response xmlns:tns=\"{SERVICE_NS}\">\
         <return>{}</return>\
         </tns:{operation}Response>\
         </soap:Body>\
         </soap:Envelope>",
        escape(result)
    )
}

/// Client fault envelope, HTTP 500 per the SOAP 1.1 binding.
fn fault_response(message: &str) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <soap:Envelope xmlns:soap=\"{SOAP_ENV_NS}\">\
         <soap:Body>\
         <soap:Fault>\
         <faultcode>soap:Client</faultcode>\
         <faultstring>{}</faultstring>\
         </soap:Fault>\
         </soap:Body>\
         </soap:Envelope>",
        escape(message)
    );
    xml_response(StatusCode::INTERNAL_SERVER_ERROR, body)
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        body,
    )
        .into_response()
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// The interface description served at `?wsdl`.
fn wsdl() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions name="HelloWorldService"
    targetNamespace="{SERVICE_NS}"
    xmlns:tns="{SERVICE_NS}"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/">
  <wsdl:message name="greetRequest">
    <wsdl:part name="name" type="xsd:string"/>
  </wsdl:message>
  <wsdl:message name="greetResponse">
    <wsdl:part name="return" type="xsd:string"/>
  </wsdl:message>
  <wsdl:message name="serverTimeRequest"/>
  <wsdl:message name="serverTimeResponse">
    <wsdl:part name="return" type="xsd:string"/>
  </wsdl:message>
  <wsdl:message name="echoRequest">
    <wsdl:part name="message" type="xsd:string"/>
  </wsdl:message>
  <wsdl:message name="echoResponse">
    <wsdl:part name="return" type="xsd:string"/>
  </wsdl:message>
  <wsdl:portType name="HelloWorldPort">
    <wsdl:operation name="greet">
      <wsdl:input message="tns:greetRequest"/>
      <wsdl:output message="tns:greetResponse"/>
    </wsdl:operation>
    <wsdl:operation name="serverTime">
      <wsdl:input message="tns:serverTimeRequest"/>
      <wsdl:output message="tns:serverTimeResponse"/>
    </wsdl:operation>
    <wsdl:operation name="echo">
      <wsdl:input message="tns:echoRequest"/>
      <wsdl:output message="tns:echoResponse"/>
    </wsdl:operation>
  </wsdl:portType>
  <wsdl:binding name="HelloWorldBinding" type="tns:HelloWorldPort">
    <soap:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
  </wsdl:binding>
  <wsdl:service name="HelloWorldService">
    <wsdl:port name="HelloWorldPort" binding="tns:HelloWorldBinding">
      <soap:address location="/soap/HelloWorldService"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn envelope(call: &str) -> String {
        format!(
            "<soapenv:Envelope xmlns:soapenv=\"{SOAP_ENV_NS}\">\
             <soapenv:Body>{call}</soapenv:Body>\
             </soapenv:Envelope>"
        )
    }

    fn app() -> Router {
        let adapter = SoapAdapter::new(Arc::new(OperationRegistry::new()));
        Router::new().nest(adapter.path_prefix(), adapter.routes())
    }

    async fn post(body: String) -> (StatusCode, String) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/soap/HelloWorldService")
                    .header("content-type", "text/xml; charset=utf-8")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn decode_extracts_operation_and_parameter() {
        let request =
            decode_envelope(&envelope("<tns:greet xmlns:tns=\"http://example.org/\"><name>Ada</name></tns:greet>"))
                .unwrap();
        assert_eq!(request.name, "greet");
        assert_eq!(request.arg.as_deref(), Some("Ada"));
    }

    #[test]
    fn decode_distinguishes_empty_from_absent_parameter() {
        let empty = decode_envelope(&envelope("<echo><message></message></echo>")).unwrap();
        assert_eq!(empty.arg.as_deref(), Some(""));

        let self_closing = decode_envelope(&envelope("<echo><message/></echo>")).unwrap();
        assert_eq!(self_closing.arg.as_deref(), Some(""));

        let absent = decode_envelope(&envelope("<serverTime/>")).unwrap();
        assert_eq!(absent.name, "serverTime");
        assert_eq!(absent.arg, None);
    }

    #[test]
    fn decode_unescapes_parameter_text() {
        let request =
            decode_envelope(&envelope("<echo><message>&lt;hi&gt; &amp; bye</message></echo>"))
                .unwrap();
        assert_eq!(request.arg.as_deref(), Some("<hi> & bye"));
    }

    #[test]
    fn decode_rejects_missing_body() {
        let err = decode_envelope(
            "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\"/>",
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::MissingBody));
    }

    #[test]
    fn decode_rejects_empty_body() {
        let err = decode_envelope(&envelope("")).unwrap_err();
        assert!(matches!(err, DecodeError::MissingOperation));
    }

    #[test]
    fn encode_escapes_result_text() {
        let xml = encode_envelope("echo", "Echo: <hi>");
        assert!(xml.contains("<return>Echo: &lt;hi&gt;</return>"));
        assert!(xml.contains("<tns:echoResponse"));
    }

    #[tokio::test]
    async fn greet_round_trip() {
        let (status, body) =
            post(envelope("<greet><name>Ada</name></greet>")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<tns:greetResponse"));
        assert!(body.contains("Hello, Ada!"));
    }

    #[tokio::test]
    async fn absent_echo_parameter_round_trips_as_null() {
        let (status, body) = post(envelope("<echo/>")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<return>Echo: null</return>"));
    }

    #[tokio::test]
    async fn malformed_envelope_yields_fault_not_transport_error() {
        let (status, body) = post("this is not xml <<<".to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("<soap:Fault>"));
        assert!(body.contains("soap:Client"));
    }

    #[tokio::test]
    async fn unknown_operation_yields_fault() {
        let (status, body) = post(envelope("<transmogrify/>")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("<soap:Fault>"));
        assert!(body.contains("unknown operation"));
    }

    #[tokio::test]
    async fn wsdl_lists_the_operations() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/soap/HelloWorldService?wsdl")
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
        for operation in OperationRegistry::operation_names() {
            assert!(
                body.contains(&format!("<wsdl:operation name=\"{operation}\">")),
                "wsdl missing {operation}"
            );
        }
    }
}
