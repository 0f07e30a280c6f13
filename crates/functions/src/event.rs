//! API Gateway proxy events.
//!
//! Both the REST (v1) and HTTP API (v2) payload shapes are accepted.

use std::collections::HashMap;

use axum::body::Body;
use base64::{Engine, engine::general_purpose::STANDARD};
use http::{Method, Request};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use ekart_api::routes::API_PREFIX;

/// Why an event could not be turned into a request.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("event has no HTTP method")]
    MissingMethod,
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("event has no path")]
    MissingPath,
    #[error("body is not valid base64: {0}")]
    Body(#[from] base64::DecodeError),
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEvent {
    http_method: Option<String>,
    request_context: Option<RequestContext>,
    path: Option<String>,
    raw_path: Option<String>,
    raw_query_string: Option<String>,
    query_string_parameters: Option<HashMap<String, String>>,
    headers: Option<HashMap<String, String>>,
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RequestContext {
    http: Option<HttpContext>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpContext {
    method: Option<String>,
}

/// The HTTP method of an event, if it names one.
///
/// # Errors
///
/// Returns `EventError` if the event is not a proxy event or has no method.
pub fn method_of(event: &Value) -> Result<Method, EventError> {
    let event = ProxyEvent::deserialize(event)?;
    parse_method(&event)
}

fn parse_method(event: &ProxyEvent) -> Result<Method, EventError> {
    let method = event
        .http_method
        .as_deref()
        .or_else(|| {
            event
                .request_context
                .as_ref()
                .and_then(|c| c.http.as_ref())
                .and_then(|h| h.method.as_deref())
        })
        .ok_or(EventError::MissingMethod)?;
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| EventError::InvalidMethod(method.to_owned()))
}

/// Convert a proxy event into a request for the API router.
///
/// # Errors
///
/// Returns `EventError` for events without a method or path, and for
/// bodies flagged as base64 that do not decode.
pub fn into_request(event: Value) -> Result<Request<Body>, EventError> {
    let event = ProxyEvent::deserialize(event)?;
    let method = parse_method(&event)?;
    let path = event
        .raw_path
        .as_deref()
        .or(event.path.as_deref())
        .filter(|p| !p.is_empty())
        .ok_or(EventError::MissingPath)?;

    let mut uri = api_path(path);
    let query = query_string(&event);
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query);
    }

    let body = match event.body {
        None => Vec::new(),
        Some(body) if event.is_base64_encoded => STANDARD.decode(body)?,
        Some(body) => body.into_bytes(),
    };

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in event.headers.iter().flatten() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    Ok(builder.body(Body::from(body))?)
}

/// Map a gateway path onto the router's `/api/...` layout.
///
/// Anything before the `/api` segment (a stage name) is dropped, a path
/// without one gets it prepended, and trailing slashes are trimmed.
fn api_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let api = API_PREFIX.trim_start_matches('/');
    let tail = match segments.iter().position(|s| *s == api) {
        Some(index) => segments.get(index + 1..).unwrap_or_default(),
        None => segments.as_slice(),
    };

    let mut uri = API_PREFIX.to_owned();
    for segment in tail {
        uri.push('/');
        uri.push_str(segment);
    }
    uri
}

fn query_string(event: &ProxyEvent) -> String {
    if let Some(raw) = event.raw_query_string.as_deref().filter(|q| !q.is_empty()) {
        return raw.to_owned();
    }
    let Some(params) = &event.query_string_parameters else {
        return String::new();
    };

    // Sorted so the URI is deterministic.
    let mut pairs: Vec<_> = params.iter().collect();
    pairs.sort();
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rest_event() {
        let request = into_request(json!({
            "httpMethod": "GET",
            "path": "/api/products/search",
            "queryStringParameters": { "q": "oak chair", "page": "2" },
            "headers": { "Authorization": "Bearer abc" },
            "body": null,
            "isBase64Encoded": false,
        }))
        .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.uri().to_string(),
            "/api/products/search?page=2&q=oak+chair"
        );
        assert_eq!(request.headers()["authorization"], "Bearer abc");
    }

    #[test]
    fn test_http_api_v2_event() {
        let request = into_request(json!({
            "version": "2.0",
            "rawPath": "/prod/api/cart/items/",
            "rawQueryString": "quantity=3",
            "requestContext": { "http": { "method": "put" } },
            "headers": { "content-type": "application/json" },
            "body": "eyJxdWFudGl0eSI6M30=",
            "isBase64Encoded": true,
        }))
        .unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri().to_string(), "/api/cart/items?quantity=3");
    }

    #[test]
    fn test_path_without_api_prefix() {
        assert_eq!(api_path("/orders/42/status"), "/api/orders/42/status");
        assert_eq!(api_path("/api"), "/api");
        assert_eq!(api_path("/api/auth/login/"), "/api/auth/login");
    }

    #[test]
    fn test_malformed_events() {
        assert!(matches!(
            into_request(json!({ "path": "/api/cart" })),
            Err(EventError::MissingMethod)
        ));
        assert!(matches!(
            into_request(json!({ "httpMethod": "GET" })),
            Err(EventError::MissingPath)
        ));
        assert!(matches!(into_request(json!([1, 2])), Err(EventError::Shape(_))));
        assert!(matches!(
            into_request(json!({
                "httpMethod": "POST",
                "path": "/api/auth/login",
                "body": "%%%",
                "isBase64Encoded": true,
            })),
            Err(EventError::Body(_))
        ));
    }
}
