//! Responses in the API Gateway proxy shape.

use std::collections::BTreeMap;

use axum::{body::to_bytes, response::Response};
use http::{HeaderMap, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Largest response body we buffer (API Gateway's payload limit).
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

const ALLOW_HEADERS: &str = "Content-Type,Authorization";
const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    /// A JSON response.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            header::CONTENT_TYPE.as_str().to_owned(),
            "application/json".to_owned(),
        );
        Self {
            status_code: status.as_u16(),
            headers,
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }

    /// A `{"error": message}` response.
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    /// Buffer a router response.
    pub async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to buffer response body");
                return Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };

        Self {
            status_code: parts.status.as_u16(),
            headers: flatten_headers(&parts.headers),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            is_base64_encoded: false,
        }
    }

    /// Add CORS headers, echoing `origin` only if it is allowed.
    #[must_use]
    pub fn with_cors(mut self, origin: Option<&str>, allowed: &[String]) -> Self {
        if let Some(origin) = origin.filter(|o| allowed.iter().any(|a| a == o)) {
            self.headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN.as_str().to_owned(),
                origin.to_owned(),
            );
            self.headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS.as_str().to_owned(),
                "true".to_owned(),
            );
        }
        self.headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS.as_str().to_owned(),
            ALLOW_HEADERS.to_owned(),
        );
        self.headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS.as_str().to_owned(),
            ALLOW_METHODS.to_owned(),
        );
        self.headers
            .insert(header::VARY.as_str().to_owned(), "Origin".to_owned());
        self
    }
}

/// Single-valued header map; repeated headers are comma-joined.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        flat.entry(name.as_str().to_owned())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }
    flat
}
