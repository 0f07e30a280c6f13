//! Dispatching proxy events into a route group.

use axum::{Router, middleware};
use http::{Method, StatusCode, header};
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::{Value, json};
use tower::ServiceExt;
use tracing::{Instrument, field::Empty};

use ekart_api::config::{ApiConfig, LogFormat, StoreConfig};
use ekart_api::db::{self, Stores};
use ekart_api::middleware::request_id_middleware;
use ekart_api::routes::RouteGroup;
use ekart_api::state::AppState;
use ekart_api::telemetry;

use crate::event::{self, into_request};
use crate::response::ApiGatewayResponse;

/// Log filter for function binaries.
const FUNCTION_LOG_FILTER: &str = "ekart_api=info,ekart_functions=info";

/// One route group's router, driven by proxy events.
#[derive(Debug, Clone)]
pub struct FunctionHandler {
    group: RouteGroup,
    router: Router,
    cors_origins: Vec<String>,
}

impl FunctionHandler {
    #[must_use]
    pub fn new(group: RouteGroup, state: AppState) -> Self {
        let cors_origins = state.config().cors_origins.clone();
        let router = group
            .router()
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state);
        Self {
            group,
            router,
            cors_origins,
        }
    }

    #[must_use]
    pub const fn group(&self) -> RouteGroup {
        self.group
    }

    /// Handle one event. Never fails: every outcome is an HTTP response.
    pub async fn handle(&self, event: Value) -> ApiGatewayResponse {
        let origin = origin_of(&event);
        let span = tracing::info_span!(
            "event",
            group = self.group.prefix(),
            method = Empty,
            uri = Empty,
            request_id = Empty,
            user_id = Empty,
        );

        async {
            let response = self.dispatch(event).await;
            tracing::info!(status = response.status_code, "Event handled");
            response
        }
        .instrument(span)
        .await
        .with_cors(origin.as_deref(), &self.cors_origins)
    }

    async fn dispatch(&self, event: Value) -> ApiGatewayResponse {
        // Preflight never reaches the router.
        if matches!(event::method_of(&event), Ok(Method::OPTIONS)) {
            return ApiGatewayResponse::json(StatusCode::OK, &json!({}));
        }

        let request = match into_request(event) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed event");
                return ApiGatewayResponse::error(StatusCode::BAD_REQUEST, &e.to_string());
            }
        };

        let span = tracing::Span::current();
        span.record("method", request.method().as_str());
        span.record("uri", request.uri().path());

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        ApiGatewayResponse::from_response(response).await
    }
}

fn origin_of(event: &Value) -> Option<String> {
    event
        .get("headers")?
        .as_object()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(header::ORIGIN.as_str()))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_owned)
}

/// Run a function binary serving `group` until the runtime shuts it down.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the database pool cannot
/// be created, or the runtime loop exits with an error.
pub async fn run(group: RouteGroup) -> Result<(), lambda_runtime::Error> {
    let config = ApiConfig::from_env()?;

    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(LogFormat::Json, FUNCTION_LOG_FILTER);

    let stores = match &config.store {
        StoreConfig::Postgres { database_url } => Stores::postgres(db::create_pool(database_url).await?),
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory store; data lives only as long as this instance");
            Stores::memory()
        }
    };

    let handler = FunctionHandler::new(group, AppState::new(config, stores));
    tracing::info!(group = group.prefix(), "Function ready");

    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<_, lambda_runtime::Error>(handler.handle(event.payload).await)
    }))
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;

    const ORIGIN: &str = "https://shop.ekart.dev";

    fn state() -> AppState {
        let config = ApiConfig {
            store: StoreConfig::Memory,
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            token_secret: SecretString::from("fn-t3st-Signing-Key-7hQ2xLw9Zp4Rk"),
            token_ttl: Duration::hours(1),
            cors_origins: vec![ORIGIN.to_owned()],
            payment_publishable_key: "pk_test_ekart".to_owned(),
            log_format: LogFormat::Json,
            sentry_dsn: None,
            sentry_environment: None,
        };
        AppState::new(config, Stores::memory())
    }

    fn event(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Value {
        let mut headers = json!({ "content-type": "application/json", "Origin": ORIGIN });
        if let Some(token) = token {
            headers["authorization"] = json!(format!("Bearer {token}"));
        }
        json!({
            "httpMethod": method,
            "path": path,
            "headers": headers,
            "body": body.map(|b| b.to_string()),
            "isBase64Encoded": false,
        })
    }

    fn body(response: &ApiGatewayResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_functions_share_one_state() {
        let state = state();
        let auth = FunctionHandler::new(RouteGroup::Auth, state.clone());
        let cart = FunctionHandler::new(RouteGroup::Cart, state);

        let registered = auth
            .handle(event(
                "POST",
                "/prod/api/auth/register/",
                None,
                Some(json!({
                    "email": "shopper@ekart.dev",
                    "password": "correct horse",
                    "first_name": "Sam",
                    "last_name": "Shopper",
                })),
            ))
            .await;
        assert_eq!(registered.status_code, 201);
        assert_eq!(registered.headers["access-control-allow-origin"], ORIGIN);
        assert!(registered.headers.contains_key("x-request-id"));
        let token = body(&registered)["access_token"].as_str().unwrap().to_owned();

        let cart_response = cart.handle(event("GET", "/api/cart", Some(&token), None)).await;
        assert_eq!(cart_response.status_code, 200);
        let cart_body = body(&cart_response);
        assert_eq!(cart_body["items"], json!([]));
        assert_eq!(cart_body["item_count"], 0);
    }

    #[tokio::test]
    async fn test_group_only_serves_its_routes() {
        let products = FunctionHandler::new(RouteGroup::Products, state());

        let listed = products.handle(event("GET", "/api/products", None, None)).await;
        assert_eq!(listed.status_code, 200);

        let other = products.handle(event("GET", "/api/cart", None, None)).await;
        assert_eq!(other.status_code, 404);
    }

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let orders = FunctionHandler::new(RouteGroup::Orders, state());
        let response = orders.handle(event("GET", "/api/orders", None, None)).await;

        assert_eq!(response.status_code, 401);
        assert!(body(&response)["error"].is_string());
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let payments = FunctionHandler::new(RouteGroup::Payments, state());
        let response = payments
            .handle(event("OPTIONS", "/api/payments/create-payment-intent", None, None))
            .await;

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "{}");
        assert_eq!(
            response.headers["access-control-allow-headers"],
            "Content-Type,Authorization"
        );
    }

    #[tokio::test]
    async fn test_malformed_event_is_bad_request() {
        let auth = FunctionHandler::new(RouteGroup::Auth, state());
        let response = auth.handle(json!({ "path": "/api/auth/me" })).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(body(&response)["error"], "event has no HTTP method");
    }
}
