//! Account routes.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::extract::Json;
use crate::error::{Result, clear_sentry_user};
use crate::middleware::{CurrentUser, bearer_token};
use crate::models::UserProfile;
use crate::services::auth::{AuthError, AuthResponse, Registration};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/register
#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth().register(registration).await?;
    tracing::info!(user_id = %response.user_id, "Account registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.auth().login(&request.email, &request.password).await?;
    Ok(Json(response))
}

/// POST /api/auth/refresh
///
/// Re-issues the caller's still-valid bearer token.
#[instrument(skip_all)]
async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<AuthResponse>> {
    let token = bearer_token(&headers).ok_or(AuthError::Unauthenticated)?;
    let response = state.auth().refresh(token).await?;
    Ok(Json(response))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client forgets its copy.
async fn logout() -> Json<Value> {
    clear_sentry_user();
    Json(json!({ "message": "Successfully logged out" }))
}

/// GET /api/auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.profile())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::routes::RouteGroup;
    use crate::routes::test_support::send;
    use crate::state::test_support::memory_state;

    #[tokio::test]
    async fn test_register_login_me() {
        let app = RouteGroup::Auth.router().with_state(memory_state());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Ada@Shop.dev",
                "password": "correct horse",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "user_type": "seller",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["email"], "ada@shop.dev");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@shop.dev", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["access_token"].as_str().unwrap().to_owned();

        let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Ada Lovelace");
        assert_eq!(body["user_type"], "seller");
        assert_eq!(body["seller_verified"], true);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = RouteGroup::Auth.router().with_state(memory_state());
        let registration = json!({
            "email": "dup@shop.dev",
            "password": "long enough",
            "first_name": "D",
            "last_name": "Up",
        });

        let (status, _) = send(&app, Method::POST, "/api/auth/register", None, Some(registration.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, Method::POST, "/api/auth/register", None, Some(registration)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let app = RouteGroup::Auth.router().with_state(memory_state());
        send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "bo@shop.dev", "password": "long enough" })),
        )
        .await;

        let (wrong_status, wrong) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "bo@shop.dev", "password": "not it at all" })),
        )
        .await;
        let (unknown_status, unknown) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@shop.dev", "password": "long enough" })),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn test_refresh_reissues_valid_token() {
        let app = RouteGroup::Auth.router().with_state(memory_state());
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ren@shop.dev", "password": "long enough" })),
        )
        .await;
        let token = body["access_token"].as_str().unwrap().to_owned();

        let (status, refreshed) =
            send(&app, Method::POST, "/api/auth/refresh", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refreshed["email"], "ren@shop.dev");
        assert_eq!(refreshed["token_type"], "bearer");
        let fresh = refreshed["access_token"].as_str().unwrap();

        let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(fresh), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "ren@shop.dev");

        let (status, _) = send(&app, Method::POST, "/api/auth/refresh", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) =
            send(&app, Method::POST, "/api/auth/refresh", Some("forged.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = RouteGroup::Auth.router().with_state(memory_state());

        let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Not authenticated");

        let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("forged.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = RouteGroup::Auth.router().with_state(memory_state());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "only@shop.dev" })),
        )
        .await;
        assert!(status.is_client_error());
        assert!(body["error"].is_string());
    }
}
