//! Authentication endpoint tests against the mock provider.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{TestApp, body_json};

async fn mount_token_endpoint(server: &MockServer, grant_type: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({"grant_type": grant_type})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_returns_provider_tokens() {
    let app = TestApp::spawn().await;
    mount_token_endpoint(&app.server, "password", "user-token").await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "s3cret-pass!"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["access_token"], "user-token");
    assert_eq!(body["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_401() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Wrong email or password.",
        })))
        .mount(&app.server)
        .await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Wrong email or password.");
}

#[tokio::test]
async fn test_login_during_provider_outage_is_502() {
    let app = TestApp::spawn().await;

    // An outage dressed in an OAuth error body must not read as bad
    // credentials.
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "temporarily_unavailable",
            "error_description": "The service is temporarily unavailable.",
        })))
        .mount(&app.server)
        .await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "s3cret-pass!"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error_type"], "bad_gateway");
}

#[tokio::test]
async fn test_login_validates_email_shape() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "not-an-email", "password": "x"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body_json(response).await["errors"]
            .as_object()
            .unwrap()
            .contains_key("email")
    );
}

#[tokio::test]
async fn test_signup_provisions_provider_user() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .and(body_partial_json(json!({
            "email": "ada@example.com",
            "connection": "Username-Password-Authentication",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "user_id": "auth0|new-user",
            "email": "ada@example.com",
            "name": "Ada",
            "email_verified": false,
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    // Client-credentials grant for the management token.
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({"grant_type": "client_credentials"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mgmt-token",
            "token_type": "Bearer",
            "expires_in": 86400,
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "ada@example.com",
                "password": "s3cret-pass!",
                "name": "Ada",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["user_id"], "auth0|new-user");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["email_verified"], false);
    // The password never echoes back.
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_signup_conflict_when_email_taken() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mgmt-token",
            "token_type": "Bearer",
            "expires_in": 86400,
        })))
        .mount(&app.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "statusCode": 409,
            "message": "The user already exists.",
        })))
        .mount(&app.server)
        .await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "ada@example.com", "password": "s3cret-pass!"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error_type"], "conflict");
    assert_eq!(body["detail"], "User already exists");
}

#[tokio::test]
async fn test_refresh_passes_token_through() {
    let app = TestApp::spawn().await;
    mount_token_endpoint(&app.server, "refresh_token", "refreshed-token").await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": "refresh-1"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["access_token"], "refreshed-token");
}

#[tokio::test]
async fn test_social_callback_exchanges_code() {
    let app = TestApp::spawn().await;
    mount_token_endpoint(&app.server, "authorization_code", "code-token").await;

    let response = app
        .request(
            "POST",
            "/api/v1/auth/social-callback",
            None,
            Some(json!({"code": "abc123", "redirect_uri": "https://app.example.com/cb"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["access_token"], "code-token");
}

#[tokio::test]
async fn test_auth_user_echoes_verified_claims() {
    let app = TestApp::spawn().await;

    let mut claims = app.claims_for("auth0|alice");
    claims["email"] = json!("alice@example.com");
    let token = app.token_with_claims(&claims);

    let response = app
        .request("GET", "/api/v1/auth/user", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["subject"], "auth0|alice");
    assert_eq!(body["email"], "alice@example.com");
}
