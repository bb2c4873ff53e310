//! Management client tests against a mock provider.

use std::sync::Arc;

use aeos_auth::{
    GrantRequest, ManagementClient, ManagementClientConfig, ManagementError, NewProviderUser,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ManagementClient {
    let base_url = Url::parse(&format!("{}/", server.uri())).expect("mock server URI");
    let config = ManagementClientConfig::new(
        base_url,
        "client-id",
        "client-secret",
        "https://api.example.com",
    )
    .with_management_credentials("mgmt-id", "mgmt-secret", "https://tenant/api/v2/");
    ManagementClient::new(config)
}

fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 86400,
    }))
}

#[tokio::test]
async fn test_management_token_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "client_credentials",
            "client_id": "mgmt-id",
            "audience": "https://tenant/api/v2/",
        })))
        .respond_with(token_response("mgmt-token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(client.management_token().await.unwrap(), "mgmt-token");
    assert_eq!(client.management_token().await.unwrap(), "mgmt-token");
}

#[tokio::test]
async fn test_concurrent_token_requests_share_one_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("mgmt-token").set_delay(std::time::Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move { client.management_token().await }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "mgmt-token");
    }
}

#[tokio::test]
async fn test_create_user_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("mgmt-token"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .and(body_partial_json(json!({
            "email": "ada@example.com",
            "connection": "Username-Password-Authentication",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "user_id": "auth0|new-user",
            "email": "ada@example.com",
            "email_verified": false,
            "created_at": "2026-08-23T00:00:00.000Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = NewProviderUser::new("ada@example.com", "s3cret-pass!").with_name("Ada");

    let created = client.create_user(&user).await.unwrap();
    assert_eq!(created.user_id, "auth0|new-user");
    assert_eq!(created.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_create_user_conflict_on_existing_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("mgmt-token"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "statusCode": 409,
            "message": "The user already exists.",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = NewProviderUser::new("ada@example.com", "s3cret-pass!");

    let err = client.create_user(&user).await.unwrap_err();
    assert!(matches!(err, ManagementError::Conflict));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_create_user_surfaces_provider_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("mgmt-token"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "PasswordStrengthError",
            "description": "Password is too weak",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = NewProviderUser::new("ada@example.com", "weak");

    let err = client.create_user(&user).await.unwrap_err();
    match err {
        ManagementError::Provider { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("PasswordStrengthError"));
            assert!(message.contains("Password is too weak"));
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_password_grant_requests_audience_and_scope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "password",
            "username": "ada@example.com",
            "audience": "https://api.example.com",
            "scope": "openid profile email offline_access",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "id_token": "id-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tokens = client
        .exchange(GrantRequest::Password {
            username: "ada@example.com".into(),
            password: "s3cret-pass!".into(),
        })
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "user-token");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(tokens.id_token.as_deref(), Some("id-1"));
}

#[tokio::test]
async fn test_authorization_code_grant_passes_code_and_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "authorization_code",
            "code": "abc123",
            "redirect_uri": "https://app.example.com/callback",
            "audience": "https://api.example.com",
        })))
        .respond_with(token_response("code-token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tokens = client
        .exchange(GrantRequest::AuthorizationCode {
            code: "abc123".into(),
            redirect_uri: "https://app.example.com/callback".into(),
        })
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "code-token");
}

#[tokio::test]
async fn test_refresh_grant_passes_token_through() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "refresh-1",
        })))
        .respond_with(token_response("refreshed-token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tokens = client
        .exchange(GrantRequest::RefreshToken {
            refresh_token: "refresh-1".into(),
        })
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "refreshed-token");
}

#[tokio::test]
async fn test_oauth_error_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Wrong email or password.",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .exchange(GrantRequest::Password {
            username: "ada@example.com".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();

    match err {
        ManagementError::OAuth {
            status,
            error,
            description,
        } => {
            assert_eq!(status, 403);
            assert_eq!(error, "invalid_grant");
            assert_eq!(description, "Wrong email or password.");
        }
        other => panic!("expected OAuth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oauth_shaped_5xx_is_a_provider_failure() {
    let server = MockServer::start().await;

    // Some providers dress outages in OAuth error bodies. A 5xx must never
    // read as a credential rejection.
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "temporarily_unavailable",
            "error_description": "The service is temporarily unavailable.",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .exchange(GrantRequest::Password {
            username: "ada@example.com".into(),
            password: "s3cret-pass!".into(),
        })
        .await
        .unwrap_err();

    match err {
        ManagementError::Provider { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_provider_error_is_preserved() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .exchange(GrantRequest::RefreshToken {
            refresh_token: "refresh-1".into(),
        })
        .await
        .unwrap_err();

    match err {
        ManagementError::Provider { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}
