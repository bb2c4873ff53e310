//! Test harness: a full application state wired to a mock provider, plus
//! RS256 token minting against a mock JWKS endpoint.

use std::sync::Arc;

use aeos_api::{AppState, router};
use aeos_auth::{
    JwksCache, JwksCacheConfig, ManagementClient, ManagementClientConfig, TokenVerifier,
    VerifierConfig,
};
use aeos_storage::{Item, MemoryRepository, UserRecord};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_DOMAIN: &str = "tenant.auth.example.com";
pub const TEST_AUDIENCE: &str = "https://api.example.com";

/// A mock provider plus everything needed to call the API as a user.
pub struct TestApp {
    pub server: MockServer,
    pub router: Router,
    kid: String,
    encoding_key: EncodingKey,
}

impl TestApp {
    /// Starts a mock provider serving a generated JWKS and wires the full
    /// application state against it.
    pub async fn spawn() -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("encode private key");
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("load private key");

        let public_key = RsaPublicKey::from(&private_key);
        let jwks = json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": "test-key",
                "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            }]
        });

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .mount(&server)
            .await;

        let jwks_uri = Url::parse(&format!("{}/.well-known/jwks.json", server.uri()))
            .expect("mock server URI");
        let cache = JwksCache::new(jwks_uri, JwksCacheConfig::default().with_allow_http(true));
        let verifier = TokenVerifier::new(
            VerifierConfig::new(TEST_DOMAIN, TEST_AUDIENCE),
            Arc::new(cache),
        );

        let base_url = Url::parse(&format!("{}/", server.uri())).expect("mock server URI");
        let management = ManagementClient::new(
            ManagementClientConfig::new(base_url, "client-id", "client-secret", TEST_AUDIENCE)
                .with_management_credentials("mgmt-id", "mgmt-secret", "https://tenant/api/v2/"),
        );

        let state = AppState::new(
            Arc::new(verifier),
            Arc::new(management),
            Arc::new(MemoryRepository::<Item>::new()),
            Arc::new(MemoryRepository::<UserRecord>::new()),
        );

        Self {
            server,
            router: router(state),
            kid: "test-key".to_string(),
            encoding_key,
        }
    }

    /// Mints a valid token for the given subject.
    pub fn token_for(&self, subject: &str) -> String {
        self.token_with_claims(&self.claims_for(subject))
    }

    /// Baseline claims that pass verification for the given subject.
    pub fn claims_for(&self, subject: &str) -> Value {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        json!({
            "sub": subject,
            "iss": format!("https://{TEST_DOMAIN}/"),
            "aud": TEST_AUDIENCE,
            "iat": now,
            "exp": now + 3600,
        })
    }

    /// Signs arbitrary claims with the published key.
    pub fn token_with_claims(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).expect("sign token")
    }

    /// Sends a request through the router.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        use tower::ServiceExt;

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route request")
    }
}

/// Reads a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body")
}
