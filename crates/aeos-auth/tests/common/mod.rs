//! Shared helpers for integration tests: a generated RSA signing key, the
//! matching JWKS document, and token minting.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};

pub const TEST_DOMAIN: &str = "tenant.auth.example.com";
pub const TEST_AUDIENCE: &str = "https://api.example.com";

/// An RSA signing key with its JWKS representation.
pub struct TestKey {
    pub kid: String,
    encoding_key: EncodingKey,
    jwk: Value,
}

impl TestKey {
    /// Generates a fresh 2048-bit RSA key under the given kid.
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");

        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("encode private key");
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("load private key");

        let public_key = RsaPublicKey::from(&private_key);
        let jwk = json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        });

        Self {
            kid: kid.to_string(),
            encoding_key,
            jwk,
        }
    }

    /// The JWKS document publishing this key.
    pub fn jwks(&self) -> Value {
        json!({ "keys": [self.jwk] })
    }

    /// Signs the given claims as an RS256 token with this key's kid.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).expect("sign token")
    }
}

/// A claim set that passes verification against the default test issuer
/// and audience, expiring one hour from now.
pub fn valid_claims(subject: &str) -> Value {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    json!({
        "sub": subject,
        "iss": format!("https://{TEST_DOMAIN}/"),
        "aud": TEST_AUDIENCE,
        "iat": now,
        "exp": now + 3600,
    })
}
