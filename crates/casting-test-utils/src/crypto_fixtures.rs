//! Deterministic cryptographic fixtures for testing.
//!
//! Ed25519 keypairs are derived from a one-byte seed, so the same seed always
//! yields the same key. The RSA keypair is a fixed 2048-bit key checked in
//! under `fixtures/`, since RSA keys cannot be derived cheaply from a seed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// PKCS#1 PEM of the RSA test key.
const TEST_RSA_PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/test_rsa_key.pem");

/// Base64url modulus of the RSA test key.
const TEST_RSA_MODULUS: &str = include_str!("../fixtures/test_rsa_key.n");

/// Base64url public exponent of the RSA test key (65537).
const TEST_RSA_EXPONENT: &str = "AQAB";

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Signing key with its published JWK.
#[derive(Clone)]
pub struct TestKeypair {
    kid: String,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    jwk: serde_json::Value,
}

impl TestKeypair {
    /// Deterministic Ed25519 keypair (`EdDSA`).
    pub fn ed25519(seed: u8, kid: &str) -> Self {
        let (public_key_bytes, pkcs8) =
            ed25519_key_material(seed).expect("Failed to create Ed25519 test keypair");

        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::EdDSA,
            encoding_key: EncodingKey::from_ed_der(&pkcs8),
            jwk: serde_json::json!({
                "kty": "OKP",
                "kid": kid,
                "crv": "Ed25519",
                "x": URL_SAFE_NO_PAD.encode(public_key_bytes),
                "alg": "EdDSA",
                "use": "sig"
            }),
        }
    }

    /// Fixed RSA keypair (`RS256`), the shape Auth0 tenants publish.
    pub fn rsa(kid: &str) -> Self {
        let encoding_key = EncodingKey::from_rsa_pem(TEST_RSA_PRIVATE_KEY_PEM)
            .expect("RSA test fixture should be a valid PEM key");

        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            encoding_key,
            jwk: serde_json::json!({
                "kty": "RSA",
                "kid": kid,
                "n": TEST_RSA_MODULUS.trim(),
                "e": TEST_RSA_EXPONENT,
                "alg": "RS256",
                "use": "sig"
            }),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Public JWK as served from a JWKS endpoint.
    pub fn jwk_json(&self) -> serde_json::Value {
        self.jwk.clone()
    }

    /// JWKS document containing only this key.
    pub fn jwks_json(&self) -> serde_json::Value {
        serde_json::json!({ "keys": [self.jwk_json()] })
    }

    /// Sign `claims` with a header carrying this key's `kid`.
    pub fn sign_token(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());
        self.sign_with_header(&header, claims)
    }

    /// Sign `claims` with a header that has no `kid`.
    pub fn sign_token_without_kid(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());
        self.sign_with_header(&header, claims)
    }

    /// Sign with an arbitrary header. The header's `alg` must match the key.
    pub fn sign_with_header(&self, header: &Header, claims: &serde_json::Value) -> String {
        encode(header, claims, &self.encoding_key).expect("Failed to sign test token")
    }
}

/// Derive the Ed25519 public key and a PKCS#8 v1 document from a seed byte.
fn ed25519_key_material(seed: u8) -> Result<(Vec<u8>, Vec<u8>), FixtureError> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    Ok((
        key_pair.public_key().as_ref().to_vec(),
        build_pkcs8_from_seed(&seed_bytes),
    ))
}

/// Build a PKCS#8 v1 document from an Ed25519 seed.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
